//! Point-in-region lookup.
//!
//! The catalog only defines the contract: given coordinates, return the
//! smallest enclosing leaf or nothing. The geometry is delegated to a
//! [`Locator`] implementation.

use super::Catalog;
use super::node::NodeId;

/// Resolves coordinates to a catalog leaf.
pub trait Locator {
    /// Find the leaf whose region contains the point, if any.
    fn locate(&self, lat: f64, lon: f64) -> Option<NodeId>;
}

/// Locator that uses the bounding boxes carried by catalog leaves.
///
/// When several leaves enclose the point (overlapping boxes), the one with
/// the smallest area wins.
pub struct BoundsLocator<'a> {
    catalog: &'a Catalog,
}

impl<'a> BoundsLocator<'a> {
    pub const fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }
}

impl Locator for BoundsLocator<'_> {
    fn locate(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.catalog
            .leaves()
            .filter_map(|node| {
                node.bounds
                    .filter(|b| b.contains(lat, lon))
                    .map(|b| (node, b.area()))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(node, _)| node.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSpec, NodeSpec};
    use crate::catalog::node::Bounds;

    fn catalog() -> Catalog {
        Catalog::from_spec(CatalogSpec::new(vec![
            NodeSpec::leaf("FR", 100).with_bounds(Bounds::new(41.0, -5.0, 51.0, 9.5)),
            NodeSpec::leaf("MC", 5).with_bounds(Bounds::new(43.7, 7.4, 43.76, 7.44)),
            NodeSpec::leaf("XX", 5),
        ]))
        .unwrap()
    }

    #[test]
    fn test_smallest_enclosing_leaf_wins() {
        let catalog = catalog();
        let locator = BoundsLocator::new(&catalog);
        assert_eq!(locator.locate(43.73, 7.42), Some(NodeId::new("MC")));
        assert_eq!(locator.locate(48.85, 2.35), Some(NodeId::new("FR")));
    }

    #[test]
    fn test_point_outside_all_regions() {
        let catalog = catalog();
        assert_eq!(BoundsLocator::new(&catalog).locate(-33.9, 151.2), None);
    }
}
