//! Catalog node types.
//!
//! Pure data types with no I/O dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default id of the catalog root ("no selection").
pub const DEFAULT_ROOT_ID: &str = "Countries";

/// Opaque identifier of a catalog node.
///
/// Ids are flat string codes (e.g. `"FR"`, `"Europe"`). The catalog root
/// carries a distinguished id that stands for "no selection".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from its code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The default root id.
    #[must_use]
    pub fn root() -> Self {
        Self(DEFAULT_ROOT_ID.to_string())
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the code is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for NodeId {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for NodeId {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Geographic bounding box of a region, in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Create a bounding box from its corners.
    #[must_use]
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Check whether the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Area in square degrees, used to pick the smallest enclosing region.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.max_lat - self.min_lat).abs() * (self.max_lon - self.min_lon).abs()
    }

    /// Check that min corners are not above max corners and values are in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
            && (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat)
            && (-180.0..=180.0).contains(&self.min_lon)
            && (-180.0..=180.0).contains(&self.max_lon)
    }
}

/// One downloadable unit (leaf) or a group of them (inner node).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    /// Identity of the node.
    pub id: NodeId,
    /// Human-readable label (not used for identity).
    pub name: String,
    /// Size of the remote map file; for inner nodes the sum over leaves.
    pub remote_size_bytes: u64,
    /// Parent node, absent for the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    /// Ordered child ids; empty for leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    /// Region bounds, if the catalog carries them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl CatalogNode {
    /// Check if this node is a leaf (the unit of download).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A mandatory resource fetched before the map is usable at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapResource {
    /// File name of the resource (e.g. `World.mwm`).
    pub name: String,
    /// Size of the remote file in bytes.
    pub size: u64,
}

impl BootstrapResource {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}
