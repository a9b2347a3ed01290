//! Resource catalog: the read-only hierarchical index of downloadable units.
//!
//! The catalog is built once (usually from a JSON file) and never mutated
//! afterwards, so it is safe to share behind an `Arc` and read from any
//! thread.
//!
//! # Structure
//!
//! - `node` - Identifiers and node metadata (`NodeId`, `CatalogNode`, `Bounds`)
//! - `locate` - Point-in-region lookup contract (`Locator`, `BoundsLocator`)

mod locate;
mod node;

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use locate::{BoundsLocator, Locator};
pub use node::{BootstrapResource, Bounds, CatalogNode, DEFAULT_ROOT_ID, NodeId};

/// Errors raised while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The same id appears twice in the tree.
    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// A node has an empty id.
    #[error("Node under '{parent}' has an empty id")]
    EmptyId { parent: NodeId },

    /// The root has no children, nothing can ever be downloaded.
    #[error("Catalog has no regions")]
    Empty,

    /// A node carries a malformed bounding box.
    #[error("Invalid bounds on node {0}")]
    InvalidBounds(NodeId),

    /// The catalog file could not be read.
    #[error("Failed to read catalog {path}: {reason}")]
    Io { path: String, reason: String },

    /// The catalog file is not valid JSON for the expected schema.
    #[error("Failed to parse catalog: {0}")]
    Parse(String),
}

/// Serialized description of one node and its subtree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remote size; only meaningful for leaves.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// A downloadable leaf.
    pub fn leaf(id: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            size,
            ..Self::default()
        }
    }

    /// A group node.
    pub fn group(id: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            id: id.into(),
            children,
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the region bounds.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Serialized description of a whole catalog (the on-disk JSON shape).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogSpec {
    /// Data version of the published maps.
    #[serde(default)]
    pub version: i64,
    /// Mandatory resources fetched before the map is usable.
    #[serde(default)]
    pub bootstrap: Vec<BootstrapResource>,
    /// Root of the region tree.
    pub root: NodeSpec,
}

impl CatalogSpec {
    /// Build a spec with the default root around the given top-level nodes.
    pub fn new(children: Vec<NodeSpec>) -> Self {
        Self {
            version: 0,
            bootstrap: Vec::new(),
            root: NodeSpec::group(DEFAULT_ROOT_ID, children),
        }
    }

    /// Set the mandatory bootstrap resources.
    #[must_use]
    pub fn with_bootstrap(mut self, resources: Vec<BootstrapResource>) -> Self {
        self.bootstrap = resources;
        self
    }

    /// Set the data version.
    #[must_use]
    pub const fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}

/// Read-only index of bootstrap resources and the region tree.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: i64,
    root: NodeId,
    nodes: HashMap<NodeId, CatalogNode>,
    /// Leaves in depth-first catalog order.
    leaf_order: Vec<NodeId>,
    /// Ancestor chain of every node, nearest first, root excluded.
    ancestry: HashMap<NodeId, Vec<NodeId>>,
    /// Each node's leaves as a contiguous span of `leaf_order`.
    leaf_spans: HashMap<NodeId, Range<usize>>,
    bootstrap: Vec<BootstrapResource>,
}

impl Catalog {
    /// Build a catalog from its serialized description.
    pub fn from_spec(spec: CatalogSpec) -> Result<Self, CatalogError> {
        if spec.root.children.is_empty() {
            return Err(CatalogError::Empty);
        }

        let root_id = NodeId::new(spec.root.id.clone());
        let mut catalog = Self {
            version: spec.version,
            root: root_id,
            nodes: HashMap::new(),
            leaf_order: Vec::new(),
            ancestry: HashMap::new(),
            leaf_spans: HashMap::new(),
            bootstrap: spec.bootstrap,
        };
        catalog.insert(spec.root, None)?;
        Ok(catalog)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let spec: CatalogSpec =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_spec(spec)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            version = catalog.version,
            leaves = catalog.leaf_order.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Recursively flatten a subtree, returning the subtree's remote size.
    fn insert(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> Result<u64, CatalogError> {
        let id = NodeId::new(spec.id);
        if id.is_empty() {
            return Err(CatalogError::EmptyId {
                parent: parent.unwrap_or_else(|| self.root.clone()),
            });
        }
        if self.nodes.contains_key(&id) {
            return Err(CatalogError::DuplicateId(id));
        }
        if spec.bounds.is_some_and(|b| !b.is_valid()) {
            return Err(CatalogError::InvalidBounds(id));
        }

        let children: Vec<NodeId> = spec
            .children
            .iter()
            .map(|child| NodeId::new(child.id.clone()))
            .collect();

        let chain: Vec<NodeId> = match &parent {
            Some(p) if !self.is_root(p) => std::iter::once(p.clone())
                .chain(self.ancestry.get(p).into_iter().flatten().cloned())
                .collect(),
            _ => Vec::new(),
        };
        self.ancestry.insert(id.clone(), chain);

        // Reserve the slot first so duplicate detection sees ancestors.
        self.nodes.insert(
            id.clone(),
            CatalogNode {
                id: id.clone(),
                name: spec.name.unwrap_or_else(|| id.to_string()),
                remote_size_bytes: 0,
                parent: parent.clone(),
                children,
                bounds: spec.bounds,
            },
        );

        let first_leaf = self.leaf_order.len();
        let size = if spec.children.is_empty() {
            self.leaf_order.push(id.clone());
            spec.size
        } else {
            let mut total = 0u64;
            for child in spec.children {
                total = total.saturating_add(self.insert(child, Some(id.clone()))?);
            }
            total
        };

        if let Some(node) = self.nodes.get_mut(&id) {
            node.remote_size_bytes = size;
        }
        self.leaf_spans.insert(id, first_leaf..self.leaf_order.len());
        Ok(size)
    }

    /// Data version of the published maps.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Id of the root ("no selection").
    #[must_use]
    pub const fn root_id(&self) -> &NodeId {
        &self.root
    }

    /// Check whether an id is the root.
    #[must_use]
    pub fn is_root(&self, id: &NodeId) -> bool {
        &self.root == id
    }

    /// The root node.
    ///
    /// # Panics
    ///
    /// Never in practice: construction always inserts the root.
    #[must_use]
    pub fn root(&self) -> &CatalogNode {
        &self.nodes[&self.root]
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&CatalogNode> {
        self.nodes.get(id)
    }

    /// Check whether a node exists.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Children of a node in catalog order; empty for leaves and unknown ids.
    #[must_use]
    pub fn children(&self, id: &NodeId) -> Vec<&CatalogNode> {
        self.nodes.get(id).map_or_else(Vec::new, |node| {
            node.children
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .collect()
        })
    }

    /// Check whether a node is a leaf. Unknown ids are not leaves.
    #[must_use]
    pub fn is_leaf(&self, id: &NodeId) -> bool {
        self.nodes.get(id).is_some_and(CatalogNode::is_leaf)
    }

    /// Parent of a node (absent for the root and unknown ids).
    #[must_use]
    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(|node| node.parent.as_ref())
    }

    /// Ancestors of a node, nearest first, excluding the root.
    ///
    /// Precomputed at build time; empty for the root and unknown ids.
    #[must_use]
    pub fn ancestors(&self, id: &NodeId) -> &[NodeId] {
        self.ancestry.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Leaves under a node in catalog order; a leaf yields itself.
    ///
    /// A subtree's leaves are contiguous in depth-first order, so this is a
    /// slice of the catalog's leaf list.
    #[must_use]
    pub fn leaves_under(&self, id: &NodeId) -> &[NodeId] {
        self.leaf_spans
            .get(id)
            .and_then(|span| self.leaf_order.get(span.clone()))
            .unwrap_or_default()
    }

    /// All leaves in catalog order.
    pub fn leaves(&self) -> impl Iterator<Item = &CatalogNode> {
        self.leaf_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Number of downloadable leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_order.len()
    }

    /// Mandatory bootstrap resources.
    #[must_use]
    pub fn bootstrap_resources(&self) -> &[BootstrapResource] {
        &self.bootstrap
    }

    /// Remote size of a node (0 for unknown ids).
    #[must_use]
    pub fn remote_size(&self, id: &NodeId) -> u64 {
        self.nodes.get(id).map_or(0, |node| node.remote_size_bytes)
    }

    /// Resolve coordinates to the smallest enclosing leaf.
    ///
    /// Results that are not leaves of this catalog are discarded.
    pub fn find_by_location(&self, lat: f64, lon: f64, locator: &dyn Locator) -> Option<NodeId> {
        locator
            .locate(lat, lon)
            .filter(|id| self.is_leaf(id))
    }

    /// A locator backed by the bounding boxes in this catalog.
    #[must_use]
    pub const fn bounds_locator(&self) -> BoundsLocator<'_> {
        BoundsLocator::new(self)
    }
}
