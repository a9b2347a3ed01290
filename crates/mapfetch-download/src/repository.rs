//! Node state repositories.
//!
//! - [`InMemoryRepository`] keeps everything in process (tests, demos)
//! - [`JsonFileRepository`] keeps one JSON document on disk
//!
//! # File format
//!
//! ```json
//! {
//!   "version": 1,
//!   "nodes": { "FR": { "status": "on_disk", "local_size": 1000 } },
//!   "queue": ["DE", "IT"]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use mapfetch_core::{NodeId, NodeStateRepository, PersistedNode, RepositoryError};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    nodes: HashMap<NodeId, PersistedNode>,
    #[serde(default)]
    queue: Vec<NodeId>,
}

/// Repository that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    doc: Mutex<Document>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted queue, in order.
    pub fn queue(&self) -> Vec<NodeId> {
        self.doc
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .clone()
    }

    /// Persisted record of one node.
    pub fn node(&self, id: &NodeId) -> Option<PersistedNode> {
        self.doc
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .get(id)
            .copied()
    }
}

impl NodeStateRepository for InMemoryRepository {
    fn save_status(&self, id: &NodeId, node: &PersistedNode) -> Result<(), RepositoryError> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        doc.nodes.insert(id.clone(), *node);
        Ok(())
    }

    fn load_statuses(&self) -> Result<HashMap<NodeId, PersistedNode>, RepositoryError> {
        let doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(doc.nodes.clone())
    }

    fn save_queue(&self, ids: &[NodeId]) -> Result<(), RepositoryError> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        doc.queue = ids.to_vec();
        Ok(())
    }

    fn load_queue(&self) -> Result<Vec<NodeId>, RepositoryError> {
        Ok(self.queue())
    }
}

/// Repository backed by a single JSON file.
///
/// The document is cached in memory and rewritten in full on every save,
/// through a temp file and a rename.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileRepository {
    /// Open the file at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(content) => parse_document(&content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Document {
                version: FORMAT_VERSION,
                ..Document::default()
            },
            Err(e) => return Err(storage_error(&path, &e)),
        };
        tracing::debug!(path = %path.display(), nodes = doc.nodes.len(), "Opened state file");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, doc: &Document) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| storage_error(dir, &e))?;
        }
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, json).map_err(|e| storage_error(&temp, &e))?;
        fs::rename(&temp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

impl NodeStateRepository for JsonFileRepository {
    fn save_status(&self, id: &NodeId, node: &PersistedNode) -> Result<(), RepositoryError> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        doc.nodes.insert(id.clone(), *node);
        self.write(&doc)
    }

    fn load_statuses(&self) -> Result<HashMap<NodeId, PersistedNode>, RepositoryError> {
        let doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(doc.nodes.clone())
    }

    fn save_queue(&self, ids: &[NodeId]) -> Result<(), RepositoryError> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        if doc.queue == ids {
            return Ok(());
        }
        doc.queue = ids.to_vec();
        self.write(&doc)
    }

    fn load_queue(&self) -> Result<Vec<NodeId>, RepositoryError> {
        let doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(doc.queue.clone())
    }
}

fn parse_document(content: &str) -> Result<Document, RepositoryError> {
    let doc: Document = serde_json::from_str(content)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    if doc.version != FORMAT_VERSION {
        return Err(RepositoryError::Serialization(format!(
            "unsupported state file version {}",
            doc.version
        )));
    }
    Ok(doc)
}

fn storage_error(path: &Path, e: &io::Error) -> RepositoryError {
    RepositoryError::Storage(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapfetch_core::NodeStatus;
    use tempfile::TempDir;

    fn on_disk(size: u64) -> PersistedNode {
        PersistedNode {
            status: NodeStatus::OnDisk,
            local_size: size,
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("state.json")).unwrap();
        assert!(repo.load_statuses().unwrap().is_empty());
        assert!(repo.load_queue().unwrap().is_empty());
        assert!(!repo.path().exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let repo = JsonFileRepository::open(&path).unwrap();
        repo.save_status(&NodeId::new("FR"), &on_disk(1000)).unwrap();
        repo.save_queue(&[NodeId::new("DE"), NodeId::new("IT")]).unwrap();
        drop(repo);

        let reopened = JsonFileRepository::open(&path).unwrap();
        assert_eq!(
            reopened.load_statuses().unwrap().get(&NodeId::new("FR")),
            Some(&on_disk(1000))
        );
        assert_eq!(
            reopened.load_queue().unwrap(),
            vec![NodeId::new("DE"), NodeId::new("IT")]
        );
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let repo = JsonFileRepository::open(&path).unwrap();
        repo.save_status(&NodeId::new("JP"), &on_disk(500)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["nodes"]["JP"]["status"], "on_disk");
        assert_eq!(value["nodes"]["JP"]["local_size"], 500);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileRepository::open(&path),
            Err(RepositoryError::Serialization(_))
        ));

        fs::write(&path, r#"{"version": 9}"#).unwrap();
        assert!(JsonFileRepository::open(&path).is_err());
    }

    #[test]
    fn test_in_memory_round_trip() {
        let repo = InMemoryRepository::new();
        repo.save_status(&NodeId::new("FR"), &on_disk(1)).unwrap();
        repo.save_queue(&[NodeId::new("DE")]).unwrap();
        assert_eq!(repo.node(&NodeId::new("FR")), Some(on_disk(1)));
        assert_eq!(repo.load_queue().unwrap(), vec![NodeId::new("DE")]);
    }
}
