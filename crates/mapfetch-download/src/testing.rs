//! Test doubles shared by the orchestrator and service tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use mapfetch_core::{
    BootstrapChunk, Catalog, CatalogSpec, ErrorCode, NodeId, NodeSpec, NodeStateRepository,
    NoopRepository, OrchestratorConfig, ProgressSink, StorageEvent, TransferEngine,
};

use crate::orchestrator::{Orchestrator, OrchestratorDeps};

pub fn id(code: &str) -> NodeId {
    NodeId::new(code)
}

/// Every call the orchestrator made into the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Probe,
    NextBootstrapFile,
    CancelBootstrapFile,
    Begin(NodeId),
    Pause(NodeId),
    Cancel(NodeId),
    BuildIndex(NodeId),
    Delete(NodeId),
}

/// Engine that records calls and answers from a script.
///
/// Node transfers never finish on their own; tests feed completion reports
/// to the orchestrator directly or through [`last_sink`](Self::last_sink).
#[derive(Default)]
pub struct ScriptedEngine {
    probes: Mutex<VecDeque<Result<u64, ErrorCode>>>,
    chunks: Mutex<VecDeque<BootstrapChunk>>,
    calls: Mutex<Vec<EngineCall>>,
    location: Mutex<Option<NodeId>>,
    delete_failure: Mutex<Option<ErrorCode>>,
    sink: Mutex<Option<ProgressSink>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_probe(&self, result: Result<u64, ErrorCode>) {
        self.probes.lock().unwrap().push_back(result);
    }

    pub fn script_chunks(&self, chunks: impl IntoIterator<Item = BootstrapChunk>) {
        self.chunks.lock().unwrap().extend(chunks);
    }

    pub fn place_at(&self, leaf: NodeId) {
        *self.location.lock().unwrap() = Some(leaf);
    }

    pub fn clear_location(&self) {
        *self.location.lock().unwrap() = None;
    }

    pub fn fail_delete(&self, code: ErrorCode) {
        *self.delete_failure.lock().unwrap() = Some(code);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> Option<ProgressSink> {
        self.sink.lock().unwrap().clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TransferEngine for ScriptedEngine {
    fn probe_bootstrap_size(&self) -> Result<u64, ErrorCode> {
        self.record(EngineCall::Probe);
        self.probes.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    fn transfer_next_bootstrap_file(&self) -> BootstrapChunk {
        self.record(EngineCall::NextBootstrapFile);
        self.chunks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(BootstrapChunk::done)
    }

    fn cancel_bootstrap_file(&self) {
        self.record(EngineCall::CancelBootstrapFile);
    }

    fn begin_node_transfer(&self, id: &NodeId, sink: ProgressSink) {
        self.record(EngineCall::Begin(id.clone()));
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn pause_node_transfer(&self, id: &NodeId) {
        self.record(EngineCall::Pause(id.clone()));
    }

    fn cancel_node_transfer(&self, id: &NodeId) {
        self.record(EngineCall::Cancel(id.clone()));
    }

    fn build_index(&self, id: &NodeId, sink: ProgressSink) {
        self.record(EngineCall::BuildIndex(id.clone()));
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn delete_local(&self, id: &NodeId) -> Result<(), ErrorCode> {
        self.record(EngineCall::Delete(id.clone()));
        match *self.delete_failure.lock().unwrap() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn find_leaf_by_location(&self, _lat: f64, _lon: f64) -> Option<NodeId> {
        self.location.lock().unwrap().clone()
    }
}

/// Records every published event.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<StorageEvent>>>,
}

impl EventLog {
    pub fn attach(orch: &Orchestrator) -> Self {
        let log = Self::default();
        let sink = Arc::clone(&log.events);
        orch.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<StorageEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    /// Leaf status changes of one node, in order.
    pub fn statuses_of(&self, code: &str) -> Vec<mapfetch_core::NodeStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StorageEvent::StatusChanged { id, status, .. } if id.as_str() == code => {
                    Some(status)
                }
                _ => None,
            })
            .collect()
    }

    /// Index of the first event setting `code` to `status`.
    pub fn position_of_status(&self, code: &str, status: mapfetch_core::NodeStatus) -> Option<usize> {
        self.events().iter().position(|e| {
            matches!(e, StorageEvent::StatusChanged { id, status: s, .. } if id.as_str() == code && *s == status)
        })
    }
}

/// `Countries > { Europe > { FR 1000, DE 2000, IT 1500 }, JP 500 }`.
pub fn catalog() -> Arc<Catalog> {
    let spec = CatalogSpec::new(vec![
        NodeSpec::group(
            "Europe",
            vec![
                NodeSpec::leaf("FR", 1000),
                NodeSpec::leaf("DE", 2000),
                NodeSpec::leaf("IT", 1500),
            ],
        ),
        NodeSpec::leaf("JP", 500),
    ]);
    Arc::new(Catalog::from_spec(spec).unwrap())
}

pub fn config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_progress_interval_ms(0)
}

pub fn fixture() -> (Orchestrator, Arc<ScriptedEngine>) {
    let engine = Arc::new(ScriptedEngine::new());
    let orch = fixture_with(Arc::clone(&engine), Arc::new(NoopRepository));
    (orch, engine)
}

pub fn fixture_with(
    engine: Arc<ScriptedEngine>,
    repository: Arc<dyn NodeStateRepository>,
) -> Orchestrator {
    Orchestrator::new(
        OrchestratorDeps {
            catalog: catalog(),
            engine,
            repository,
        },
        config(),
    )
}
