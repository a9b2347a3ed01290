//! In-process transfer engine that fakes byte movement with timed chunks.
//!
//! Used by the CLI demo and the integration tests. Each node transfer runs
//! on its own thread and reports through the [`ProgressSink`] it was given;
//! index builds run on a thread as well. Bootstrap files transfer on the
//! caller's thread, as the port requires.
//!
//! Failures can be injected per node or for the next bootstrap file.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mapfetch_core::{
    BootstrapChunk, Catalog, ErrorCode, Locator, NodeId, ProgressSink, TransferEngine,
};

const LOG_TARGET: &str = "mapfetch.engine";

/// Pace of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Bytes moved per step.
    pub chunk_size: u64,
    /// Pause between steps.
    pub chunk_delay: Duration,
    /// Time taken to build a node's index.
    pub index_delay: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            chunk_delay: Duration::from_millis(10),
            index_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    bootstrap_present: HashSet<String>,
    bootstrap_failure: Option<ErrorCode>,
    /// Bytes already fetched by paused transfers.
    partial: HashMap<NodeId, u64>,
    installed: HashSet<NodeId>,
    transfer_failures: HashMap<NodeId, ErrorCode>,
    index_failures: HashMap<NodeId, ErrorCode>,
    tokens: HashMap<NodeId, CancellationToken>,
}

/// Simulated engine.
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    catalog: Arc<Catalog>,
    settings: SimulationSettings,
    state: Arc<Mutex<SimState>>,
    bootstrap_cancel: Arc<AtomicBool>,
}

impl SimulatedEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            settings: SimulationSettings::default(),
            state: Arc::new(Mutex::new(SimState::default())),
            bootstrap_cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SimulationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Treat every bootstrap resource as already present.
    #[must_use]
    pub fn with_bootstrap_present(self) -> Self {
        {
            let mut state = self.lock();
            state.bootstrap_present = self
                .catalog
                .bootstrap_resources()
                .iter()
                .map(|r| r.name.clone())
                .collect();
        }
        self
    }

    /// Make the next node transfer of `id` fail halfway with `code`.
    pub fn fail_transfer(&self, id: &NodeId, code: ErrorCode) {
        self.lock().transfer_failures.insert(id.clone(), code);
    }

    /// Make the next index build of `id` fail with `code`.
    pub fn fail_index(&self, id: &NodeId, code: ErrorCode) {
        self.lock().index_failures.insert(id.clone(), code);
    }

    /// Make the next bootstrap file fail with `code`.
    pub fn fail_bootstrap(&self, code: ErrorCode) {
        self.lock().bootstrap_failure = Some(code);
    }

    pub fn is_installed(&self, id: &NodeId) -> bool {
        self.lock().installed.contains(id)
    }

    /// Bytes kept from a paused transfer.
    pub fn partial_bytes(&self, id: &NodeId) -> u64 {
        self.lock().partial.get(id).copied().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self, id: &NodeId, keep_partial: bool) {
        let mut state = self.lock();
        if let Some(token) = state.tokens.remove(id) {
            token.cancel();
        }
        if !keep_partial {
            state.partial.remove(id);
        }
    }
}

impl TransferEngine for SimulatedEngine {
    fn probe_bootstrap_size(&self) -> Result<u64, ErrorCode> {
        let state = self.lock();
        Ok(self
            .catalog
            .bootstrap_resources()
            .iter()
            .filter(|r| !state.bootstrap_present.contains(&r.name))
            .map(|r| r.size)
            .sum())
    }

    fn transfer_next_bootstrap_file(&self) -> BootstrapChunk {
        // A cancel only applies to the file in flight.
        self.bootstrap_cancel.store(false, Ordering::SeqCst);

        let resource = {
            let mut state = self.lock();
            let next = self
                .catalog
                .bootstrap_resources()
                .iter()
                .find(|r| !state.bootstrap_present.contains(&r.name))
                .cloned();
            if next.is_some() {
                if let Some(code) = state.bootstrap_failure.take() {
                    return BootstrapChunk::failed(code);
                }
            }
            next
        };
        let Some(resource) = resource else {
            return BootstrapChunk::done();
        };

        let mut moved = 0u64;
        while moved < resource.size {
            thread::sleep(self.settings.chunk_delay);
            if self.bootstrap_cancel.swap(false, Ordering::SeqCst) {
                tracing::debug!(target: LOG_TARGET, file = %resource.name, "Bootstrap file cancelled");
                return BootstrapChunk::failed(ErrorCode::DownloadError);
            }
            moved = moved
                .saturating_add(self.settings.chunk_size)
                .min(resource.size);
        }

        tracing::debug!(target: LOG_TARGET, file = %resource.name, size = resource.size, "Bootstrap file transferred");
        self.lock().bootstrap_present.insert(resource.name);
        BootstrapChunk::transferred(resource.size)
    }

    fn cancel_bootstrap_file(&self) {
        self.bootstrap_cancel.store(true, Ordering::SeqCst);
    }

    fn begin_node_transfer(&self, id: &NodeId, sink: ProgressSink) {
        let token = CancellationToken::new();
        let (start, failure) = {
            let mut state = self.lock();
            if let Some(previous) = state.tokens.insert(id.clone(), token.clone()) {
                previous.cancel();
            }
            (
                state.partial.get(id).copied().unwrap_or_default(),
                state.transfer_failures.remove(id),
            )
        };

        let engine = self.clone();
        let id = id.clone();
        let total = self.catalog.remote_size(&id);
        thread::spawn(move || engine.run_transfer(&id, start, total, failure, &token, &sink));
    }

    fn pause_node_transfer(&self, id: &NodeId) {
        tracing::debug!(target: LOG_TARGET, id = %id, partial = self.partial_bytes(id), "Transfer paused");
        self.stop(id, true);
    }

    fn cancel_node_transfer(&self, id: &NodeId) {
        tracing::debug!(target: LOG_TARGET, id = %id, "Transfer cancelled");
        self.stop(id, false);
    }

    fn build_index(&self, id: &NodeId, sink: ProgressSink) {
        let engine = self.clone();
        let id = id.clone();
        thread::spawn(move || {
            thread::sleep(engine.settings.index_delay);
            let result = {
                let mut state = engine.lock();
                let Some(token) = state.tokens.get(&id).cloned() else {
                    return;
                };
                if token.is_cancelled() {
                    return;
                }
                state.tokens.remove(&id);
                match state.index_failures.remove(&id) {
                    Some(code) => code,
                    None => {
                        state.installed.insert(id.clone());
                        ErrorCode::Success
                    }
                }
            };
            sink.index_built(&id, result);
        });
    }

    fn delete_local(&self, id: &NodeId) -> Result<(), ErrorCode> {
        let mut state = self.lock();
        state.installed.remove(id);
        state.partial.remove(id);
        Ok(())
    }

    fn find_leaf_by_location(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.catalog.bounds_locator().locate(lat, lon)
    }
}

impl SimulatedEngine {
    fn run_transfer(
        &self,
        id: &NodeId,
        start: u64,
        total: u64,
        failure: Option<ErrorCode>,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) {
        let fail_at = failure.map(|_| total / 2);
        let mut current = start;
        loop {
            if current >= total || fail_at.is_some_and(|at| current >= at) {
                break;
            }
            thread::sleep(self.settings.chunk_delay);
            {
                let mut state = self.lock();
                if token.is_cancelled() {
                    return;
                }
                current = current.saturating_add(self.settings.chunk_size).min(total);
                state.partial.insert(id.clone(), current);
            }
            sink.progress(id, current, total);
        }

        {
            let mut state = self.lock();
            if token.is_cancelled() {
                return;
            }
            state.partial.remove(id);
        }
        let result = failure.unwrap_or(ErrorCode::Success);
        tracing::debug!(target: LOG_TARGET, id = %id, %result, "Transfer finished");
        sink.finished(id, result);
    }
}
