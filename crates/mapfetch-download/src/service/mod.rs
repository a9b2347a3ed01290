//! Async host for the orchestrator.
//!
//! # Architecture
//!
//! - **Actor**: a single task owns the [`Orchestrator`] and applies, one at
//!   a time, host commands, engine reports and bootstrap file outcomes
//! - **Handle**: cheap to clone; sends commands and awaits their replies,
//!   and reads node state straight from the shared store
//! - **Watch channels**: the bootstrap status and the queue are republished
//!   after every step so hosts can await them without polling
//!
//! Bootstrap files transfer on the blocking pool, one at a time, so the
//! actor keeps answering commands (pause, status) while a file is in flight.

mod port;

use std::future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use mapfetch_core::{
    BootstrapChunk, BootstrapPhase, CatalogNode, EngineEvent, ErrorCode, NodeId, NodeState,
    NodeStateStore, NodeStatus, StorageError, StorageEvent, StorageResult, SubscriptionHandle,
    SubscriptionRegistry,
};

use crate::orchestrator::{BootstrapStatus, EnqueueOutcome, Orchestrator};

pub use port::OrchestratorPort;

const LOG_TARGET: &str = "mapfetch.service";

type Reply<T> = oneshot::Sender<StorageResult<T>>;

enum Command {
    Start(Reply<BootstrapPhase>),
    Retry(Reply<BootstrapPhase>),
    Cancel(Reply<BootstrapPhase>),
    PauseBootstrap(Reply<()>),
    ResumeBootstrap(Reply<()>),
    SetLocation {
        lat: f64,
        lon: f64,
        reply: oneshot::Sender<Option<NodeId>>,
    },
    Offer(oneshot::Sender<Option<CatalogNode>>),
    AcceptOffer(Reply<EnqueueOutcome>),
    DeclineOffer(Reply<()>),
    Enqueue(NodeId, Reply<EnqueueOutcome>),
    Update(NodeId, Reply<EnqueueOutcome>),
    Pause(NodeId, Reply<bool>),
    CancelDownload(NodeId, Reply<()>),
    RetryDownload(NodeId, Reply<usize>),
    DeleteLocal(NodeId, Reply<()>),
    MarkOutOfDate(NodeId, Reply<usize>),
    OutdatedNodes(oneshot::Sender<Vec<NodeId>>),
    Reconnected(oneshot::Sender<Option<NodeId>>),
    RestoreQueue(oneshot::Sender<usize>),
    OverallProgress(Vec<NodeId>, oneshot::Sender<(u64, u64)>),
}

/// Published view of the download queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    /// Leaf transferring or indexing.
    pub active: Option<NodeId>,
    /// Waiting leaves in order.
    pub waiting: Vec<NodeId>,
    /// Set while transfers are halted by a storage disconnect.
    pub suspended: Option<ErrorCode>,
}

impl QueueView {
    /// Nothing active and nothing waiting.
    pub const fn is_idle(&self) -> bool {
        self.active.is_none() && self.waiting.is_empty()
    }
}

/// Spawns the orchestrator task.
pub struct OrchestratorService;

impl OrchestratorService {
    /// Move the orchestrator onto its own task and return a handle to it.
    ///
    /// Must be called within a tokio runtime. The task ends once every
    /// handle is dropped.
    pub fn spawn(mut orchestrator: Orchestrator) -> OrchestratorHandle {
        let (commands_tx, commands_rx) = mpsc::channel(orchestrator.config().command_buffer);
        let (bootstrap_tx, bootstrap_rx) = watch::channel(orchestrator.bootstrap_status());
        let (queue_tx, queue_rx) = watch::channel(queue_view(&orchestrator));

        let handle = OrchestratorHandle {
            commands: commands_tx,
            store: Arc::clone(orchestrator.store()),
            events: Arc::clone(orchestrator.events()),
            bootstrap: bootstrap_rx,
            queue: queue_rx,
        };

        let actor = Actor {
            engine_events: orchestrator.take_engine_events(),
            orchestrator,
            commands: commands_rx,
            bootstrap_task: None,
            bootstrap_tx,
            queue_tx,
        };
        tokio::spawn(actor.run());

        handle
    }
}

struct Actor {
    orchestrator: Orchestrator,
    commands: mpsc::Receiver<Command>,
    engine_events: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    bootstrap_task: Option<JoinHandle<BootstrapChunk>>,
    bootstrap_tx: watch::Sender<BootstrapStatus>,
    queue_tx: watch::Sender<QueueView>,
}

impl Actor {
    async fn run(mut self) {
        tracing::debug!(target: LOG_TARGET, "Orchestrator task started");
        loop {
            self.schedule_bootstrap();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(event) = next_event(&mut self.engine_events) => {
                    self.orchestrator.handle_engine_event(event);
                    self.publish();
                }
                outcome = next_chunk(&mut self.bootstrap_task) => {
                    self.bootstrap_task = None;
                    let chunk = outcome.unwrap_or_else(|e| {
                        tracing::error!(target: LOG_TARGET, error = %e, "Bootstrap worker failed");
                        BootstrapChunk::failed(ErrorCode::DownloadError)
                    });
                    self.orchestrator.apply_bootstrap_chunk(chunk);
                    self.publish();
                }
            }
        }
        tracing::debug!(target: LOG_TARGET, "Orchestrator task stopped");
    }

    /// Start the next bootstrap file if one is due and none is in flight.
    fn schedule_bootstrap(&mut self) {
        if self.bootstrap_task.is_some() || !self.orchestrator.wants_bootstrap_step() {
            return;
        }
        let engine = self.orchestrator.engine();
        self.bootstrap_task = Some(tokio::task::spawn_blocking(move || {
            engine.transfer_next_bootstrap_file()
        }));
    }

    fn handle(&mut self, command: Command) {
        let orch = &mut self.orchestrator;
        match command {
            Command::Start(reply) => {
                let result = orch.begin_start();
                self.respond(reply, result);
            }
            Command::Retry(reply) => {
                let result = orch.begin_retry();
                self.respond(reply, result);
            }
            Command::Cancel(reply) => {
                let result = orch.cancel();
                self.respond(reply, result);
            }
            Command::PauseBootstrap(reply) => {
                let result = orch.pause_bootstrap();
                self.respond(reply, result);
            }
            Command::ResumeBootstrap(reply) => {
                let result = orch.resume_bootstrap();
                self.respond(reply, result);
            }
            Command::SetLocation { lat, lon, reply } => {
                let result = orch.set_location(lat, lon);
                self.respond(reply, result);
            }
            Command::Offer(reply) => {
                let result = orch.offer_location_based_download();
                self.respond(reply, result);
            }
            Command::AcceptOffer(reply) => {
                let result = orch.accept_offer();
                self.respond(reply, result);
            }
            Command::DeclineOffer(reply) => {
                let result = orch.decline_offer();
                self.respond(reply, result);
            }
            Command::Enqueue(id, reply) => {
                let result = orch.enqueue_download(&id);
                self.respond(reply, result);
            }
            Command::Update(id, reply) => {
                let result = orch.update_node(&id);
                self.respond(reply, result);
            }
            Command::Pause(id, reply) => {
                let result = orch.pause_download(&id);
                self.respond(reply, result);
            }
            Command::CancelDownload(id, reply) => {
                let result = orch.cancel_download(&id);
                self.respond(reply, result);
            }
            Command::RetryDownload(id, reply) => {
                let result = orch.retry_download(&id);
                self.respond(reply, result);
            }
            Command::DeleteLocal(id, reply) => {
                let result = orch.delete_local(&id);
                self.respond(reply, result);
            }
            Command::MarkOutOfDate(id, reply) => {
                let result = orch.mark_out_of_date(&id);
                self.respond(reply, result);
            }
            Command::OutdatedNodes(reply) => {
                let result = orch.outdated_nodes();
                self.respond(reply, result);
            }
            Command::Reconnected(reply) => {
                let result = orch.storage_reconnected();
                self.respond(reply, result);
            }
            Command::RestoreQueue(reply) => {
                let result = orch.restore_queue();
                self.respond(reply, result);
            }
            Command::OverallProgress(ids, reply) => {
                let result = orch.overall_progress(&ids);
                self.respond(reply, result);
            }
        }
    }

    /// Publish state, then answer: a caller woken by the reply always sees
    /// the watch channels already updated.
    fn respond<T>(&self, reply: oneshot::Sender<T>, value: T) {
        self.publish();
        if reply.send(value).is_err() {
            tracing::trace!(target: LOG_TARGET, "Caller went away before the reply");
        }
    }

    fn publish(&self) {
        let status = self.orchestrator.bootstrap_status();
        self.bootstrap_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });

        let view = queue_view(&self.orchestrator);
        self.queue_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}

fn queue_view(orchestrator: &Orchestrator) -> QueueView {
    QueueView {
        active: orchestrator.active_node().cloned(),
        waiting: orchestrator.queued_ids(),
        suspended: orchestrator.suspended(),
    }
}

async fn next_event(rx: &mut Option<mpsc::UnboundedReceiver<EngineEvent>>) -> Option<EngineEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn next_chunk(task: &mut Option<JoinHandle<BootstrapChunk>>) -> Result<BootstrapChunk, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => future::pending().await,
    }
}

/// Client side of the orchestrator task.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    store: Arc<NodeStateStore>,
    events: Arc<SubscriptionRegistry<StorageEvent>>,
    bootstrap: watch::Receiver<BootstrapStatus>,
    queue: watch::Receiver<QueueView>,
}

impl OrchestratorHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> StorageResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| StorageError::Shutdown)?;
        rx.await.map_err(|_| StorageError::Shutdown)
    }

    /// Shared-read state store.
    pub const fn store(&self) -> &Arc<NodeStateStore> {
        &self.store
    }

    pub fn state_of(&self, id: &NodeId) -> Option<NodeState> {
        self.store.state_of(id)
    }

    /// State of every node in catalog order.
    pub fn snapshot(&self) -> Vec<NodeState> {
        self.store.snapshot()
    }

    /// Latest published bootstrap status.
    pub fn bootstrap_status(&self) -> BootstrapStatus {
        *self.bootstrap.borrow()
    }

    /// Latest published queue.
    pub fn queue(&self) -> QueueView {
        self.queue.borrow().clone()
    }

    /// Wait until the bootstrap completes, fails or is cancelled.
    pub async fn wait_for_bootstrap(&self) -> StorageResult<BootstrapStatus> {
        let mut rx = self.bootstrap.clone();
        let status = rx
            .wait_for(|s| s.phase.is_terminal() || s.phase == BootstrapPhase::Failed)
            .await
            .map_err(|_| StorageError::Shutdown)?;
        Ok(*status)
    }

    /// Wait until the queue satisfies `predicate`.
    pub async fn wait_for_queue(
        &self,
        predicate: impl FnMut(&QueueView) -> bool,
    ) -> StorageResult<QueueView> {
        let mut rx = self.queue.clone();
        let view = rx
            .wait_for(predicate)
            .await
            .map_err(|_| StorageError::Shutdown)?;
        Ok(view.clone())
    }

    /// Wait until nothing is active or waiting.
    pub async fn wait_until_idle(&self) -> StorageResult<QueueView> {
        self.wait_for_queue(QueueView::is_idle).await
    }
}

impl std::fmt::Debug for OrchestratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorHandle")
            .field("bootstrap", &*self.bootstrap.borrow())
            .field("queue", &*self.queue.borrow())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OrchestratorPort for OrchestratorHandle {
    async fn start(&self) -> StorageResult<BootstrapPhase> {
        self.request(Command::Start).await?
    }

    async fn retry(&self) -> StorageResult<BootstrapPhase> {
        self.request(Command::Retry).await?
    }

    async fn cancel(&self) -> StorageResult<BootstrapPhase> {
        self.request(Command::Cancel).await?
    }

    async fn pause_bootstrap(&self) -> StorageResult<()> {
        self.request(Command::PauseBootstrap).await?
    }

    async fn resume_bootstrap(&self) -> StorageResult<()> {
        self.request(Command::ResumeBootstrap).await?
    }

    async fn set_location(&self, lat: f64, lon: f64) -> StorageResult<Option<NodeId>> {
        self.request(|reply| Command::SetLocation { lat, lon, reply })
            .await
    }

    async fn offer_location_based_download(&self) -> StorageResult<Option<CatalogNode>> {
        self.request(Command::Offer).await
    }

    async fn accept_offer(&self) -> StorageResult<EnqueueOutcome> {
        self.request(Command::AcceptOffer).await?
    }

    async fn decline_offer(&self) -> StorageResult<()> {
        self.request(Command::DeclineOffer).await?
    }

    async fn enqueue_download(&self, id: &NodeId) -> StorageResult<EnqueueOutcome> {
        self.request(|reply| Command::Enqueue(id.clone(), reply))
            .await?
    }

    async fn pause_download(&self, id: &NodeId) -> StorageResult<bool> {
        self.request(|reply| Command::Pause(id.clone(), reply)).await?
    }

    async fn cancel_download(&self, id: &NodeId) -> StorageResult<()> {
        self.request(|reply| Command::CancelDownload(id.clone(), reply))
            .await?
    }

    async fn retry_download(&self, id: &NodeId) -> StorageResult<usize> {
        self.request(|reply| Command::RetryDownload(id.clone(), reply))
            .await?
    }

    async fn delete_local(&self, id: &NodeId) -> StorageResult<()> {
        self.request(|reply| Command::DeleteLocal(id.clone(), reply))
            .await?
    }

    async fn update_node(&self, id: &NodeId) -> StorageResult<EnqueueOutcome> {
        self.request(|reply| Command::Update(id.clone(), reply))
            .await?
    }

    async fn mark_out_of_date(&self, id: &NodeId) -> StorageResult<usize> {
        self.request(|reply| Command::MarkOutOfDate(id.clone(), reply))
            .await?
    }

    async fn outdated_nodes(&self) -> StorageResult<Vec<NodeId>> {
        self.request(Command::OutdatedNodes).await
    }

    async fn storage_reconnected(&self) -> StorageResult<Option<NodeId>> {
        self.request(Command::Reconnected).await
    }

    async fn restore_queue(&self) -> StorageResult<usize> {
        self.request(Command::RestoreQueue).await
    }

    async fn overall_progress(&self, ids: &[NodeId]) -> StorageResult<(u64, u64)> {
        let ids = ids.to_vec();
        self.request(|reply| Command::OverallProgress(ids, reply))
            .await
    }

    fn status_of(&self, id: &NodeId) -> NodeStatus {
        self.store.status_of(id)
    }

    fn subscribe(
        &self,
        callback: Box<dyn Fn(&StorageEvent) + Send + Sync>,
    ) -> SubscriptionHandle {
        self.events.subscribe(callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedEngine, fixture_with, id};
    use mapfetch_core::NoopRepository;
    use std::time::Duration;

    async fn spawn() -> (OrchestratorHandle, Arc<ScriptedEngine>) {
        let engine = Arc::new(ScriptedEngine::new());
        let orch = fixture_with(Arc::clone(&engine), Arc::new(NoopRepository));
        (OrchestratorService::spawn(orch), engine)
    }

    #[tokio::test]
    async fn test_bootstrap_through_actor() {
        let (handle, engine) = spawn().await;
        engine.script_probe(Ok(300));
        engine.script_chunks([
            BootstrapChunk::transferred(100),
            BootstrapChunk::transferred(200),
            BootstrapChunk::done(),
        ]);

        handle.start().await.unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), handle.wait_for_bootstrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.phase, BootstrapPhase::Complete);
        assert_eq!(status.downloaded, 300);
        assert!(matches!(handle.start().await, Err(StorageError::InvalidPhase { .. })));
    }

    #[tokio::test]
    async fn test_engine_reports_flow_through_actor() {
        let (handle, engine) = spawn().await;

        let outcome = handle.enqueue_download(&id("JP")).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::Queued { position: 1 });
        assert_eq!(handle.queue().active, Some(id("JP")));

        let sink = engine.last_sink().unwrap();
        sink.finished(&id("JP"), ErrorCode::Success);
        sink.index_built(&id("JP"), ErrorCode::Success);

        let view = tokio::time::timeout(Duration::from_secs(5), handle.wait_until_idle())
            .await
            .unwrap()
            .unwrap();
        assert!(view.is_idle());
        assert_eq!(handle.status_of(&id("JP")), NodeStatus::OnDisk);
    }

    #[tokio::test]
    async fn test_errors_cross_the_channel() {
        let (handle, _engine) = spawn().await;
        assert!(matches!(
            handle.enqueue_download(&id("XX")).await,
            Err(StorageError::UnknownNode { .. })
        ));
        assert!(matches!(handle.accept_offer().await, Err(StorageError::NoOffer)));
    }

    #[tokio::test]
    async fn test_subscription_through_port() {
        let (handle, _engine) = spawn().await;
        let port: &dyn OrchestratorPort = &handle;
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = port.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.kind())));

        port.enqueue_download(&id("FR")).await.unwrap();
        assert!(seen.lock().unwrap().contains(&"status_changed"));
        assert!(port.unsubscribe(sub));
    }
}
