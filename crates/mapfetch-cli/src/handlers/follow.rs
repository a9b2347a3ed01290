//! Follow the download queue until it drains.
//!
//! Shared by every handler that queues downloads. The follower subscribes
//! before anything is queued so no event is missed, renders progress, and
//! on Ctrl-C cancels whatever is still active or waiting.

use mapfetch_core::{ErrorCode, NodeId, NodeStatus, StorageEvent, SubscriptionHandle};
use mapfetch_download::{OrchestratorPort, QueueView};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::ProgressPrinter;

/// What happened to the leaves seen while following.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FollowSummary {
    pub completed: Vec<NodeId>,
    pub failed: Vec<(NodeId, ErrorCode)>,
}

impl FollowSummary {
    /// Fold one event into the summary. Returns a line worth printing.
    pub fn record(&mut self, event: &StorageEvent) -> Option<String> {
        match event {
            StorageEvent::StatusChanged {
                id,
                status: NodeStatus::OnDisk,
                ..
            } => {
                self.completed.push(id.clone());
                Some(format!("✓ {id}"))
            }
            StorageEvent::StatusChanged {
                id,
                status: NodeStatus::NotDownloaded | NodeStatus::DownloadFailed,
                error: Some(code),
            } => {
                self.failed.push((id.clone(), *code));
                Some(format!("✗ {id}: {}", code.user_message()))
            }
            StorageEvent::TransfersSuspended { reason } => {
                Some(format!("Transfers suspended: {}", reason.user_message()))
            }
            _ => None,
        }
    }

    /// Error for a run that did not fully succeed.
    pub fn into_result(self) -> Result<Self, CliError> {
        if self.failed.is_empty() {
            return Ok(self);
        }
        let names: Vec<String> = self.failed.iter().map(|(id, _)| id.to_string()).collect();
        Err(CliError::Download(names.join(", ")))
    }
}

/// Renders queue progress from a subscription.
pub struct QueueFollower {
    events: mpsc::UnboundedReceiver<StorageEvent>,
    subscription: SubscriptionHandle,
    printer: ProgressPrinter,
    summary: FollowSummary,
}

impl QueueFollower {
    /// Subscribe to the orchestrator. Call before queueing anything.
    pub fn attach(ctx: &CliContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = ctx.orchestrator.subscribe(Box::new(move |event| {
            let _ = tx.send(event.clone());
        }));
        Self {
            events: rx,
            subscription,
            printer: ProgressPrinter::new(),
            summary: FollowSummary::default(),
        }
    }

    /// Render events until the queue drains, is suspended, or the user
    /// interrupts.
    pub async fn run(mut self, ctx: &CliContext) -> Result<FollowSummary, CliError> {
        let drained = ctx
            .orchestrator
            .wait_for_queue(|view| view.is_idle() || view.suspended.is_some());
        tokio::pin!(drained);
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let outcome = loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.render(ctx, &event),
                view = &mut drained => break view.map_err(CliError::from),
                _ = &mut interrupt => break Err(CliError::Interrupted),
            }
        };

        while let Ok(event) = self.events.try_recv() {
            self.render(ctx, &event);
        }
        self.printer.finish();
        ctx.orchestrator.unsubscribe(self.subscription);

        match outcome {
            Ok(QueueView {
                suspended: Some(code),
                waiting,
                ..
            }) => {
                tracing::warn!(%code, waiting = waiting.len(), "Queue suspended");
                Err(CliError::Download(code.user_message().to_string()))
            }
            Ok(_) => Ok(self.summary),
            Err(CliError::Interrupted) => {
                cancel_pending(ctx).await;
                Err(CliError::Interrupted)
            }
            Err(err) => Err(err),
        }
    }

    fn render(&mut self, ctx: &CliContext, event: &StorageEvent) {
        match event {
            StorageEvent::Progress { id, current, total } if ctx.catalog.is_leaf(id) => {
                self.printer.update(id.as_str(), *current, *total);
            }
            StorageEvent::StatusChanged { id, .. } if !ctx.catalog.is_leaf(id) => {}
            other => {
                if let Some(line) = self.summary.record(other) {
                    self.printer.println(&line);
                }
            }
        }
    }
}

/// Cancel the active transfer and everything waiting behind it.
async fn cancel_pending(ctx: &CliContext) {
    let view = ctx.orchestrator.queue();
    for id in view.active.iter().chain(view.waiting.iter()) {
        if let Err(e) = ctx.orchestrator.cancel_download(id).await {
            tracing::warn!(id = %id, error = %e, "Failed to cancel download");
        }
    }
    println!("Cancelled pending downloads");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_records_outcomes() {
        let mut summary = FollowSummary::default();
        assert!(
            summary
                .record(&StorageEvent::status("FR", NodeStatus::OnDisk))
                .is_some()
        );
        let failure = StorageEvent::StatusChanged {
            id: NodeId::new("DE"),
            status: NodeStatus::DownloadFailed,
            error: Some(ErrorCode::NotEnoughFreeSpace),
        };
        let line = summary.record(&failure).unwrap();
        assert!(line.starts_with("✗ DE"));

        assert_eq!(summary.completed, vec![NodeId::new("FR")]);
        assert_eq!(
            summary.failed,
            vec![(NodeId::new("DE"), ErrorCode::NotEnoughFreeSpace)]
        );
        assert!(matches!(summary.into_result(), Err(CliError::Download(msg)) if msg == "DE"));
    }

    #[test]
    fn test_user_cancel_is_not_a_failure() {
        let mut summary = FollowSummary::default();
        assert!(
            summary
                .record(&StorageEvent::status("FR", NodeStatus::NotDownloaded))
                .is_none()
        );
        assert!(summary.into_result().is_ok());
    }

    #[test]
    fn test_progress_is_not_recorded() {
        let mut summary = FollowSummary::default();
        let event = StorageEvent::Progress {
            id: NodeId::new("FR"),
            current: 1,
            total: 2,
        };
        assert!(summary.record(&event).is_none());
        assert_eq!(summary, FollowSummary::default());
    }
}
