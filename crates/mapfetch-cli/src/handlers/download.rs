//! `download` - queue regions and follow them to completion.

use mapfetch_core::NodeId;
use mapfetch_download::{EnqueueOutcome, OrchestratorPort};

use super::follow::QueueFollower;
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, ids: &[String], resume: bool) -> Result<(), CliError> {
    let ids: Vec<NodeId> = ids.iter().map(NodeId::new).collect();
    if let Some(unknown) = ids.iter().find(|id| !ctx.catalog.contains(id)) {
        return Err(CliError::Arguments(format!("'{unknown}' is not a known region")));
    }

    let follower = QueueFollower::attach(ctx);

    if resume {
        let restored = ctx.orchestrator.restore_queue().await?;
        if restored > 0 {
            println!("Resumed {restored} queued download(s)");
        }
    }
    for id in &ids {
        let outcome = ctx.orchestrator.enqueue_download(id).await?;
        println!("{}", describe_outcome(id, &outcome));
    }

    let summary = follower.run(ctx).await?;

    let (done, total) = ctx.orchestrator.overall_progress(&ids).await?;
    println!(
        "{} downloaded, {} of {} on disk",
        summary.completed.len(),
        indicatif::HumanBytes(done),
        indicatif::HumanBytes(total)
    );
    summary.into_result().map(|_| ())
}

/// One line describing what enqueueing did.
pub fn describe_outcome(id: &NodeId, outcome: &EnqueueOutcome) -> String {
    match outcome {
        EnqueueOutcome::Queued { position } => format!("{id}: queued at position {position}"),
        EnqueueOutcome::AlreadyQueued { position } => {
            format!("{id}: already queued at position {position}")
        }
        EnqueueOutcome::AlreadyDownloading => format!("{id}: already downloading"),
        EnqueueOutcome::AlreadyOnDisk => format!("{id}: already on disk"),
        EnqueueOutcome::Group { queued: 0 } => format!("{id}: nothing to download"),
        EnqueueOutcome::Group { queued } => format!("{id}: queued {queued} region(s)"),
    }
}
