//! Out-of-date handling: `mark-outdated`, `outdated` and `update`.
//!
//! Leaves flagged out of date stay usable and are only re-downloaded when
//! the user asks for it with `update`.

use mapfetch_core::NodeId;
use mapfetch_download::OrchestratorPort;

use super::download::describe_outcome;
use super::follow::QueueFollower;
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn mark(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let id = NodeId::new(id);
    let flagged = ctx.orchestrator.mark_out_of_date(&id).await?;
    println!("{id}: {flagged} region(s) flagged out of date");
    Ok(())
}

pub async fn list(ctx: &CliContext) -> Result<(), CliError> {
    let outdated = ctx.orchestrator.outdated_nodes().await?;
    if outdated.is_empty() {
        println!("Everything is up to date");
        return Ok(());
    }
    for id in outdated {
        let size = ctx.catalog.remote_size(&id);
        println!("{id:<36} {:>10}", indicatif::HumanBytes(size).to_string());
    }
    Ok(())
}

pub async fn update(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let id = NodeId::new(id);
    let follower = QueueFollower::attach(ctx);
    let outcome = ctx.orchestrator.update_node(&id).await?;
    println!("{}", describe_outcome(&id, &outcome));
    follower.run(ctx).await?.into_result().map(|_| ())
}
