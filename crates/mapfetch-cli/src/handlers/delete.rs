//! `delete` - remove local map files.

use mapfetch_core::NodeId;
use mapfetch_download::OrchestratorPort;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let id = NodeId::new(id);
    ctx.orchestrator.delete_local(&id).await?;
    println!("{id}: {}", ctx.orchestrator.status_of(&id));
    Ok(())
}
