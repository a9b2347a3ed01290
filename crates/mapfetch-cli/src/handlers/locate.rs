//! `locate` - offer the region at a position once base maps are ready.

use mapfetch_core::CatalogNode;
use mapfetch_download::OrchestratorPort;

use super::bootstrap::ensure_bootstrap;
use super::download::describe_outcome;
use super::follow::QueueFollower;
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(
    ctx: &CliContext,
    lat: f64,
    lon: f64,
    accept: bool,
    decline: bool,
) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CliError::Arguments(format!("({lat}, {lon}) is not a valid position")));
    }

    ensure_bootstrap(ctx, 0).await?;

    let Some(found) = ctx.orchestrator.set_location(lat, lon).await? else {
        println!("No region covers ({lat}, {lon})");
        return Ok(());
    };
    tracing::debug!(id = %found, lat, lon, "Position located");

    let Some(offer) = ctx.orchestrator.offer_location_based_download().await? else {
        println!("{found}: {}", ctx.orchestrator.status_of(&found));
        return Ok(());
    };
    println!("{}", describe_offer(&offer));

    if decline {
        ctx.orchestrator.decline_offer().await?;
        println!("Offer declined");
        return Ok(());
    }
    if !accept {
        println!("Run again with --accept to download it");
        return Ok(());
    }

    let follower = QueueFollower::attach(ctx);
    let outcome = ctx.orchestrator.accept_offer().await?;
    println!("{}", describe_outcome(&offer.id, &outcome));
    follower.run(ctx).await?.into_result().map(|_| ())
}

/// Offer line for a located region.
pub fn describe_offer(node: &CatalogNode) -> String {
    let size = indicatif::HumanBytes(node.remote_size_bytes);
    if node.name.is_empty() || node.name == node.id.as_str() {
        format!("Offer: {} ({size})", node.id)
    } else {
        format!("Offer: {} [{}] ({size})", node.name, node.id)
    }
}
