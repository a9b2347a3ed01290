//! `bootstrap` - fetch the mandatory resources, retrying on failure.

use mapfetch_core::{BootstrapPhase, StorageEvent};
use mapfetch_download::{BootstrapStatus, OrchestratorPort};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::ProgressPrinter;

const LABEL: &str = "Base maps";

pub async fn execute(ctx: &CliContext, retries: u32) -> Result<(), CliError> {
    let status = ensure_bootstrap(ctx, retries).await?;
    println!(
        "Base maps ready ({} transferred)",
        indicatif::HumanBytes(status.downloaded)
    );
    Ok(())
}

/// Run the bootstrap to completion, retrying up to `retries` times.
///
/// Gives up with [`OrchestratorPort::cancel`] once the retries are spent.
pub async fn ensure_bootstrap(ctx: &CliContext, retries: u32) -> Result<BootstrapStatus, CliError> {
    let current = ctx.orchestrator.bootstrap_status();
    if current.phase == BootstrapPhase::Complete {
        return Ok(current);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = ctx.orchestrator.subscribe(Box::new(move |event| {
        if let StorageEvent::BootstrapProgress { downloaded, total } = event {
            let _ = tx.send((*downloaded, *total));
        }
    }));

    let mut printer = ProgressPrinter::new();
    let mut attempt = 0u32;
    let result = loop {
        let started = if attempt == 0 {
            ctx.orchestrator.start().await
        } else {
            ctx.orchestrator.retry().await
        };
        if let Err(e) = started {
            break Err(CliError::from(e));
        }

        let finished = ctx.orchestrator.wait_for_bootstrap();
        tokio::pin!(finished);
        let status = loop {
            tokio::select! {
                Some((downloaded, total)) = rx.recv() => printer.update(LABEL, downloaded, total),
                status = &mut finished => break status,
            }
        };

        match status {
            Ok(status) if status.phase == BootstrapPhase::Failed && attempt < retries => {
                attempt += 1;
                let reason = status.error.map_or("unknown error", |code| code.user_message());
                printer.println(&format!("Base maps failed ({reason}), retrying ({attempt}/{retries})"));
            }
            Ok(status) if status.phase == BootstrapPhase::Failed => {
                let reason = status
                    .error
                    .map_or_else(|| "unknown error".to_string(), |code| code.user_message().to_string());
                if let Err(e) = ctx.orchestrator.cancel().await {
                    tracing::warn!(error = %e, "Failed to cancel bootstrap");
                }
                break Err(CliError::Download(format!("base maps: {reason}")));
            }
            Ok(status) => break Ok(status),
            Err(e) => break Err(CliError::from(e)),
        }
    };

    printer.finish();
    ctx.orchestrator.unsubscribe(subscription);
    result
}
