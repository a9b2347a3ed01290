//! `status` - print the region tree and the queue.

use mapfetch_core::NodeId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_separator, render_tree};

pub async fn execute(ctx: &CliContext, id: Option<&str>, json: bool) -> Result<(), CliError> {
    let root = id.map_or_else(|| ctx.catalog.root().id.clone(), NodeId::new);
    if !ctx.catalog.contains(&root) {
        return Err(CliError::Arguments(format!("'{root}' is not a known region")));
    }

    if json {
        let states: Vec<_> = subtree(ctx, &root)
            .iter()
            .filter_map(|node| ctx.orchestrator.state_of(node))
            .collect();
        let out = serde_json::to_string_pretty(&states)
            .map_err(|e| CliError::Io(format!("Failed to encode status: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let lines = render_tree(&ctx.catalog, &root, |node| ctx.orchestrator.state_of(node));
    println!("{:<36} {:>10}  STATUS", "REGION", "SIZE");
    print_separator(60);
    for line in lines {
        println!("{line}");
    }

    let queue = ctx.orchestrator.queue();
    if !queue.is_idle() {
        print_separator(60);
        let waiting: Vec<String> = queue.waiting.iter().map(ToString::to_string).collect();
        println!(
            "Active: {}  Waiting: {}",
            queue.active.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
            if waiting.is_empty() { "-".to_string() } else { waiting.join(", ") }
        );
    }
    Ok(())
}

/// `root` and everything below it, in catalog order.
fn subtree(ctx: &CliContext, root: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(id) = stack.pop() {
        for child in ctx.catalog.children(&id).into_iter().rev() {
            stack.push(child.id.clone());
        }
        out.push(id);
    }
    out
}
