//! Tree and table formatting for CLI output.

use indicatif::HumanBytes;
use mapfetch_core::{Catalog, NodeId, NodeState, NodeStatus};

use super::progress::percent;

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Short label for a status column.
pub const fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Unknown => "?",
        NodeStatus::NotDownloaded => "-",
        NodeStatus::InQueue => "queued",
        NodeStatus::Downloading => "downloading",
        NodeStatus::GeneratingIndex => "indexing",
        NodeStatus::OnDisk => "on disk",
        NodeStatus::OnDiskOutOfDate => "outdated",
        NodeStatus::DownloadFailed => "failed",
        NodeStatus::Partly => "partly",
    }
}

/// Render the subtree at `root` as indented lines, in catalog order.
///
/// `state` looks up the current state of a node; nodes it cannot find show
/// as unknown.
pub fn render_tree(
    catalog: &Catalog,
    root: &NodeId,
    state: impl Fn(&NodeId) -> Option<NodeState>,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = catalog.get(&id) else {
            continue;
        };
        let current = state(&id);
        let status = current.as_ref().map_or(NodeStatus::Unknown, |s| s.status);

        let mut detail = status_label(status).to_string();
        if let Some((done, total)) = current.as_ref().and_then(|s| s.progress) {
            detail = format!("{detail} {}%", percent(done, total));
        }
        if let Some(code) = current.as_ref().and_then(|s| s.error) {
            detail = format!("{detail} ({code})");
        }

        let label = format!("{}{}", "  ".repeat(depth), node.id);
        lines.push(format!(
            "{label:<36} {:>10}  {detail}",
            HumanBytes(node.remote_size_bytes).to_string()
        ));

        for child in node.children.iter().rev() {
            stack.push((child.clone(), depth + 1));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapfetch_core::{CatalogSpec, ErrorCode, NodeSpec};

    fn catalog() -> Catalog {
        Catalog::from_spec(CatalogSpec::new(vec![
            NodeSpec::group(
                "Europe",
                vec![NodeSpec::leaf("FR", 1024), NodeSpec::leaf("DE", 2048)],
            ),
            NodeSpec::leaf("JP", 512),
        ]))
        .unwrap()
    }

    fn state(id: &str, status: NodeStatus) -> NodeState {
        NodeState {
            id: NodeId::new(id),
            status,
            local_size: 0,
            remote_size: 0,
            error: None,
            progress: None,
        }
    }

    #[test]
    fn test_tree_is_in_catalog_order_and_indented() {
        let catalog = catalog();
        let lines = render_tree(&catalog, &NodeId::root(), |id| {
            Some(state(id.as_str(), NodeStatus::NotDownloaded))
        });
        let names: Vec<&str> = lines
            .iter()
            .map(|l| l.split_whitespace().next().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["Countries", "Europe", "FR", "DE", "JP"]);
        assert!(lines[2].starts_with("    FR"));
    }

    #[test]
    fn test_line_shows_progress_and_error() {
        let catalog = catalog();
        let lines = render_tree(&catalog, &NodeId::new("Europe"), |id| {
            let mut s = state(id.as_str(), NodeStatus::Partly);
            if id.as_str() == "FR" {
                s.status = NodeStatus::Downloading;
                s.progress = Some((256, 1024));
            }
            if id.as_str() == "DE" {
                s.status = NodeStatus::DownloadFailed;
                s.error = Some(ErrorCode::NotEnoughFreeSpace);
            }
            Some(s)
        });
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("downloading 25%"));
        assert!(lines[2].contains("failed ("));
    }

    #[test]
    fn test_unknown_root_renders_nothing() {
        let lines = render_tree(&catalog(), &NodeId::new("Atlantis"), |_| None);
        assert!(lines.is_empty());
    }
}
