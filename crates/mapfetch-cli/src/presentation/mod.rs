//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: no orchestration decisions.

pub mod progress;
pub mod tables;

pub use progress::{ProgressPrinter, format_plain_line, percent};
pub use tables::{print_separator, render_tree, status_label};
