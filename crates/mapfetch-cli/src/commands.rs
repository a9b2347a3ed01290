//! Subcommand definitions.

use clap::Subcommand;

/// Subcommands of `mapfetch`.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the region tree with the status of every node
    Status {
        /// Only show this node and its subtree
        id: Option<String>,

        /// Print node states as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the mandatory bootstrap resources
    Bootstrap {
        /// Retry this many times after a failure before giving up
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Queue regions (leaves or groups) and download them in order
    Download {
        /// Node ids to download
        #[arg(required = true)]
        ids: Vec<String>,

        /// Re-queue what was still waiting when the last run stopped
        #[arg(long)]
        resume: bool,
    },

    /// Find the region at a position and offer to download it
    Locate {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Download the offered region
        #[arg(long, conflicts_with = "decline")]
        accept: bool,

        /// Decline the offer
        #[arg(long)]
        decline: bool,
    },

    /// Remove the local files of a node (or every leaf under a group)
    Delete {
        /// Node id to delete
        id: String,
    },

    /// Flag on-disk leaves as having a newer published version
    MarkOutdated {
        /// Node id to flag
        id: String,
    },

    /// List nodes whose local version is out of date
    Outdated,

    /// Re-download out-of-date leaves under a node
    Update {
        /// Node id to update
        id: String,
    },
}
