pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::tips::Window;

#[derive(Parser)]
#[command(name = "feedtips")]
#[command(about = "A favoritable item list with contextual tips", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedtips/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Keep everything in memory for this run
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new item stamped with the current time
    Add,
    /// Delete items by list position
    Delete {
        /// Zero-based positions as shown by `list`
        #[arg(required = true)]
        positions: Vec<usize>,
    },
    /// Delete every item
    Clear,
    /// Toggle the favorite flag of an item
    Favorite {
        /// Zero-based position as shown by `list`
        position: usize,
    },
    /// List items
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show tips that should be displayed now
    Tips {
        /// Include tips that are not displayable, with their state
        #[arg(long)]
        all: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Record an occurrence of an event
    Donate {
        /// Event id, e.g. itemAdded
        event: String,
    },
    /// Show donation counts of the feed events
    Events {
        /// Also count donations inside a trailing window, e.g. 30m, 6h, 7d, 2w
        #[arg(long)]
        within: Option<Window>,
    },
    /// Close a tip so it no longer appears
    Dismiss {
        tip: String,
    },
    /// Run a tip's action button
    Action {
        tip: String,
        action: String,
    },
    /// Make tips appear again
    ResetTips {
        /// Only this tip; without it, all tips and event donations are reset
        tip: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_window_parsed() {
        let cli = Cli::try_parse_from(["feedtips", "events", "--within", "7d"]).unwrap();
        match cli.command {
            Commands::Events { within } => assert_eq!(within, Some(Window::days(7))),
            _ => panic!("expected events command"),
        }

        assert!(Cli::try_parse_from(["feedtips", "events", "--within", "soon"]).is_err());
    }
}
