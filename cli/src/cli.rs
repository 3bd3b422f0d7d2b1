//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Find and collect email addresses of a target audience.
#[derive(Debug, Parser)]
#[command(name = "prospect", version, about)]
pub struct Cli {
    /// Path to config.toml (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank sources for an audience and scrape them into a list
    Scrape(ScrapeArgs),

    /// Show how many scraped subscribers a list holds
    Status {
        /// Email list identifier
        #[arg(long)]
        list: String,
    },

    /// Manage email lists
    Lists {
        #[command(subcommand)]
        action: Option<ListsAction>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
    /// Email list to store subscribers in
    #[arg(long)]
    pub list: String,

    /// Who the product is for, in free text
    #[arg(long)]
    pub audience: String,

    /// What is being offered
    #[arg(long)]
    pub product: String,

    /// Stop once this many new emails are stored
    #[arg(long, value_name = "N")]
    pub min_emails: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum ListsAction {
    /// Show all lists (default)
    List,

    /// Create a new list
    Create {
        /// Display name
        name: String,

        /// Identifier (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
}
