//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// newsflow: ingest news, moderate and rewrite with AI, illustrate, and
/// distribute to social platforms
#[derive(Parser, Debug)]
#[command(name = "newsflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion and comment-sync workers
    Run(RunArgs),

    /// One-shot ingestion cycle
    Ingest(IngestArgs),

    /// Approve a held item and publish it
    Approve(ApproveArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run with stub publishers (nothing reaches the platforms)
    #[arg(long)]
    pub dry_run: bool,

    /// Process one ingestion cycle and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Only ingest from the source with this ID (e.g. "telegram:acme_news")
    #[arg(long)]
    pub source: Option<String>,

    /// Only keep items published at or after this RFC 3339 timestamp
    #[arg(long)]
    pub from: Option<String>,

    /// Only keep items published at or before this RFC 3339 timestamp
    #[arg(long)]
    pub to: Option<String>,

    /// Run with stub publishers (nothing reaches the platforms)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Content item ID to approve
    pub item_id: String,

    /// Run with stub publishers (nothing reaches the platforms)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the example configuration to stdout
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Check specific component (config, openai, state, sources, social, moderation)
    #[arg(long)]
    pub check: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
