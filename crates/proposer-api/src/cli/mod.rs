//! CLI command definitions for the `proposer` binary.

pub mod chat;
pub mod draft;
pub mod engineer;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Build client proposals through a guided interview.
#[derive(Parser)]
#[command(name = "proposer", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the chosen verbosity; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,proposer_core=debug,proposer_infra=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a proposal interview in the terminal.
    Chat {
        /// Resume the saved draft of this conversation.
        #[arg(long)]
        resume: Option<String>,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// List engineers in the registry.
    #[command(alias = "ls")]
    Engineers,

    /// List saved proposal drafts.
    Drafts,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Coarse "time ago" rendering for listings.
pub(crate) fn format_relative_time(at: &DateTime<Utc>) -> String {
    let secs = (Utc::now() - *at).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
