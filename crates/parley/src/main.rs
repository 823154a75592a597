// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - long-term conversational memory for LLM agents.
//!
//! This is the binary entry point. Each subcommand opens the configured
//! knowledge store and drives one operation of the context-memory pipeline.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod shutdown;
mod transcript;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parley - long-term conversational memory for LLM agents.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Print the context block that would be injected into the system prompt.
    Context,
    /// Summarize a finished conversation from a JSON transcript.
    Summarize {
        /// Conversation identifier.
        #[arg(long)]
        conversation: String,
        /// JSON file holding the conversation messages.
        #[arg(long)]
        transcript: PathBuf,
    },
    /// Merge new summaries into the knowledge profile.
    Compact {
        /// Run even when compaction is not due.
        #[arg(long)]
        force: bool,
    },
    /// Show memory statistics and current settings.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show or change context memory settings.
    Settings {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// Token budget for the context block.
        #[arg(long)]
        max_tokens: Option<u32>,
        /// How many days of meetings the context block covers.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete the stored summary of one conversation.
    Forget {
        #[arg(long)]
        conversation: String,
    },
    /// Delete all summaries and entities and reset the profile.
    Wipe {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Run compaction on startup and then periodically until Ctrl+C.
    Watch {
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = commands::run(cli.command, &config).await {
        eprintln!("parley: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
