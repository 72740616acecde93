//! CLI definitions for the scrubber.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scrubber_config::scrubber_home;

/// Activity scrubber CLI.
#[derive(Parser)]
#[command(name = "scrubber")]
#[command(about = "Clears activity-log entries through a Chrome tab")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.scrubber/config.toml)
    #[arg(short, long, global = true, env = "SCRUBBER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub(crate) fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| scrubber_home().join("config.toml"))
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum Commands {
    /// Attach to Chrome, serve the control API and clean (default)
    Run {
        /// Wait for a start command instead of cleaning right away
        #[arg(long)]
        no_auto_start: bool,

        /// Control API host (overrides [server].host)
        #[arg(long)]
        host: Option<String>,

        /// Control API port (overrides [server].port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the persisted run state
    Status {
        /// Print the raw stored JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear the persisted run state
    Reset,

    /// Validate the configuration file
    CheckConfig,
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run {
            no_auto_start: false,
            host: None,
            port: None,
        }
    }
}
