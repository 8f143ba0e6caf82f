//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use netreason_common::{ConfigError, NetReasonConfig};
use std::path::PathBuf;

/// NetReason CLI
#[derive(Parser, Debug)]
#[command(name = "netreasonctl")]
#[command(about = "NetReason - web-augmented reasoning on a local model", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (replaces the user and system config files)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model name (overrides config and $NETREASON_MODEL)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Ollama base URL (overrides config and $NETREASON_OLLAMA_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand (if not provided, starts the chat REPL)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Interactive chat
    Chat,

    /// Answer one query and exit
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the reasoning chain after the answer
        #[arg(long)]
        explain: bool,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }

    /// File/env configuration with the command-line overrides on top
    pub fn load_config(&self) -> Result<NetReasonConfig, ConfigError> {
        let mut config = NetReasonConfig::load(self.config.as_deref())?;
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(url) = &self.url {
            config.model.base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
