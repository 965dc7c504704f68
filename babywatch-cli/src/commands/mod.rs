mod config_cmd;
mod replay;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use replay::{format_event, OutputFormat, ReplayCommand};

#[derive(Parser)]
#[command(name = "babywatch")]
#[command(about = "Infant monitor event detection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = "BABYWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded landmark stream and optional audio through a session
    Replay(ReplayCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigSubcommands),
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show effective configuration
    Show,

    /// Write the default configuration
    Init {
        /// Destination, defaults to --config or the user config directory
        path: Option<PathBuf>,

        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        let config_path = self.config.as_deref();
        match self.command {
            Commands::Replay(cmd) => cmd.execute(config_path).await,
            Commands::Config(subcmd) => match subcmd {
                ConfigSubcommands::Show => config_cmd::show_config(config_path).await,
                ConfigSubcommands::Init { path, force } => {
                    config_cmd::init_config(path.as_deref().or(config_path), force).await
                }
            },
        }
    }
}
