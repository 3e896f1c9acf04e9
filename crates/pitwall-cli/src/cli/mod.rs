//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pitwall_core::config::{self, Config};

mod commands;

#[derive(Parser)]
#[command(name = "pitwall")]
#[command(version = "0.1")]
#[command(about = "Live timing relay bot for racing servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, env = "PITWALL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the Telegram bot (long-polling)
    Bot,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a commented default config file
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Bot => {
            let config = match cli.config.as_deref() {
                Some(path) => Config::load_from(path),
                None => Config::load(),
            }
            .context("load config")?;
            commands::bot::run(config).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                match cli.config {
                    Some(path) => println!("{}", path.display()),
                    None => commands::config::path(),
                }
                Ok(())
            }
            ConfigCommands::Init => match cli.config {
                Some(path) => {
                    config::Config::init(&path)
                        .with_context(|| format!("init config at {}", path.display()))?;
                    println!("Created config at {}", path.display());
                    Ok(())
                }
                None => commands::config::init(),
            },
        },
    }
}
