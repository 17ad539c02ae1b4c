//! Sitewright CLI - static site asset pipeline with live reload.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sitewright")]
#[command(about = "Static site asset pipeline with a live-reload dev server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to sitewright.toml, relative to the project root
    #[arg(short, long, default_value = "sitewright.toml", global = true)]
    config: PathBuf,

    /// Project root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build into dev/, serve it and rebuild on change (default)
    Dev {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build the production site into build/
    Build,

    /// Remove an output tree
    Clean {
        /// Remove build/ instead of dev/
        #[arg(long)]
        production: bool,
    },

    /// Write a starter project
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config_path = config::config_path(&cli.root, &cli.config);

    match cli.command {
        Some(Commands::Init { yes }) => {
            commands::init::run(&cli.root, &config_path, yes).await?;
        }
        Some(Commands::Build) => {
            let config = config::load(&config_path)?;
            commands::build::run(&cli.root, config).await?;
        }
        Some(Commands::Clean { production }) => {
            let config = config::load(&config_path)?;
            commands::clean::run(&cli.root, config, production).await?;
        }
        Some(Commands::Dev {
            port,
            host,
            no_open,
        }) => {
            let config = config::load(&config_path)?;
            let options = commands::dev::DevOptions {
                port,
                host,
                open: !no_open,
            };
            commands::dev::run(&cli.root, config, options).await?;
        }
        None => {
            let config = config::load(&config_path)?;
            commands::dev::run(&cli.root, config, commands::dev::DevOptions::default()).await?;
        }
    }

    Ok(())
}
