//! hudcap CLI
//!
//! Capture-device lifecycle manager for game overlays.
//!
//! # Usage
//!
//! ```bash
//! # List connected capture devices
//! hudcap list-sources
//!
//! # Grab one frame from device 0
//! hudcap capture 0 --output frame.png
//!
//! # Follow hot-plug events
//! hudcap watch
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// hudcap - capture-device lifecycle manager
#[derive(Parser)]
#[command(name = "hudcap")]
#[command(version)]
#[command(about = "Discover capture devices and grab frames from them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected capture devices
    #[command(alias = "ls")]
    ListSources(commands::ListArgs),

    /// List capture backends
    ListBackends,

    /// Open a device, save one frame and close it
    Capture(commands::CaptureArgs),

    /// Print device events until interrupted
    Watch(commands::WatchArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("hudcap={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::ListSources(args) => commands::list_sources(args).await?,
        Commands::ListBackends => commands::list_backends().await?,
        Commands::Capture(args) => commands::capture(args).await?,
        Commands::Watch(args) => commands::watch(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
