//! Config command - manage the configuration file

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use hudcap_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective configuration
    Show,

    /// Generate a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            let state = if path.exists() { "exists" } else { "does not exist" };
            println!("{} ({})", path.display(), state);
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            let file = ConfigFile::load_from(path.clone())?;
            let runtime = file.to_capture_config().context("Invalid configuration")?;

            if path.exists() {
                println!("Configuration file: {}\n", path.display());
            } else {
                println!("No configuration file, using defaults\n");
            }
            let device = runtime
                .device
                .map_or_else(|| "none".to_string(), |i| i.to_string());
            let backend = match runtime.backend.as_str() {
                "" => "default",
                name => name,
            };
            println!("device          {}", device);
            println!("backend         {}", backend);
            println!("resolution      {}", runtime.main_resolution);
            println!(
                "discovery       every {:?}, {} slots",
                runtime.discovery_interval, runtime.max_sources
            );
            println!("stop timeout    {:?}", runtime.stop_timeout);
            println!("poll interval   {:?}", runtime.poll_interval);
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();
            if ConfigFile::init(force).context("Failed to write config file")? {
                println!("Created configuration file: {}", path.display());
            } else {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite.");
            }
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
