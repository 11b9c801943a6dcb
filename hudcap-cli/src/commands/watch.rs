//! Watch command - follow device events

use anyhow::Result;
use clap::Args;
use hudcap_core::types::DeviceEvent;
use hudcap_core::DeviceManager;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Arguments for the watch command
#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between discovery passes (overrides the config file)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

/// Print device events until Ctrl+C
pub async fn watch(args: WatchArgs) -> Result<()> {
    let mut config = super::load_config()?;
    if let Some(secs) = args.interval {
        config.discovery_interval = Duration::from_secs(secs.max(1));
    }
    // Only watching; nothing is opened
    config.device = None;

    let (backend, enumerator) = super::devices();
    let manager = DeviceManager::new(config.shared(), backend, enumerator)?;
    let mut events = manager.subscribe();

    if !args.json {
        println!("hudcap - Watching for devices (Ctrl+C to stop)\n");
        let (indices, names) = manager.sources();
        for (index, name) in indices.iter().zip(&names) {
            println!("  present     {:<4} {}", index, name);
        }
    }

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, args.json)?,
                Err(RecvError::Lagged(n)) => warn!("Missed {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

fn print_event(event: &DeviceEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        DeviceEvent::Discovered(source) => {
            println!("  discovered  {:<4} {}", source.index, source.name)
        }
        DeviceEvent::Opened(source) => {
            println!("  opened      {:<4} {}", source.index, source.name)
        }
        DeviceEvent::Closed(source) => {
            println!("  closed      {:<4} {}", source.index, source.name)
        }
        DeviceEvent::CaptureFailed { source, reason } => {
            println!("  failed      {:<4} {} ({})", source.index, source.name, reason)
        }
        DeviceEvent::StopTimedOut(source) => {
            println!("  stuck       {:<4} {}", source.index, source.name)
        }
    }
    Ok(())
}
