//! List sources and backends commands

use anyhow::Result;
use clap::Args;
use hudcap_core::backend::BackendRegistry;
use hudcap_core::capture::probe_sources;

/// Arguments for the list-sources command
#[derive(Args)]
pub struct ListArgs {
    /// Print the list as JSON
    #[arg(long)]
    json: bool,
}

/// List connected capture devices
pub async fn list_sources(args: ListArgs) -> Result<()> {
    let config = super::load_config()?;
    let (_, enumerator) = super::devices();

    let sources = tokio::task::spawn_blocking(move || {
        probe_sources(enumerator.as_ref(), config.max_sources)
    })
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("hudcap - Capture Devices\n");

    if sources.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("{:<8} {}", "Index", "Name");
    println!("{}", "-".repeat(40));
    for source in &sources {
        println!("{:<8} {}", source.index, truncate(&source.name, 32));
    }

    Ok(())
}

/// List capture backends, default first
pub async fn list_backends() -> Result<()> {
    let config = super::load_config()?;
    let (backend, _) = super::devices();

    let (registry, build) = BackendRegistry::spawn(backend, config.backend_probe_limit);
    build.await?;

    println!("hudcap - Capture Backends\n");
    for (i, name) in registry.backends().iter().enumerate() {
        let id = registry.backend_id(name).unwrap_or_default();
        let marker = if i == 0 { " (default)" } else { "" };
        println!("{:<8} {}{}", id, name, marker);
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{}...", kept)
    }
}
