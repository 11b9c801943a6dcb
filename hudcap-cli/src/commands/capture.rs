//! Capture command - open a device and save a frame

use anyhow::{anyhow, Context, Result};
use clap::Args;
use hudcap_core::types::{Rect, Resolution};
use hudcap_core::{ConfigFile, DeviceManager};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Arguments for the capture command
#[derive(Args)]
pub struct CaptureArgs {
    /// Device index (defaults to the configured device)
    index: Option<u32>,

    /// Backend name as shown by `hudcap list-backends`
    #[arg(short, long)]
    backend: Option<String>,

    /// Required device resolution, e.g. 1280x720
    #[arg(short, long)]
    size: Option<Resolution>,

    /// Region to save as x,y,width,height (default: whole frame)
    #[arg(short, long)]
    rect: Option<Rect>,

    /// Output PNG path
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,

    /// Seconds to wait for the first frame
    #[arg(long, default_value = "5")]
    wait: u64,

    /// Store the device and backend as the configured selection
    #[arg(long)]
    remember: bool,
}

/// Open a device, save one frame and close it
pub async fn capture(args: CaptureArgs) -> Result<()> {
    let mut config = super::load_config()?;
    if let Some(size) = args.size {
        config.main_resolution = size;
    }
    if let Some(backend) = &args.backend {
        config.backend = backend.clone();
    }
    let index = args.index.or(config.device).ok_or_else(|| {
        anyhow!("No device selected. Pass an index or set one in the config file")
    })?;
    config.device = Some(index);

    let (backend, enumerator) = super::devices();
    let mut manager = DeviceManager::new(config.clone().shared(), backend, enumerator)?;
    manager.backends_ready().await;

    let backend_id = manager.backend_id(&config.backend).ok_or_else(|| {
        anyhow!(
            "Unknown backend '{}'. Available: {}",
            config.backend,
            manager.backends().join(", ")
        )
    })?;

    println!("hudcap - Capturing from {}\n", manager.name(Some(index)));
    manager
        .open(index, backend_id)
        .await
        .context("Failed to open device")?;

    let result = save_frame(&manager, &args).await;

    if let Err(e) = manager.close().await {
        warn!("Close did not complete cleanly: {}", e);
    }
    result?;

    if args.remember {
        let mut file = ConfigFile::load_or_default();
        file.update_from(&config);
        file.save().context("Failed to save device selection")?;
        println!("Saved device selection to {}", ConfigFile::default_path().display());
    }
    Ok(())
}

async fn save_frame(manager: &DeviceManager, args: &CaptureArgs) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(args.wait);
    let frames = manager.frames();

    while frames.is_empty() {
        if !manager.capture_alive() {
            return Err(anyhow!("{} stopped delivering frames", manager.active_name()));
        }
        if Instant::now() >= deadline {
            return Err(anyhow!(
                "No frame from {} within {}s",
                manager.active_name(),
                args.wait
            ));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let image = match args.rect {
        Some(rect) => manager.capture_rect(rect)?,
        None => manager.capture()?,
    }
    .ok_or_else(|| anyhow!("Frame buffer was cleared"))?;

    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Captured {} frames", manager.frames_captured());
    println!(
        "Saved {}x{} image to {}",
        image.width(),
        image.height(),
        args.output.display()
    );
    Ok(())
}
