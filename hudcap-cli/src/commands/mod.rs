//! CLI command implementations

mod capture;
mod config;
mod list;
mod watch;

pub use capture::{capture, CaptureArgs};
pub use config::{config, ConfigArgs};
pub use list::{list_backends, list_sources, ListArgs};
pub use watch::{watch, WatchArgs};

use anyhow::{Context, Result};
use hudcap_core::{CaptureBackend, CaptureConfig, ConfigFile, DeviceEnumerator};
use std::sync::Arc;

/// Runtime settings from the user's config file
fn load_config() -> Result<CaptureConfig> {
    ConfigFile::load_or_default()
        .to_capture_config()
        .context("Invalid configuration")
}

/// Platform capture backend
#[cfg(feature = "nokhwa")]
fn devices() -> (Arc<dyn CaptureBackend>, Arc<dyn DeviceEnumerator>) {
    let backend = hudcap_core::backend::webcam::NokhwaBackend::new();
    (Arc::new(backend), Arc::new(backend))
}

/// Synthetic devices when built without webcam support
#[cfg(not(feature = "nokhwa"))]
fn devices() -> (Arc<dyn CaptureBackend>, Arc<dyn DeviceEnumerator>) {
    let backend = hudcap_core::backend::pattern::TestPatternBackend::default();
    (Arc::new(backend.clone()), Arc::new(backend))
}
