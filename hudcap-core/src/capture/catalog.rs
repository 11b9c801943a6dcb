//! Source catalog and hot-plug discovery
//!
//! The catalog is a list of `(index, name)` pairs replaced wholesale by
//! discovery passes. Readers always load one complete list.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::DeviceEnumerator;
use crate::types::{DeviceEvent, SourceInfo};

/// Name shown for the "no device" selection
pub const DISABLED_NAME: &str = "Disabled";

/// Probe device slots `0..max_sources`, stopping at the first empty one
pub fn probe_sources(enumerator: &dyn DeviceEnumerator, max_sources: u32) -> Vec<SourceInfo> {
    let mut sources = Vec::new();
    for index in 0..max_sources {
        match enumerator.device_name(index) {
            Some(name) if !name.is_empty() => sources.push(SourceInfo::new(index, name)),
            _ => break,
        }
    }
    sources
}

/// Currently known capture devices
pub struct SourceCatalog {
    current: ArcSwap<Vec<SourceInfo>>,
    events: broadcast::Sender<DeviceEvent>,
}

impl SourceCatalog {
    /// Create a catalog holding `sources`
    pub fn new(sources: Vec<SourceInfo>, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            current: ArcSwap::from_pointee(sources),
            events,
        }
    }

    /// Create a catalog from an initial probe
    pub fn probe(
        enumerator: &dyn DeviceEnumerator,
        max_sources: u32,
        events: broadcast::Sender<DeviceEvent>,
    ) -> Self {
        let sources = probe_sources(enumerator, max_sources);
        info!("Found {} capture devices", sources.len());
        Self::new(sources, events)
    }

    /// The complete current list
    pub fn snapshot(&self) -> Arc<Vec<SourceInfo>> {
        self.current.load_full()
    }

    /// Indices and names from the same discovery pass
    pub fn sources(&self) -> (Vec<u32>, Vec<String>) {
        self.snapshot()
            .iter()
            .map(|s| (s.index, s.name.clone()))
            .unzip()
    }

    /// Display name for a device selection
    pub fn name(&self, index: Option<u32>) -> String {
        let Some(index) = index else {
            return DISABLED_NAME.to_string();
        };
        self.snapshot()
            .iter()
            .find(|s| s.index == index)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("Device: {}", index))
    }

    /// Merge one discovery pass
    ///
    /// When `probed` names a device absent from the current list, the whole
    /// list is replaced and a `Discovered` event goes out for each new name,
    /// so a pass that finds two devices sends two events rather than one
    /// per pass. Passes that only lose devices change nothing. Returns the
    /// new devices.
    pub fn apply(&self, probed: Vec<SourceInfo>) -> Vec<SourceInfo> {
        let current = self.snapshot();
        let discovered: Vec<SourceInfo> = probed
            .iter()
            .filter(|p| !current.iter().any(|c| c.name == p.name))
            .cloned()
            .collect();

        if discovered.is_empty() {
            return discovered;
        }

        self.current.store(Arc::new(probed));
        for source in &discovered {
            debug!("Discovered \"{}\"", source.name);
            let _ = self.events.send(DeviceEvent::Discovered(source.clone()));
        }
        discovered
    }

    /// Probe and merge synchronously
    pub fn refresh(&self, enumerator: &dyn DeviceEnumerator, max_sources: u32) -> Vec<SourceInfo> {
        self.apply(probe_sources(enumerator, max_sources))
    }
}

/// Start the periodic discovery task
///
/// Runs until `cancel` fires. Probing happens on the blocking pool since
/// enumeration talks to drivers.
pub fn spawn_discovery(
    catalog: Arc<SourceCatalog>,
    enumerator: Arc<dyn DeviceEnumerator>,
    interval: Duration,
    max_sources: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The catalog was probed on construction
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let enumerator = Arc::clone(&enumerator);
            let probed = tokio::task::spawn_blocking(move || {
                probe_sources(enumerator.as_ref(), max_sources)
            })
            .await;

            match probed {
                Ok(probed) => {
                    catalog.apply(probed);
                }
                Err(e) => warn!("Discovery probe failed: {}", e),
            }
        }

        debug!("Discovery task stopped");
    })
}
