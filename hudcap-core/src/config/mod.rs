//! Configuration types for hudcap
//!
//! Runtime settings for the device manager and the shared store the manager
//! resets when a session ends.

mod file;

pub use file::{sample_config, ConfigFile};

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CaptureError, Result};
use crate::types::Resolution;

/// How often the discovery task re-probes hardware
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

/// Number of device slots probed per discovery pass
pub const DEFAULT_MAX_SOURCES: u32 = 10;

/// How long close waits for the capture task to acknowledge
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between frame reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound (exclusive) of the backend ID space probed at startup
pub const DEFAULT_BACKEND_PROBE_LIMIT: u32 = 5000;

/// Config store shared between the manager and its owner
pub type SharedConfig = Arc<RwLock<CaptureConfig>>;

/// Runtime configuration for the device manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Selected device index (None = no device)
    pub device: Option<u32>,
    /// Selected backend name (empty = default backend)
    pub backend: String,
    /// Resolution every device must negotiate
    pub main_resolution: Resolution,
    /// Discovery polling interval
    pub discovery_interval: Duration,
    /// Device slots probed per discovery pass
    pub max_sources: u32,
    /// Bound on how long close waits for the capture task
    pub stop_timeout: Duration,
    /// Sleep between frame reads
    pub poll_interval: Duration,
    /// Backend IDs probed when building the registry
    pub backend_probe_limit: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            backend: String::new(),
            main_resolution: Resolution::FULL_HD,
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            max_sources: DEFAULT_MAX_SOURCES,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backend_probe_limit: DEFAULT_BACKEND_PROBE_LIMIT,
        }
    }
}

impl CaptureConfig {
    /// Select a device by index
    pub fn with_device(mut self, index: u32) -> Self {
        self.device = Some(index);
        self
    }

    /// Select a backend by name
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Set the required capture resolution
    pub fn with_main_resolution(mut self, resolution: Resolution) -> Self {
        self.main_resolution = resolution;
        self
    }

    /// Set the discovery polling interval
    pub fn with_discovery_interval(mut self, interval: Duration) -> Self {
        self.discovery_interval = interval;
        self
    }

    /// Set how many device slots are probed
    pub fn with_max_sources(mut self, max: u32) -> Self {
        self.max_sources = max;
        self
    }

    /// Set the close timeout
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the pause between frame reads
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the backend probe range
    pub fn with_backend_probe_limit(mut self, limit: u32) -> Self {
        self.backend_probe_limit = limit;
        self
    }

    /// Wrap into a shared store
    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    /// Reject settings the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.main_resolution.is_empty() {
            return Err(CaptureError::config(format!(
                "main resolution {} has a zero side",
                self.main_resolution
            )));
        }
        if self.discovery_interval.is_zero() {
            return Err(CaptureError::config("discovery interval must be non-zero"));
        }
        if self.max_sources == 0 {
            return Err(CaptureError::config("at least one device slot must be probed"));
        }
        if self.stop_timeout.is_zero() {
            return Err(CaptureError::config("stop timeout must be non-zero"));
        }
        Ok(())
    }
}
