//! Device session lifecycle
//!
//! `DeviceManager` owns at most one `ActiveSession`. Opening spawns the
//! capture thread and waits for its one-shot startup report; closing
//! cancels the session and waits a bounded time for the acknowledgement.
//!
//! ```text
//! Disabled ──open──▶ Opening ──ok──▶ Active ──close──▶ Closing ──▶ Disabled
//!                       └──err──▶ Disabled
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use image::RgbaImage;

use super::catalog::{spawn_discovery, SourceCatalog};
use super::worker::{CaptureWorker, WorkerStats};
use crate::backend::{
    BackendId, BackendRegistry, CaptureBackend, DeviceEnumerator, DEFAULT_BACKEND,
};
use crate::config::{CaptureConfig, SharedConfig};
use crate::error::{CaptureError, Result};
use crate::frame::FrameBuffer;
use crate::types::{DeviceEvent, DeviceState, Rect, Resolution, SourceInfo};

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 64;

/// A running capture session
///
/// Only produced by a successful open and only consumed by close.
struct ActiveSession {
    source: SourceInfo,
    backend_name: String,
    resolution: Resolution,
    stop: CancellationToken,
    stopped: oneshot::Receiver<()>,
    stats: Arc<WorkerStats>,
    thread: std::thread::JoinHandle<()>,
}

impl ActiveSession {
    /// Cancel the capture task and wait up to `timeout` for its acknowledgement
    async fn stop(self, timeout: Duration) -> Result<()> {
        self.stop.cancel();

        match tokio::time::timeout(timeout, self.stopped).await {
            // A dropped sender means the thread is gone too
            Ok(_) => {
                if !self.thread.is_finished() {
                    debug!("Capture thread for \"{}\" is finishing", self.source.name);
                }
                Ok(())
            }
            Err(_) => {
                error!("\"{}\" failed to stop", self.source.name);
                Err(CaptureError::StopTimeout {
                    device: self.source.name,
                    timeout,
                })
            }
        }
    }
}

/// Undoes a half-finished open unless disarmed
///
/// Covers an open future dropped before it could take ownership of the
/// session: the capture task is told to stop, and the buffer, configured
/// device and published state go back to disabled.
struct OpeningGuard<'a> {
    state: &'a watch::Sender<DeviceState>,
    frames: &'a FrameBuffer,
    config: &'a SharedConfig,
    stop: CancellationToken,
    armed: bool,
}

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("Open abandoned, stopping capture task");
        self.stop.cancel();
        self.frames.reset();
        self.config.write().device = None;
        self.state.send_replace(DeviceState::Disabled);
    }
}

/// Discovers capture devices and manages the single active session
pub struct DeviceManager {
    backend: Arc<dyn CaptureBackend>,
    registry: BackendRegistry,
    catalog: Arc<SourceCatalog>,
    frames: Arc<FrameBuffer>,
    config: SharedConfig,
    events: broadcast::Sender<DeviceEvent>,
    state: watch::Sender<DeviceState>,
    session: Option<ActiveSession>,
    discovery_cancel: CancellationToken,
    discovery: JoinHandle<()>,
    registry_build: Option<JoinHandle<()>>,
}

impl DeviceManager {
    /// Create a manager and start its background tasks
    ///
    /// Probes the device catalog once, then starts the discovery task and
    /// the backend registry build. Must be called inside a tokio runtime.
    pub fn new(
        config: SharedConfig,
        backend: Arc<dyn CaptureBackend>,
        enumerator: Arc<dyn DeviceEnumerator>,
    ) -> Result<Self> {
        let settings = config.read().clone();
        settings.validate()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let catalog = Arc::new(SourceCatalog::probe(
            enumerator.as_ref(),
            settings.max_sources,
            events.clone(),
        ));

        let discovery_cancel = CancellationToken::new();
        let discovery = spawn_discovery(
            Arc::clone(&catalog),
            enumerator,
            settings.discovery_interval,
            settings.max_sources,
            discovery_cancel.clone(),
        );

        let (registry, registry_build) =
            BackendRegistry::spawn(Arc::clone(&backend), settings.backend_probe_limit);

        let (state, _) = watch::channel(DeviceState::Disabled);

        info!(
            "Device manager ready ({} sources, main resolution {})",
            catalog.snapshot().len(),
            settings.main_resolution
        );

        Ok(Self {
            backend,
            registry,
            catalog,
            frames: Arc::new(FrameBuffer::new(settings.main_resolution)),
            config,
            events,
            state,
            session: None,
            discovery_cancel,
            discovery,
            registry_build: Some(registry_build),
        })
    }

    /// Wait for the backend registry probe to finish
    pub async fn backends_ready(&mut self) {
        if let Some(build) = self.registry_build.take() {
            if let Err(e) = build.await {
                warn!("Backend probe failed: {}", e);
            }
        }
    }

    /// Open the device at `index` with backend `backend`
    ///
    /// A no-op while a session is already active. Waits for the capture
    /// task's startup report; on failure the manager stays disabled.
    pub async fn open(&mut self, index: u32, backend: BackendId) -> Result<()> {
        if let Some(session) = &self.session {
            debug!("Ignoring call to open \"{}\" (active)", session.source.name);
            return Ok(());
        }

        let (resolution, poll_interval) = {
            let config = self.config.read();
            (config.main_resolution, config.poll_interval)
        };
        let source = SourceInfo::new(index, self.catalog.name(Some(index)));
        let backend_name = match self.registry.backend_name(backend) {
            name if name.is_empty() => format!("#{}", backend),
            name => name,
        };

        let stop = CancellationToken::new();
        self.state.send_replace(DeviceState::Opening);
        let mut guard = OpeningGuard {
            state: &self.state,
            frames: &self.frames,
            config: &self.config,
            stop: stop.clone(),
            armed: true,
        };

        let (startup_tx, startup_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let stats = Arc::new(WorkerStats::default());

        let worker = CaptureWorker {
            source: source.clone(),
            backend: Arc::clone(&self.backend),
            backend_id: backend,
            backend_name: backend_name.clone(),
            resolution,
            poll_interval,
            frames: Arc::clone(&self.frames),
            stop: stop.clone(),
            events: self.events.clone(),
            stats: Arc::clone(&stats),
        };

        let thread = std::thread::Builder::new()
            .name("hudcap-capture".to_string())
            .spawn(move || worker.run(startup_tx, stopped_tx))
            .map_err(|e| {
                CaptureError::device(format!("Failed to spawn capture thread: {}", e))
            })?;

        let report = startup_rx
            .await
            .unwrap_or_else(|_| Err(CaptureError::TaskLost(source.name.clone())));

        guard.armed = false;
        drop(guard);

        if let Err(e) = report {
            warn!("Failed to open \"{}\": {}", source.name, e);
            self.reset();
            return Err(e);
        }

        info!("Opened \"{}\" ({}, {})", source.name, backend_name, resolution);
        self.session = Some(ActiveSession {
            source: source.clone(),
            backend_name,
            resolution,
            stop,
            stopped: stopped_rx,
            stats,
            thread,
        });
        self.state.send_replace(DeviceState::Active);
        let _ = self.events.send(DeviceEvent::Opened(source));
        Ok(())
    }

    /// Open whatever the shared config selects
    ///
    /// No device selected is not an error. Unknown backend names fall back
    /// to the default backend.
    pub async fn open_configured(&mut self) -> Result<()> {
        let (device, backend_name) = {
            let config = self.config.read();
            (config.device, config.backend.clone())
        };
        let Some(index) = device else {
            return Ok(());
        };

        let backend = match self.registry.backend_id(&backend_name) {
            Some(id) => id,
            None => {
                warn!(
                    "Unknown backend \"{}\", using \"{}\"",
                    backend_name,
                    self.registry.backend_name(DEFAULT_BACKEND)
                );
                DEFAULT_BACKEND
            }
        };
        self.open(index, backend).await
    }

    /// Stop the active session
    ///
    /// A no-op when disabled. Waits at most the configured stop timeout; if
    /// the capture task does not acknowledge in time the session is still
    /// discarded and `StopTimeout` is returned.
    pub async fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            debug!("Ignoring call to close \"{}\" (inactive)", self.active_name());
            return Ok(());
        };

        self.state.send_replace(DeviceState::Closing);
        let source = session.source.clone();
        let timeout = self.config.read().stop_timeout;

        let result = session.stop(timeout).await;
        if result.is_err() {
            let _ = self.events.send(DeviceEvent::StopTimedOut(source.clone()));
        }

        info!("Closed \"{}\"", source.name);
        self.reset();
        let _ = self.events.send(DeviceEvent::Closed(source));
        result
    }

    /// Return to the disabled state
    fn reset(&mut self) {
        self.session = None;
        self.frames.reset();
        self.config.write().device = None;
        self.state.send_replace(DeviceState::Disabled);
    }

    /// Whether a session is open
    ///
    /// Stays true after a runtime read failure; see `capture_alive`.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the capture loop of the active session is still running
    pub fn capture_alive(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.stats.running.load(Ordering::SeqCst))
    }

    /// Frames captured by the active session
    pub fn frames_captured(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.stats.frames.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    /// Subscribe to device notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Name of the active device, or "Disabled"
    pub fn active_name(&self) -> String {
        match &self.session {
            Some(session) => session.source.name.clone(),
            None => self.catalog.name(None),
        }
    }

    /// Backend of the active session
    pub fn active_backend(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.backend_name.as_str())
    }

    /// Dimensions the active device negotiated
    pub fn active_resolution(&self) -> Option<Resolution> {
        self.session.as_ref().map(|s| s.resolution)
    }

    /// Display name for a device selection
    pub fn name(&self, index: Option<u32>) -> String {
        self.catalog.name(index)
    }

    /// Indices and names of connected devices
    pub fn sources(&self) -> (Vec<u32>, Vec<String>) {
        self.catalog.sources()
    }

    /// The source catalog
    pub fn catalog(&self) -> &Arc<SourceCatalog> {
        &self.catalog
    }

    /// Backend names, default first
    pub fn backends(&self) -> Vec<String> {
        self.registry.backends()
    }

    /// ID for a backend name
    pub fn backend_id(&self, name: &str) -> Option<BackendId> {
        self.registry.backend_id(name)
    }

    /// Display name for a backend ID
    pub fn backend_name(&self, id: BackendId) -> String {
        self.registry.backend_name(id)
    }

    /// Handle to the shared frame buffer, for readers on other tasks
    pub fn frames(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.frames)
    }

    /// Full current frame, None while no frame is available
    pub fn capture(&self) -> Result<Option<RgbaImage>> {
        self.frames.capture()
    }

    /// Region of the current frame, None while no frame is available
    pub fn capture_rect(&self, rect: Rect) -> Result<Option<RgbaImage>> {
        self.frames.capture_rect(rect)
    }

    /// Snapshot of the shared config
    pub fn config(&self) -> CaptureConfig {
        self.config.read().clone()
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.discovery_cancel.cancel();
        self.discovery.abort();
        if let Some(session) = self.session.take() {
            debug!("Stopping \"{}\" on drop", session.source.name);
            session.stop.cancel();
        }
    }
}
