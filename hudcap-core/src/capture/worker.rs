//! Capture task
//!
//! Runs on a dedicated thread because device reads block. The device is
//! opened on that thread and never leaves it.

use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::backend::{BackendId, CaptureBackend, CaptureDevice};
use crate::error::{CaptureError, Result};
use crate::frame::FrameBuffer;
use crate::types::{DeviceEvent, Resolution, SourceInfo};

/// State shared between a capture thread and its session
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    /// Whether the run loop is executing
    pub(crate) running: AtomicBool,
    /// Frames published this session
    pub(crate) frames: AtomicU64,
}

/// Why the run loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    Stopped,
    Failed(String),
}

/// Everything the capture thread needs
pub(crate) struct CaptureWorker {
    pub(crate) source: SourceInfo,
    pub(crate) backend: Arc<dyn CaptureBackend>,
    pub(crate) backend_id: BackendId,
    pub(crate) backend_name: String,
    pub(crate) resolution: Resolution,
    pub(crate) poll_interval: Duration,
    pub(crate) frames: Arc<FrameBuffer>,
    pub(crate) stop: CancellationToken,
    pub(crate) events: broadcast::Sender<DeviceEvent>,
    pub(crate) stats: Arc<WorkerStats>,
}

impl CaptureWorker {
    /// Thread body
    ///
    /// `startup` is answered exactly once. `stopped` is answered exactly
    /// once if startup succeeded, after the device has been released.
    pub(crate) fn run(self, startup: oneshot::Sender<Result<()>>, stopped: oneshot::Sender<()>) {
        info!(
            "Opening \"{}\" with API \"{}\"",
            self.source.name, self.backend_name
        );

        let mut device = match self.start() {
            Ok(device) => device,
            Err(e) => {
                let _ = startup.send(Err(e));
                return;
            }
        };

        // Alive before the opener hears about it
        self.stats.running.store(true, Ordering::SeqCst);
        if startup.send(Ok(())).is_err() {
            self.stats.running.store(false, Ordering::SeqCst);
            debug!("Open of \"{}\" was abandoned", self.source.name);
            return;
        }

        let exit = self.capture_loop(device.as_mut());
        drop(device);
        self.stats.running.store(false, Ordering::SeqCst);

        info!("Closing \"{}\"...", self.source.name);
        if let Exit::Failed(reason) = exit {
            let _ = self.events.send(DeviceEvent::CaptureFailed {
                source: self.source.clone(),
                reason,
            });
        }
        let _ = stopped.send(());
    }

    /// Open the device and check its geometry
    fn start(&self) -> Result<Box<dyn CaptureDevice>> {
        let mut device = self
            .backend
            .open(self.source.index, self.backend_id)
            .map_err(|e| {
                debug!("Open of \"{}\" failed: {}", self.source.name, e);
                CaptureError::UnsupportedBackend {
                    device: self.source.name.clone(),
                    backend: self.backend_name.clone(),
                }
            })?;

        info!("Applying dimensions ({})", self.resolution);
        if let Err(e) = device.set_resolution(self.resolution) {
            warn!("\"{}\" rejected {}: {}", self.source.name, self.resolution, e);
        }

        let actual = device.resolution();
        if actual != self.resolution {
            return Err(CaptureError::DimensionMismatch {
                device: self.source.name.clone(),
                expected: self.resolution,
                actual,
            });
        }

        Ok(device)
    }

    fn capture_loop(&self, device: &mut dyn CaptureDevice) -> Exit {
        let mut frame = RgbaImage::new(0, 0);
        let mut last: Option<Arc<RgbaImage>> = None;

        loop {
            if self.stop.is_cancelled() {
                return self.stopped(last);
            }
            std::thread::sleep(self.poll_interval);

            if let Err(e) = device.read(&mut frame) {
                warn!("Failed to capture from \"{}\": {}", self.source.name, e);
                return Exit::Failed(e.to_string());
            }
            if frame.width() == 0 || frame.height() == 0 {
                warn!("Failed to capture from \"{}\": empty frame", self.source.name);
                return Exit::Failed("empty frame".to_string());
            }

            // A read that outlived close must not overwrite the reset buffer
            if self.stop.is_cancelled() {
                return self.stopped(last);
            }

            // Drop our handle first so the previous frame can be recycled
            drop(last.take());
            let published = Arc::new(frame);
            let previous = self.frames.publish(Arc::clone(&published));
            last = Some(published);

            let count = self.stats.frames.fetch_add(1, Ordering::Relaxed);
            if count % 600 == 0 {
                trace!("Captured {} frames from \"{}\"", count + 1, self.source.name);
            }

            // Reuse the old frame's allocation when no reader holds it
            frame = previous
                .and_then(|p| Arc::try_unwrap(p).ok())
                .unwrap_or_else(|| RgbaImage::new(0, 0));
        }
    }

    /// Take back a frame published after the session was reset
    fn stopped(&self, last: Option<Arc<RgbaImage>>) -> Exit {
        if let Some(last) = last {
            if self.frames.retract(&last) {
                debug!("Retracted late frame from \"{}\"", self.source.name);
            }
        }
        Exit::Stopped
    }
}
