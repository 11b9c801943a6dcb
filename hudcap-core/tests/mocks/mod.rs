//! Mock infrastructure for testing
//!
//! Provides a scriptable capture backend: device names can change between
//! discovery passes, and devices can refuse to open, negotiate the wrong
//! size, fail mid-session or wedge inside a read.

#![allow(dead_code)]

use hudcap_core::backend::{BackendId, CaptureBackend, CaptureDevice, DeviceEnumerator};
use hudcap_core::error::{CaptureError, Result};
use hudcap_core::types::Resolution;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// ID of the mock's non-default backend
pub const MOCK_BACKEND: BackendId = 200;

#[derive(Default)]
struct MockState {
    names: Mutex<Vec<String>>,
    native_resolution: Mutex<Option<Resolution>>,
    open_delay: Mutex<Duration>,
    fail_open: AtomicBool,
    fail_after: Mutex<Option<u64>>,
    wedged: AtomicBool,
    in_read: AtomicBool,
    opens: AtomicUsize,
    released: AtomicUsize,
}

/// Scriptable backend and enumerator
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    /// Create a backend with devices at indices 0..n
    pub fn with_devices(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.set_devices(names);
        backend
    }

    /// Replace the connected device list
    pub fn set_devices(&self, names: &[&str]) {
        *self.state.names.lock() = names.iter().map(|n| n.to_string()).collect();
    }

    /// Make devices ignore resolution requests
    pub fn set_native_resolution(&self, resolution: Resolution) {
        *self.state.native_resolution.lock() = Some(resolution);
    }

    /// Make opens block for `delay` before returning
    pub fn set_open_delay(&self, delay: Duration) {
        *self.state.open_delay.lock() = delay;
    }

    /// Make every open fail
    pub fn set_fail_open(&self, fail: bool) {
        self.state.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make reads fail after `frames` successful ones
    pub fn set_fail_after(&self, frames: u64) {
        *self.state.fail_after.lock() = Some(frames);
    }

    /// Block reads until `release` is called
    pub fn wedge(&self) {
        self.state.wedged.store(true, Ordering::SeqCst);
    }

    /// Let wedged reads return
    pub fn release(&self) {
        self.state.wedged.store(false, Ordering::SeqCst);
    }

    /// Whether a read is currently blocked in the device
    pub fn in_read(&self) -> bool {
        self.state.in_read.load(Ordering::SeqCst)
    }

    /// Number of successful opens
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of devices dropped
    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    /// As trait objects for `DeviceManager::new`
    pub fn handles(&self) -> (Arc<dyn CaptureBackend>, Arc<dyn DeviceEnumerator>) {
        (Arc::new(self.clone()), Arc::new(self.clone()))
    }
}

impl CaptureBackend for MockBackend {
    fn backend_name(&self, id: BackendId) -> Option<String> {
        match id {
            0 => Some("video-capture-any".to_string()),
            MOCK_BACKEND => Some("video-capture-mock".to_string()),
            _ => None,
        }
    }

    fn open(&self, index: u32, _backend: BackendId) -> Result<Box<dyn CaptureDevice>> {
        let delay = *self.state.open_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(CaptureError::device("mock refuses to open"));
        }
        if index as usize >= self.state.names.lock().len() {
            return Err(CaptureError::device(format!("no mock device {}", index)));
        }

        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDevice {
            state: Arc::clone(&self.state),
            resolution: Resolution::new(640, 480),
            reads: 0,
        }))
    }
}

impl DeviceEnumerator for MockBackend {
    fn device_name(&self, index: u32) -> Option<String> {
        self.state.names.lock().get(index as usize).cloned()
    }
}

struct MockDevice {
    state: Arc<MockState>,
    resolution: Resolution,
    reads: u64,
}

impl CaptureDevice for MockDevice {
    fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.resolution = self
            .state
            .native_resolution
            .lock()
            .unwrap_or(resolution);
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read(&mut self, frame: &mut RgbaImage) -> Result<()> {
        while self.state.wedged.load(Ordering::SeqCst) {
            self.state.in_read.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
        }
        self.state.in_read.store(false, Ordering::SeqCst);

        let reads = self.reads;
        self.reads += 1;
        if let Some(limit) = *self.state.fail_after.lock() {
            if reads >= limit {
                return Err(CaptureError::device("mock device unplugged"));
            }
        }

        let shade = (reads % 256) as u8;
        *frame = RgbaImage::from_pixel(
            self.resolution.width,
            self.resolution.height,
            Rgba([shade, 0, 0, 255]),
        );
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `check` every few milliseconds until it holds or `timeout` passes
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_enumerates_devices() {
        let backend = MockBackend::with_devices(&["CamA", "CamB"]);
        assert_eq!(backend.device_name(1).as_deref(), Some("CamB"));
        assert_eq!(backend.device_name(2), None);
    }

    #[test]
    fn test_mock_device_counts_release() {
        let backend = MockBackend::with_devices(&["CamA"]);
        let device = backend.open(0, 0).expect("Should open");
        assert_eq!(backend.opens(), 1);
        drop(device);
        assert_eq!(backend.released(), 1);
    }
}
