//! Synthetic capture devices
//!
//! Produces a scrolling gradient so the manager can run without hardware.

use image::{Rgba, RgbaImage};
use std::time::Duration;

use super::{BackendId, CaptureBackend, CaptureDevice, DeviceEnumerator, DEFAULT_BACKEND};
use crate::error::{CaptureError, Result};
use crate::types::Resolution;

/// ID of the test-pattern backend
pub const PATTERN_BACKEND: BackendId = 1;

/// Roughly 60 frames per second
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Backend exposing a fixed list of synthetic devices
#[derive(Debug, Clone)]
pub struct TestPatternBackend {
    devices: Vec<String>,
    native_resolution: Option<Resolution>,
    frame_interval: Duration,
}

impl TestPatternBackend {
    /// Create a backend with the given device names at indices 0..n
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
            native_resolution: None,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    /// Make every device ignore resolution requests and stay at `resolution`
    pub fn with_native_resolution(mut self, resolution: Resolution) -> Self {
        self.native_resolution = Some(resolution);
        self
    }

    /// Set how long each read blocks
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl Default for TestPatternBackend {
    fn default() -> Self {
        Self::new(["Test Pattern"])
    }
}

impl CaptureBackend for TestPatternBackend {
    fn backend_name(&self, id: BackendId) -> Option<String> {
        match id {
            DEFAULT_BACKEND => Some("video-capture-any".to_string()),
            PATTERN_BACKEND => Some("video-capture-pattern".to_string()),
            _ => None,
        }
    }

    fn open(&self, index: u32, backend: BackendId) -> Result<Box<dyn CaptureDevice>> {
        if backend != DEFAULT_BACKEND && backend != PATTERN_BACKEND {
            return Err(CaptureError::device(format!(
                "backend {} is not available for test patterns",
                backend
            )));
        }
        if index as usize >= self.devices.len() {
            return Err(CaptureError::device(format!("no device at index {}", index)));
        }

        Ok(Box::new(PatternDevice {
            resolution: self.native_resolution.unwrap_or(Resolution::new(640, 480)),
            fixed: self.native_resolution.is_some(),
            frame_interval: self.frame_interval,
            tick: 0,
        }))
    }
}

impl DeviceEnumerator for TestPatternBackend {
    fn device_name(&self, index: u32) -> Option<String> {
        self.devices.get(index as usize).cloned()
    }
}

struct PatternDevice {
    resolution: Resolution,
    fixed: bool,
    frame_interval: Duration,
    tick: u32,
}

impl CaptureDevice for PatternDevice {
    fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        if !self.fixed {
            self.resolution = resolution;
        }
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read(&mut self, frame: &mut RgbaImage) -> Result<()> {
        std::thread::sleep(self.frame_interval);

        let Resolution { width, height } = self.resolution;
        if frame.dimensions() != (width, height) {
            *frame = RgbaImage::new(width, height);
        }

        let shift = self.tick;
        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let r = ((x.wrapping_add(shift)) % 256) as u8;
            let g = (y % 256) as u8;
            let b = ((x ^ y).wrapping_add(shift) % 256) as u8;
            *pixel = Rgba([r, g, b, 255]);
        }
        self.tick = self.tick.wrapping_add(4);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_is_dense() {
        let backend = TestPatternBackend::new(["A", "B"]);
        assert_eq!(backend.device_name(0).as_deref(), Some("A"));
        assert_eq!(backend.device_name(1).as_deref(), Some("B"));
        assert_eq!(backend.device_name(2), None);
    }

    #[test]
    fn test_device_honors_requested_resolution() {
        let backend = TestPatternBackend::default().with_frame_interval(Duration::ZERO);
        let mut device = backend.open(0, DEFAULT_BACKEND).unwrap();
        device.set_resolution(Resolution::new(64, 32)).unwrap();
        assert_eq!(device.resolution(), Resolution::new(64, 32));

        let mut frame = RgbaImage::new(0, 0);
        device.read(&mut frame).unwrap();
        assert_eq!(frame.dimensions(), (64, 32));
    }

    #[test]
    fn test_native_resolution_is_fixed() {
        let backend =
            TestPatternBackend::default().with_native_resolution(Resolution::new(320, 240));
        let mut device = backend.open(0, PATTERN_BACKEND).unwrap();
        device.set_resolution(Resolution::FULL_HD).unwrap();
        assert_eq!(device.resolution(), Resolution::new(320, 240));
    }

    #[test]
    fn test_open_rejects_unknown_backend_and_index() {
        let backend = TestPatternBackend::default();
        assert!(backend.open(0, 1400).is_err());
        assert!(backend.open(3, DEFAULT_BACKEND).is_err());
    }
}
