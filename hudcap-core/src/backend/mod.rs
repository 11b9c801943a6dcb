//! Capture backends
//!
//! This module defines what the manager needs from the platform:
//! - `CaptureBackend` opens devices and names backend IDs
//! - `CaptureDevice` is one opened device, driven from the capture thread
//! - `DeviceEnumerator` names the device at each enumeration slot
//!
//! Any implementation meeting these contracts is pluggable. A synthetic
//! test-pattern backend is always available; real webcams are supported
//! through `nokhwa` behind the `nokhwa` feature.

pub mod pattern;
pub mod registry;

#[cfg(feature = "nokhwa")]
pub mod webcam;

pub use pattern::TestPatternBackend;
pub use registry::BackendRegistry;

#[cfg(feature = "nokhwa")]
pub use webcam::NokhwaBackend;

use image::RgbaImage;

use crate::error::Result;
use crate::types::Resolution;

/// Numeric identifier of a capture backend
pub type BackendId = u32;

/// Backend chosen when the caller does not ask for one
pub const DEFAULT_BACKEND: BackendId = 0;

/// A platform capture API family
pub trait CaptureBackend: Send + Sync + 'static {
    /// Raw name of the backend with this ID, or None if the ID is unused
    fn backend_name(&self, id: BackendId) -> Option<String>;

    /// Open the device at `index` through the backend `backend`
    ///
    /// Called on the capture thread; the returned device never leaves it.
    fn open(&self, index: u32, backend: BackendId) -> Result<Box<dyn CaptureDevice>>;
}

/// One opened capture device
///
/// Dropping the device releases the hardware.
pub trait CaptureDevice {
    /// Ask the device for a frame size
    fn set_resolution(&mut self, resolution: Resolution) -> Result<()>;

    /// Frame size the device is actually delivering
    fn resolution(&self) -> Resolution;

    /// Block until one frame is read into `frame`
    ///
    /// `frame` is reused between calls; implementations resize it when its
    /// dimensions do not match the device.
    fn read(&mut self, frame: &mut RgbaImage) -> Result<()>;
}

/// Platform device enumeration
pub trait DeviceEnumerator: Send + Sync + 'static {
    /// Display name of the device at `index`, None or empty if the slot is free
    fn device_name(&self, index: u32) -> Option<String>;
}
