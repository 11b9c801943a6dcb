//! Webcam capture through nokhwa
//!
//! `nokhwa::Camera` is not `Send`, so devices are opened on the capture
//! thread and never leave it.

use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{debug, warn};

use super::{BackendId, CaptureBackend, CaptureDevice, DeviceEnumerator, DEFAULT_BACKEND};
use crate::error::{CaptureError, Result};
use crate::types::Resolution;

/// Backend IDs and raw names, default first
const BACKENDS: &[(BackendId, &str, ApiBackend)] = &[
    (DEFAULT_BACKEND, "video-capture-any", ApiBackend::Auto),
    (200, "video-capture-v4l2", ApiBackend::Video4Linux),
    (1200, "video-capture-avfoundation", ApiBackend::AVFoundation),
    (1400, "video-capture-msmf", ApiBackend::MediaFoundation),
];

fn api_backend(id: BackendId) -> Option<ApiBackend> {
    BACKENDS
        .iter()
        .find(|(known, _, _)| *known == id)
        .map(|(_, _, api)| *api)
}

/// Real webcams via the platform's native capture API
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaBackend;

impl NokhwaBackend {
    /// Create the backend
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for NokhwaBackend {
    fn backend_name(&self, id: BackendId) -> Option<String> {
        BACKENDS
            .iter()
            .find(|(known, _, _)| *known == id)
            .map(|(_, name, _)| name.to_string())
    }

    fn open(&self, index: u32, backend: BackendId) -> Result<Box<dyn CaptureDevice>> {
        let api = api_backend(backend)
            .ok_or_else(|| CaptureError::device(format!("unknown backend {}", backend)))?;

        let requested =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::with_backend(CameraIndex::Index(index), requested, api)?;
        camera.open_stream()?;

        debug!("Opened camera {} with {:?}", index, api);
        Ok(Box::new(NokhwaDevice { camera }))
    }
}

impl DeviceEnumerator for NokhwaBackend {
    fn device_name(&self, index: u32) -> Option<String> {
        let cameras = match nokhwa::query(ApiBackend::Auto) {
            Ok(cameras) => cameras,
            Err(e) => {
                debug!("Camera query failed: {}", e);
                return None;
            }
        };
        cameras
            .get(index as usize)
            .map(|info| info.human_name())
            .filter(|name| !name.is_empty())
    }
}

struct NokhwaDevice {
    camera: Camera,
}

impl CaptureDevice for NokhwaDevice {
    fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.camera
            .set_resolution(nokhwa::utils::Resolution::new(
                resolution.width,
                resolution.height,
            ))
            .map_err(CaptureError::from)
    }

    fn resolution(&self) -> Resolution {
        let res = self.camera.resolution();
        Resolution::new(res.width(), res.height())
    }

    fn read(&mut self, frame: &mut RgbaImage) -> Result<()> {
        let buffer = self.camera.frame()?;
        let decoded = buffer.decode_image::<RgbAFormat>()?;
        let (width, height) = decoded.dimensions();
        *frame = RgbaImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::device("decoded frame has the wrong length"))?;
        Ok(())
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera stream: {}", e);
        }
    }
}
