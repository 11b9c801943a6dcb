//! Error types for hudcap

use std::time::Duration;

use thiserror::Error;

use crate::types::{Rect, Resolution};

/// Result type alias using CaptureError
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Main error type for hudcap operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Requested region falls outside the allowed area
    #[error("illegal boundaries {requested} outside {bounds}")]
    Bounds {
        /// Rectangle the caller asked for
        requested: Rect,
        /// Rectangle it had to fit in
        bounds: Rect,
    },

    /// Device could not be opened with the requested backend
    #[error("{device} does not support {backend} encoding")]
    UnsupportedBackend {
        /// Device display name
        device: String,
        /// Backend display name
        backend: String,
    },

    /// Device negotiated a resolution other than the required one
    #[error("{device} has illegal dimensions {actual} (expected {expected})")]
    DimensionMismatch {
        /// Device display name
        device: String,
        /// Required resolution
        expected: Resolution,
        /// Resolution the device reported
        actual: Resolution,
    },

    /// Device I/O failure (open, property or frame read)
    #[error("Device error: {0}")]
    Device(String),

    /// Capture task did not acknowledge a stop request in time
    #[error("{device} failed to stop within {timeout:?}")]
    StopTimeout {
        /// Device display name
        device: String,
        /// How long close waited
        timeout: Duration,
    },

    /// Capture task went away without reporting
    #[error("Capture task for {0} exited without reporting")]
    TaskLost(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CaptureError>,
    },
}

impl CaptureError {
    /// Create a bounds error
    pub fn bounds(requested: Rect, bounds: Rect) -> Self {
        Self::Bounds { requested, bounds }
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller can retry the same call with corrected input
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Bounds { .. } | Self::Config(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        Self::Device(format!("image error: {}", err))
    }
}

#[cfg(feature = "nokhwa")]
impl From<nokhwa::NokhwaError> for CaptureError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        Self::Device(err.to_string())
    }
}
