//! hudcap Core Library
//!
//! Capture-device lifecycle management for game overlays.
//!
//! This library provides:
//! - Capture backend discovery and a name/ID registry
//! - A hot-plug aware catalog of connected devices
//! - A single active capture session with bounded shutdown
//! - A shared frame buffer with validated region extraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌────────────────┐    ┌─────────────────┐
//! │ Source Catalog  │───▶│ Device Manager │───▶│ Capture Thread  │
//! │ (discovery)     │    │ (open / close) │    │ (device reads)  │
//! └─────────────────┘    └────────────────┘    └────────┬────────┘
//!                                                       ▼
//!                                              ┌─────────────────┐
//!                                              │  Frame Buffer   │
//!                                              └─────────────────┘
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod types;

pub use backend::{BackendId, BackendRegistry, CaptureBackend, CaptureDevice, DeviceEnumerator};
pub use capture::{DeviceManager, SourceCatalog};
pub use config::{CaptureConfig, ConfigFile, SharedConfig};
pub use error::{CaptureError, Result};
pub use frame::FrameBuffer;
pub use types::{DeviceEvent, DeviceState, Rect, Resolution, SourceInfo};
