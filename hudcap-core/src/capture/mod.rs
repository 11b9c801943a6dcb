//! Capture device discovery and sessions
//!
//! This module handles:
//! - Device enumeration and hot-plug discovery
//! - The single active capture session
//! - The capture thread feeding the frame buffer

pub mod catalog;
pub mod session;
mod worker;

pub use catalog::{probe_sources, spawn_discovery, SourceCatalog, DISABLED_NAME};
pub use session::DeviceManager;
