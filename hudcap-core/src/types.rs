//! Core types for hudcap
//!
//! Geometry, source descriptions and the events/states the manager reports.

use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// 1920x1080, the overlay's native geometry
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);

    /// Create a resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rectangle anchored at the origin covering this resolution
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(|| format!("Invalid resolution: {}", s))?;
        let width = w.parse().map_err(|_| format!("Invalid width: {}", w))?;
        let height = h.parse().map_err(|_| format!("Invalid height: {}", h))?;
        Ok(Self::new(width, height))
    }
}

/// Axis-aligned rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its origin and size
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    /// Whether `self` lies entirely inside `outer`
    ///
    /// An empty rectangle is inside every rectangle.
    pub fn is_within(&self, outer: &Rect) -> bool {
        if self.is_empty() {
            return true;
        }
        self.x >= outer.x
            && self.y >= outer.y
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.x,
            self.y,
            self.right(),
            self.bottom()
        )
    }
}

impl std::str::FromStr for Rect {
    type Err = String;

    /// Parse `x,y,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid rectangle {}: {}", s, e))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(format!("Rectangle must be x,y,width,height: {}", s)),
        }
    }
}

/// A connected capture device as seen by one discovery pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Enumeration index, used to open the device
    pub index: u32,
    /// Human-readable name
    pub name: String,
}

impl SourceInfo {
    /// Create a new source info
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.index, self.name)
    }
}

/// Lifecycle state of the device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// No device open
    #[default]
    Disabled,
    /// Capture task spawned, waiting for its startup report
    Opening,
    /// Capture task running
    Active,
    /// Stop requested, waiting for the acknowledgement
    Closing,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Opening => write!(f, "opening"),
            Self::Active => write!(f, "active"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Notifications emitted by the device manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A discovery pass found a device that was not in the catalog
    Discovered(SourceInfo),
    /// A session started successfully
    Opened(SourceInfo),
    /// A session was closed by the caller
    Closed(SourceInfo),
    /// The capture loop died on a read failure while the session was active
    CaptureFailed {
        /// Device that failed
        source: SourceInfo,
        /// What went wrong
        reason: String,
    },
    /// Close gave up waiting for the capture task
    StopTimedOut(SourceInfo),
}
