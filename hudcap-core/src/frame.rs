//! Shared frame buffer and region extraction
//!
//! The capture task publishes whole frames by swapping an `Arc`; readers
//! load the current frame and copy regions out of it. A reader can see a
//! frame that is one publish behind, but never a half-written one.

use arc_swap::ArcSwapOption;
use image::{GenericImageView, Rgba, RgbaImage};
use std::sync::Arc;
use tracing::trace;

use crate::error::{CaptureError, Result};
use crate::types::{Rect, Resolution};

/// Colour of the placeholder shown when no device is active
const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([24, 24, 32, 255]);

/// Last captured frame, shared by the capture task and readers
pub struct FrameBuffer {
    /// Current frame, None while no session is delivering
    current: ArcSwapOption<RgbaImage>,
    /// Resolution every frame must have
    main_resolution: Resolution,
    /// Image shown by renderers while empty
    placeholder: Arc<RgbaImage>,
}

impl FrameBuffer {
    /// Create an empty buffer for frames of `main_resolution`
    pub fn new(main_resolution: Resolution) -> Self {
        let placeholder = RgbaImage::from_pixel(
            main_resolution.width,
            main_resolution.height,
            PLACEHOLDER_COLOR,
        );
        Self::with_placeholder(main_resolution, placeholder)
    }

    /// Create an empty buffer with a custom placeholder image
    pub fn with_placeholder(main_resolution: Resolution, placeholder: RgbaImage) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            main_resolution,
            placeholder: Arc::new(placeholder),
        }
    }

    /// Resolution regions are validated against
    pub fn main_resolution(&self) -> Resolution {
        self.main_resolution
    }

    /// Replace the current frame, returning the previous one
    pub fn publish(&self, frame: Arc<RgbaImage>) -> Option<Arc<RgbaImage>> {
        self.current.swap(Some(frame))
    }

    /// Drop the current frame and go back to the placeholder state
    pub fn reset(&self) {
        trace!("Frame buffer reset");
        self.current.store(None);
    }

    /// Clear the buffer if `frame` is still the current frame
    ///
    /// Lets a stopping capture task take back a frame it published after
    /// its session was reset, without touching a newer session's frame.
    pub fn retract(&self, frame: &Arc<RgbaImage>) -> bool {
        let previous = self.current.compare_and_swap(frame, None);
        match &*previous {
            Some(current) => Arc::ptr_eq(current, frame),
            None => false,
        }
    }

    /// Whether the buffer holds no frame
    pub fn is_empty(&self) -> bool {
        self.current.load().is_none()
    }

    /// Snapshot of the current frame
    pub fn latest(&self) -> Option<Arc<RgbaImage>> {
        self.current.load_full()
    }

    /// Current frame, or the placeholder while empty
    pub fn display(&self) -> Arc<RgbaImage> {
        self.latest().unwrap_or_else(|| Arc::clone(&self.placeholder))
    }

    /// Copy of the full frame
    pub fn capture(&self) -> Result<Option<RgbaImage>> {
        self.capture_rect(self.main_resolution.bounds())
    }

    /// Copy of one region of the frame
    ///
    /// Returns `Ok(None)` while no frame is available. The region must lie
    /// inside both the main resolution and the current frame.
    pub fn capture_rect(&self, rect: Rect) -> Result<Option<RgbaImage>> {
        let main = self.main_resolution.bounds();
        if !rect.is_within(&main) {
            return Err(CaptureError::bounds(rect, main));
        }

        let Some(frame) = self.latest() else {
            return Ok(None);
        };

        let (width, height) = frame.dimensions();
        let frame_bounds = Rect::new(0, 0, width, height);
        if !rect.is_within(&frame_bounds) {
            return Err(CaptureError::bounds(rect, frame_bounds));
        }
        if rect.is_empty() {
            return Ok(Some(RgbaImage::new(rect.width, rect.height)));
        }

        let region = frame
            .view(rect.x, rect.y, rect.width, rect.height)
            .to_image();
        Ok(Some(region))
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("main_resolution", &self.main_resolution)
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }))
    }

    #[test]
    fn test_empty_buffer_returns_none() {
        let buffer = FrameBuffer::new(Resolution::new(64, 48));
        assert!(buffer.is_empty());
        assert!(buffer.capture().unwrap().is_none());
        assert!(buffer.capture_rect(Rect::new(0, 0, 8, 8)).unwrap().is_none());
    }

    #[test]
    fn test_region_has_requested_size_and_content() {
        let buffer = FrameBuffer::new(Resolution::new(64, 48));
        buffer.publish(filled(64, 48));

        let region = buffer.capture_rect(Rect::new(10, 5, 20, 7)).unwrap().unwrap();
        assert_eq!(region.dimensions(), (20, 7));
        assert_eq!(region.get_pixel(0, 0), &Rgba([10, 5, 0, 255]));
        assert_eq!(region.get_pixel(19, 6), &Rgba([29, 11, 0, 255]));
    }

    #[test]
    fn test_full_capture_matches_main_resolution() {
        let buffer = FrameBuffer::new(Resolution::new(32, 16));
        buffer.publish(filled(32, 16));
        let frame = buffer.capture().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (32, 16));
    }

    #[test]
    fn test_rect_outside_main_resolution_is_rejected() {
        let buffer = FrameBuffer::new(Resolution::new(64, 48));
        buffer.publish(filled(64, 48));

        let requested = Rect::new(60, 0, 10, 10);
        match buffer.capture_rect(requested) {
            Err(CaptureError::Bounds { requested: r, bounds }) => {
                assert_eq!(r, requested);
                assert_eq!(bounds, Rect::new(0, 0, 64, 48));
            }
            other => panic!("expected bounds error, got {:?}", other),
        }
    }

    #[test]
    fn test_rect_outside_main_resolution_is_rejected_while_empty() {
        let buffer = FrameBuffer::new(Resolution::new(64, 48));
        assert!(buffer.capture_rect(Rect::new(0, 0, 65, 1)).is_err());
    }

    #[test]
    fn test_rect_outside_frame_is_rejected() {
        let buffer = FrameBuffer::new(Resolution::new(64, 48));
        buffer.publish(filled(32, 24));

        let err = buffer.capture_rect(Rect::new(0, 0, 40, 10)).unwrap_err();
        assert!(err.to_string().contains("(0,0)-(32,24)"));
    }

    #[test]
    fn test_reset_and_display_placeholder() {
        let buffer = FrameBuffer::new(Resolution::new(8, 8));
        buffer.publish(filled(8, 8));
        assert!(!buffer.is_empty());

        buffer.reset();
        assert!(buffer.is_empty());
        let shown = buffer.display();
        assert_eq!(shown.get_pixel(0, 0), &PLACEHOLDER_COLOR);
    }

    #[test]
    fn test_publish_returns_previous_frame() {
        let buffer = FrameBuffer::new(Resolution::new(8, 8));
        assert!(buffer.publish(filled(8, 8)).is_none());
        let previous = buffer.publish(filled(8, 8)).unwrap();
        assert_eq!(Arc::strong_count(&previous), 1);
    }

    #[test]
    fn test_retract_only_clears_own_frame() {
        let buffer = FrameBuffer::new(Resolution::new(8, 8));
        let stale = filled(8, 8);
        buffer.publish(Arc::clone(&stale));
        assert!(buffer.retract(&stale));
        assert!(buffer.is_empty());
        assert!(!buffer.retract(&stale));

        let newer = filled(8, 8);
        buffer.publish(Arc::clone(&newer));
        assert!(!buffer.retract(&stale));
        assert!(Arc::ptr_eq(&buffer.latest().unwrap(), &newer));
    }
}
