//! Frame value type
//!
//! A frame is one captured image plus its capture timestamp. Frames are
//! immutable once produced; the pixel buffer is reference-counted so cloning
//! a frame into the clip buffer or an analysis job never copies image data.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// One captured image with its capture timestamp
#[derive(Clone)]
pub struct Frame {
    pixels: Arc<[u8]>,
    captured_at: Instant,
}

impl Frame {
    /// Create a frame from raw pixel data captured at the given instant
    pub fn new(pixels: impl Into<Arc<[u8]>>, captured_at: Instant) -> Self {
        Self {
            pixels: pixels.into(),
            captured_at,
        }
    }

    /// Raw pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// When the frame was captured
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bytes", &self.pixels.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
