//! Capture and recognition capabilities, as interfaces.
//!
//! The engine never talks to a real screen or OCR backend directly; it is
//! handed implementations of these traits. Anything that can hand over raw
//! pixels for a rectangle and asynchronously turn pixels into text can
//! drive the engine.

use anyhow::Result;
use async_trait::async_trait;
use glance_types::{Rect, ScreenSize};

/// Raw RGBA pixels for one captured rectangle.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// Grabs pixels from the screen.
pub trait ScreenCapture: Send + Sync {
    /// Capture the given screen rectangle.
    fn capture(&self, rect: Rect) -> Result<PixelBuffer>;

    /// Current screen dimensions in pixels.
    fn screen_size(&self) -> ScreenSize;
}

/// Turns pixels into text. Recognition may complete on any thread; callers
/// must not assume it finishes before the next capture starts.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize text in `pixels`, captured from `rect`.
    async fn recognize(&self, pixels: PixelBuffer, rect: Rect) -> Result<String>;
}
