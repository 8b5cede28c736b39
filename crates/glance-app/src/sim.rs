//! A scripted desktop standing in for the real host.
//!
//! Capture and recognition form a loopback pair: capturing a rectangle
//! packs the text of every window it touches into the pixel buffer, and
//! "recognition" unpacks it again. That exercises the whole engine
//! pipeline without a screen or an OCR backend.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;

use glance_host::{Announcer, FocusOracle};
use glance_ocr::{PixelBuffer, Recognizer, ScreenCapture};
use glance_types::{Rect, ScreenSize};

pub struct SimWindow {
    pub app: String,
    pub rect: Rect,
    pub text: String,
}

struct SimState {
    windows: Vec<SimWindow>,
    focused: Option<usize>,
}

pub struct SimScreen {
    screen: ScreenSize,
    state: Mutex<SimState>,
}

impl SimScreen {
    pub fn new(screen: ScreenSize) -> Arc<Self> {
        let width = screen.width;
        let height = screen.height;
        let windows = vec![
            SimWindow {
                app: "editor".to_string(),
                rect: Rect::new(0, 0, width / 2, height),
                text: "fn main() { println!(\"hello\"); }".to_string(),
            },
            SimWindow {
                app: "terminal".to_string(),
                rect: Rect::new(width as i32 / 2, 0, width / 2, height / 2),
                text: "$ cargo build\n   Compiling glance".to_string(),
            },
            SimWindow {
                app: "browser".to_string(),
                rect: Rect::new(width as i32 / 2, height as i32 / 2, width / 2, height / 2),
                text: "Welcome to the documentation".to_string(),
            },
        ];
        Arc::new(Self {
            screen,
            state: Mutex::new(SimState {
                windows,
                focused: Some(0),
            }),
        })
    }

    /// Bring the named window to the front. Returns its app name on success.
    pub fn focus(&self, app: &str) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        let index = state.windows.iter().position(|window| window.app == app)?;
        state.focused = Some(index);
        Some(state.windows[index].app.clone())
    }

    /// Replace the text shown in the named window.
    pub fn set_text(&self, app: &str, text: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.windows.iter_mut().find(|window| window.app == app) {
            Some(window) => {
                window.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn app_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .windows
            .iter()
            .map(|window| window.app.clone())
            .collect()
    }

    fn visible_text(&self, rect: Rect) -> String {
        let state = self.state.lock().unwrap();
        state
            .windows
            .iter()
            .filter(|window| intersects(window.rect, rect))
            .map(|window| window.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn focused_rect(&self) -> Option<Rect> {
        let state = self.state.lock().unwrap();
        state.focused.map(|index| state.windows[index].rect)
    }
}

fn intersects(a: Rect, b: Rect) -> bool {
    a.left < b.right() && b.left < a.right() && a.top < b.bottom() && b.top < a.bottom()
}

impl ScreenCapture for SimScreen {
    fn capture(&self, rect: Rect) -> Result<PixelBuffer> {
        let text = self.visible_text(rect);
        Ok(PixelBuffer::new(text.into_bytes(), rect.width, rect.height))
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }
}

#[async_trait]
impl Recognizer for SimScreen {
    async fn recognize(&self, pixels: PixelBuffer, _rect: Rect) -> Result<String> {
        String::from_utf8(pixels.data).context("pixel buffer did not decode to text")
    }
}

impl FocusOracle for SimScreen {
    fn navigator_rect(&self) -> Result<Option<Rect>> {
        Ok(self.focused_rect())
    }

    fn foreground_rect(&self) -> Result<Option<Rect>> {
        Ok(self.focused_rect())
    }

    fn focus_rect(&self) -> Result<Option<Rect>> {
        Ok(self.focused_rect())
    }

    fn foreground_app(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.focused.map(|index| state.windows[index].app.clone())
    }
}

/// Speech and tones on stdout.
pub struct Speech;

impl Announcer for Speech {
    fn say(&self, text: &str) {
        println!("[glance] {text}");
        tracing::debug!(text, "announced");
    }

    fn tone(&self, freq_hz: u32, duration_ms: u32) {
        println!("[tone {freq_hz} Hz, {duration_ms} ms]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_recognize_loopback_returns_window_text() {
        let sim = SimScreen::new(ScreenSize::new(1000, 500));
        let pixels = sim.capture(Rect::new(0, 0, 100, 100)).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let text = runtime
            .block_on(sim.recognize(pixels, Rect::new(0, 0, 100, 100)))
            .unwrap();
        assert!(text.contains("fn main"));
    }

    #[test]
    fn focus_moves_between_windows() {
        let sim = SimScreen::new(ScreenSize::new(1000, 500));
        assert_eq!(sim.foreground_app().as_deref(), Some("editor"));
        assert_eq!(sim.focus("terminal").as_deref(), Some("terminal"));
        assert_eq!(sim.foreground_app().as_deref(), Some("terminal"));
        assert_eq!(sim.focus("unknown"), None);
    }

    #[test]
    fn off_window_capture_is_empty() {
        let sim = SimScreen::new(ScreenSize::new(1000, 500));
        let rect = sim.focused_rect().unwrap();
        assert_eq!(rect, Rect::new(0, 0, 500, 500));
        let pixels = sim.capture(Rect::new(0, 0, 0, 0)).unwrap();
        assert!(pixels.data.is_empty());
    }
}
