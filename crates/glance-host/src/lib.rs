//! Accessibility-host capabilities, as interfaces.
//!
//! The host owns focus tracking and speech output. `Ok(None)` from a
//! location query means the object exists but has no usable rectangle
//! right now; `Err` means the query itself failed.

use anyhow::Result;
use glance_types::Rect;

/// Answers "where is ...?" questions about the accessibility tree.
pub trait FocusOracle: Send + Sync {
    /// Rectangle of the object under the review/navigator cursor.
    fn navigator_rect(&self) -> Result<Option<Rect>>;

    /// Rectangle of the foreground window.
    fn foreground_rect(&self) -> Result<Option<Rect>>;

    /// Rectangle of the control holding input focus.
    fn focus_rect(&self) -> Result<Option<Rect>>;

    /// Identifier of the foreground application, if one can be determined.
    fn foreground_app(&self) -> Option<String>;
}

/// Fire-and-forget user feedback. Implementations must be callable from
/// any thread and must never block the caller on speech output.
pub trait Announcer: Send + Sync {
    /// Speak a message.
    fn say(&self, text: &str);

    /// Play a short tone.
    fn tone(&self, freq_hz: u32, duration_ms: u32);
}
