//! Mapping logical targets to live screen rectangles.

use glance_config::OcrSettings;
use glance_core::crop;
use glance_host::FocusOracle;
use glance_types::{Rect, ScreenSize, TargetKind};

/// Rectangles for the four logical targets, with last-known-good fallback.
///
/// Owned by the polling worker; nothing else reads or writes it.
pub struct TargetResolver {
    last: [Rect; 4],
}

impl TargetResolver {
    /// Every target starts out as the cropped whole screen, so the first
    /// iterations have something sane to fall back on.
    pub fn new(settings: &OcrSettings, screen: ScreenSize) -> Self {
        let initial = crop::crop_rect(screen.bounds(), settings.crop(), screen);
        Self { last: [initial; 4] }
    }

    /// Recompute all four rectangles from one configuration snapshot.
    ///
    /// A target whose object currently has no location keeps its previous
    /// rectangle; the whole-screen target is always recomputed. If any
    /// location query errors, the entire set reverts to the last-known-good
    /// rectangles, so one scan never mixes rectangle generations.
    pub fn rebuild(
        &mut self,
        settings: &OcrSettings,
        focus: &dyn FocusOracle,
        screen: ScreenSize,
    ) -> [Rect; 4] {
        let margins = settings.crop();
        let mut next = self.last;
        next[TargetKind::Screen.index()] = crop::crop_rect(screen.bounds(), margins, screen);

        let queries = [
            (TargetKind::Navigator, focus.navigator_rect()),
            (TargetKind::Window, focus.foreground_rect()),
            (TargetKind::Focus, focus.focus_rect()),
        ];
        for (target, result) in queries {
            match result {
                Ok(Some(rect)) => {
                    next[target.index()] = crop::crop_rect(rect, margins, screen);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(?target, %error, "location query failed, keeping previous rectangles");
                    return self.last;
                }
            }
        }
        self.last = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use std::sync::Mutex;

    struct StubOracle {
        navigator: Mutex<Result<Option<Rect>>>,
        foreground: Mutex<Result<Option<Rect>>>,
        focus: Mutex<Result<Option<Rect>>>,
    }

    impl StubOracle {
        fn new() -> Self {
            Self {
                navigator: Mutex::new(Ok(None)),
                foreground: Mutex::new(Ok(None)),
                focus: Mutex::new(Ok(None)),
            }
        }
    }

    fn take(slot: &Mutex<Result<Option<Rect>>>) -> Result<Option<Rect>> {
        std::mem::replace(&mut *slot.lock().unwrap(), Ok(None))
    }

    impl FocusOracle for StubOracle {
        fn navigator_rect(&self) -> Result<Option<Rect>> {
            take(&self.navigator)
        }
        fn foreground_rect(&self) -> Result<Option<Rect>> {
            take(&self.foreground)
        }
        fn focus_rect(&self) -> Result<Option<Rect>> {
            take(&self.focus)
        }
        fn foreground_app(&self) -> Option<String> {
            None
        }
    }

    const SCREEN: ScreenSize = ScreenSize {
        width: 1000,
        height: 500,
    };

    #[test]
    fn available_targets_update_and_stick() {
        let oracle = StubOracle::new();
        *oracle.foreground.lock().unwrap() = Ok(Some(Rect::new(100, 100, 400, 200)));
        let settings = OcrSettings::default();
        let mut resolver = TargetResolver::new(&settings, SCREEN);

        let rects = resolver.rebuild(&settings, &oracle, SCREEN);
        assert_eq!(rects[TargetKind::Window.index()], Rect::new(100, 100, 400, 200));
        assert_eq!(rects[TargetKind::Screen.index()], SCREEN.bounds());

        // Window location gone: its rectangle is retained from last time.
        let rects = resolver.rebuild(&settings, &oracle, SCREEN);
        assert_eq!(rects[TargetKind::Window.index()], Rect::new(100, 100, 400, 200));
    }

    #[test]
    fn query_error_reverts_the_whole_set() {
        let oracle = StubOracle::new();
        *oracle.foreground.lock().unwrap() = Ok(Some(Rect::new(100, 100, 400, 200)));
        let settings = OcrSettings::default();
        let mut resolver = TargetResolver::new(&settings, SCREEN);
        let first = resolver.rebuild(&settings, &oracle, SCREEN);

        // Next round: navigator errors while the window moved. The move
        // must not be visible, not even partially.
        *oracle.navigator.lock().unwrap() = Err(anyhow!("object disappeared"));
        *oracle.foreground.lock().unwrap() = Ok(Some(Rect::new(0, 0, 50, 50)));
        let rects = resolver.rebuild(&settings, &oracle, SCREEN);
        assert_eq!(rects, first);
    }

    #[test]
    fn crop_margins_apply_to_every_target() {
        let oracle = StubOracle::new();
        *oracle.focus.lock().unwrap() = Ok(Some(Rect::new(0, 0, 200, 100)));
        let settings = OcrSettings {
            crop_left: 50,
            ..OcrSettings::default()
        };
        let mut resolver = TargetResolver::new(&settings, SCREEN);
        let rects = resolver.rebuild(&settings, &oracle, SCREEN);
        assert_eq!(rects[TargetKind::Focus.index()], Rect::new(100, 0, 100, 100));
        assert_eq!(
            rects[TargetKind::Screen.index()],
            Rect::new(500, 0, 500, 500)
        );
    }
}
