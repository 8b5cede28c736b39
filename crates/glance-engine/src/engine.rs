//! The live OCR engine: configuration resolution, profile switching,
//! worker lifecycle, and the manually triggered spotlight scan.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use glance_config::{OcrSettings, SettingsOverrides};
use glance_core::AntiRepeat;
use glance_core::{crop, similarity};
use glance_host::{Announcer, FocusOracle};
use glance_ocr::{PixelBuffer, Recognizer, ScreenCapture};
use glance_profiles::{ProfileStore, settings_file};
use glance_types::{Point, Rect, ScanKey, ScreenSize};

use crate::options::EngineOptions;
use crate::targets::TargetResolver;
use crate::worker;

/// Profile name meaning "no overrides, global settings only".
pub const GLOBAL_PROFILE: &str = "global";

/// The profile the engine currently scans with. Mutated on focus change or
/// explicit profile actions, read once per scan iteration.
struct ActiveProfile {
    name: String,
    overrides: SettingsOverrides,
}

impl ActiveProfile {
    fn global() -> Self {
        Self {
            name: GLOBAL_PROFILE.to_string(),
            overrides: SettingsOverrides::default(),
        }
    }
}

struct RunState {
    worker: Option<(CancellationToken, JoinHandle<()>)>,
}

/// Rate limiter for spoken "OCR error" notifications, shared between the
/// polling worker and recognition tasks.
pub(crate) struct OcrErrorNotifier {
    announcer: Arc<dyn Announcer>,
    cooldown: Duration,
    last: StdMutex<Option<Instant>>,
}

impl OcrErrorNotifier {
    fn new(announcer: Arc<dyn Announcer>, cooldown: Duration) -> Self {
        Self {
            announcer,
            cooldown,
            last: StdMutex::new(None),
        }
    }

    pub(crate) fn notify(&self) {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let due = last.is_none_or(|at| now.duration_since(at) >= self.cooldown);
        if !due {
            return;
        }
        *last = Some(now);
        drop(last);
        self.announcer.say("OCR error");
    }
}

pub(crate) struct EngineInner {
    settings: RwLock<OcrSettings>,
    settings_path: PathBuf,
    store: ProfileStore,
    active: StdMutex<ActiveProfile>,
    anti_repeat: Arc<AntiRepeat>,
    capture: Arc<dyn ScreenCapture>,
    recognizer: Arc<dyn Recognizer>,
    focus: Arc<dyn FocusOracle>,
    announcer: Arc<dyn Announcer>,
    error_notifier: Arc<OcrErrorNotifier>,
    run: Mutex<RunState>,
    spotlight_anchor: StdMutex<Option<Point>>,
    options: EngineOptions,
}

/// Cheaply clonable handle; all state lives behind one shared inner.
#[derive(Clone)]
pub struct LiveOcrEngine {
    inner: Arc<EngineInner>,
}

impl LiveOcrEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: OcrSettings,
        settings_path: PathBuf,
        store: ProfileStore,
        capture: Arc<dyn ScreenCapture>,
        recognizer: Arc<dyn Recognizer>,
        focus: Arc<dyn FocusOracle>,
        announcer: Arc<dyn Announcer>,
        options: EngineOptions,
    ) -> Self {
        store.preload(&settings);
        let error_notifier = Arc::new(OcrErrorNotifier::new(
            Arc::clone(&announcer),
            options.error_announce_cooldown,
        ));
        let anti_repeat = Arc::new(AntiRepeat::new(
            options.anti_repeat_global_cap,
            options.anti_repeat_per_app_cap,
        ));
        Self {
            inner: Arc::new(EngineInner {
                settings: RwLock::new(settings),
                settings_path,
                store,
                active: StdMutex::new(ActiveProfile::global()),
                anti_repeat,
                capture,
                recognizer,
                focus,
                announcer,
                error_notifier,
                run: Mutex::new(RunState { worker: None }),
                spotlight_anchor: StdMutex::new(None),
                options,
            }),
        }
    }

    /// Start the live loop when stopped, stop it when running. Returns the
    /// new running state.
    ///
    /// The run lock makes rapid repeated toggles safe: there is never more
    /// than one worker. A worker that already exited on its own (error
    /// threshold) counts as stopped.
    pub async fn toggle(&self) -> bool {
        let inner = &self.inner;
        let mut run = inner.run.lock().await;
        if let Some((token, handle)) = run.worker.take() {
            if !handle.is_finished() {
                token.cancel();
                inner.join_worker(handle).await;
                inner.announcer.tone(222, 333);
                inner.announcer.say("live OCR stopped");
                tracing::info!("live OCR stopped by user");
                return false;
            }
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(worker::poll_loop(Arc::clone(inner), token.clone()));
        run.worker = Some((token, handle));
        inner.announcer.tone(444, 333);
        inner.announcer.say("live OCR started");
        tracing::info!("live OCR started");
        true
    }

    /// Stop the worker without user feedback; used on host shutdown.
    pub async fn shutdown(&self) {
        let mut run = self.inner.run.lock().await;
        if let Some((token, handle)) = run.worker.take() {
            token.cancel();
            self.inner.join_worker(handle).await;
        }
    }

    pub async fn is_running(&self) -> bool {
        match &self.inner.run.lock().await.worker {
            Some((_, handle)) => !handle.is_finished(),
            None => false,
        }
    }

    /// Switch the active profile to follow application focus.
    ///
    /// The newly focused application's anti-repeat memory is cleared so a
    /// stale previous text never suppresses its first announcement.
    pub async fn handle_focus_change(&self, app: &str) {
        let inner = &self.inner;
        if app.is_empty() || inner.options.ignored_apps.iter().any(|ignored| ignored == app) {
            return;
        }
        {
            let active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.name == app {
                return;
            }
        }
        let global = inner.settings.read().await.clone();
        let loaded = inner.store.load(app, &global);
        {
            let mut active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
            match loaded {
                Some(overrides) => {
                    tracing::info!(profile = %app, "switched to application profile");
                    active.name = app.to_string();
                    active.overrides = overrides;
                }
                None => {
                    tracing::info!(app, "no profile, scanning with global settings");
                    *active = ActiveProfile::global();
                }
            }
        }
        inner.anti_repeat.clear_app(app);
    }

    /// Validate and persist new global settings, then apply them in memory.
    /// On any failure the previous settings stay in effect.
    pub async fn update_global_settings(&self, new: OcrSettings) -> Result<()> {
        new.validate()?;
        settings_file::save_settings(&self.inner.settings_path, &new)
            .context("persisting global settings")?;
        *self.inner.settings.write().await = new;
        Ok(())
    }

    /// Persist `full` as the profile for `app`, storing only the values
    /// that differ from global, and make it the active profile. An empty
    /// difference still creates a (tracked) profile.
    pub async fn save_profile(&self, app: &str, full: &OcrSettings) -> Result<()> {
        full.validate()?;
        let inner = &self.inner;
        let global = inner.settings.read().await.clone();
        let overrides = SettingsOverrides::diff(full, &global);
        inner
            .store
            .save(app, &overrides)
            .with_context(|| format!("saving profile for {app}"))?;
        let mut active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.name = app.to_string();
        active.overrides = overrides;
        Ok(())
    }

    /// Delete the profile for `app` and fall back to global settings.
    pub fn reset_profile(&self, app: &str) -> Result<()> {
        let inner = &self.inner;
        inner
            .store
            .delete(app)
            .with_context(|| format!("deleting profile for {app}"))?;
        *inner.active.lock().unwrap_or_else(PoisonError::into_inner) = ActiveProfile::global();
        Ok(())
    }

    /// Record one corner of the manual scan zone. The second corner turns
    /// the pair into whole-screen percentages, stores them in the active
    /// profile and persists it.
    pub fn mark_spotlight_corner(&self, point: Point) {
        let inner = &self.inner;
        let first = {
            let mut anchor = inner
                .spotlight_anchor
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match anchor.take() {
                None => {
                    *anchor = Some(point);
                    None
                }
                Some(first) => Some(first),
            }
        };
        let Some(first) = first else {
            inner.announcer.say("start marker set");
            return;
        };

        let screen = inner.capture.screen_size();
        let margins = crop::margins_from_corners(first, point, screen);

        // A zone marked while no profile is active belongs to whatever
        // application is in the foreground.
        let app = {
            let active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
            (active.name != GLOBAL_PROFILE).then(|| active.name.clone())
        }
        .or_else(|| inner.focus.foreground_app());
        let Some(app) = app else {
            tracing::warn!("no application to attach the spotlight zone to");
            inner.announcer.say("no application to save the zone for");
            return;
        };

        let overrides = {
            let mut active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
            active.name = app.clone();
            active.overrides.set_spotlight_crop(margins);
            active.overrides.clone()
        };
        match inner.store.save(&app, &overrides) {
            Ok(()) => inner.announcer.say("spotlight zone saved"),
            Err(error) => {
                tracing::error!(%error, "failed to save spotlight zone");
                inner.announcer.say("could not save spotlight zone");
            }
        }
    }

    /// One immediate scan of the spotlight zone, outside the live loop.
    ///
    /// The zone is always relative to the whole screen. An undersized zone
    /// aborts with a message; there is no fallback rectangle here.
    pub async fn scan_spotlight(&self) {
        let inner = &self.inner;
        inner.announcer.say("scanning spotlight");

        let (_, cfg) = inner.snapshot().await;
        let screen = inner.capture.screen_size();
        let rect = crop::apply_margins(screen.bounds(), cfg.spotlight_crop(), screen);
        if rect.width < crop::MIN_DIMENSION || rect.height < crop::MIN_DIMENSION {
            tracing::warn!(?rect, "spotlight zone too small to scan");
            inner.announcer.say("invalid spotlight area");
            return;
        }

        let outcome: Result<String> = async {
            let pixels = inner
                .capture
                .capture(rect)
                .context("capturing spotlight zone")?;
            inner
                .recognizer
                .recognize(pixels, rect)
                .await
                .context("recognizing spotlight zone")
        }
        .await;

        match outcome {
            Ok(text) => {
                let text = similarity::clean_text(&text);
                if text.is_empty() {
                    inner.announcer.say("no text found");
                } else {
                    inner.announcer.say(&text);
                }
            }
            Err(error) => {
                tracing::error!(%error, "spotlight scan failed");
                inner.announcer.say("OCR error");
            }
        }
    }

    /// Name of the active profile ("global" when none).
    pub fn active_profile(&self) -> String {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .name
            .clone()
    }

    /// The (app, effective configuration) pair a scan started now would use.
    pub async fn snapshot(&self) -> (String, OcrSettings) {
        self.inner.snapshot().await
    }

    pub async fn global_settings(&self) -> OcrSettings {
        self.inner.settings.read().await.clone()
    }

    pub fn list_profiles(&self) -> Vec<String> {
        self.inner.store.list()
    }
}

impl EngineInner {
    /// One consistent (app, configuration) pair for a whole scan. The
    /// profile lock is held only long enough to copy the pair out.
    pub(crate) async fn snapshot(&self) -> (String, OcrSettings) {
        let global = self.settings.read().await.clone();
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        (active.name.clone(), active.overrides.apply(&global))
    }

    pub(crate) fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub(crate) fn screen_size(&self) -> ScreenSize {
        self.capture.screen_size()
    }

    pub(crate) fn notify_scan_error(&self) {
        self.error_notifier.notify();
    }

    pub(crate) fn announce_terminal_stop(&self) {
        self.announcer.tone(222, 333);
        self.announcer.say("live OCR stopped after repeated errors");
    }

    /// One scan iteration: snapshot, resolve targets, validate, capture,
    /// and hand the pixels to the recognizer. Returns the wait before the
    /// next iteration, taken from the same snapshot.
    ///
    /// An unscannable rectangle skips the capture without counting as a
    /// failure; only errors from the capture path itself bubble up.
    pub(crate) async fn scan_once(&self, targets: &mut TargetResolver) -> Result<Duration> {
        let (app, cfg) = self.snapshot().await;
        let screen = self.capture.screen_size();
        let rects = targets.rebuild(&cfg, self.focus.as_ref(), screen);
        let target = cfg.target;
        let rect = rects[target.index()];
        let interval = Duration::from_secs_f64(cfg.interval.clamp(0.0, 10.0));

        tracing::debug!(
            app = %app,
            ?target,
            ?rect,
            threshold = cfg.threshold,
            interval = cfg.interval,
            "scan iteration"
        );

        if rect.width < crop::MIN_DIMENSION
            || rect.height < crop::MIN_DIMENSION
            || !rect.contained_in(&screen.bounds())
        {
            tracing::debug!(?rect, "target rectangle not scannable, skipping iteration");
            return Ok(interval);
        }

        let pixels = self
            .capture
            .capture(rect)
            .context("capturing target rectangle")?;
        self.submit_recognition(pixels, rect, ScanKey::new(app, target), cfg.threshold);
        Ok(interval)
    }

    /// Run recognition on its own task so a slow recognizer never delays
    /// the next iteration. The result callback takes the anti-repeat
    /// decision under its lock and speaks after releasing it.
    fn submit_recognition(&self, pixels: PixelBuffer, rect: Rect, key: ScanKey, threshold: f64) {
        let recognizer = Arc::clone(&self.recognizer);
        let anti_repeat = Arc::clone(&self.anti_repeat);
        let announcer = Arc::clone(&self.announcer);
        let notifier = Arc::clone(&self.error_notifier);
        tokio::spawn(async move {
            match recognizer.recognize(pixels, rect).await {
                Ok(text) => {
                    if anti_repeat.should_speak(&key, &text, threshold) {
                        announcer.say(&text);
                    }
                    if anti_repeat.try_begin_eviction() {
                        let anti_repeat = Arc::clone(&anti_repeat);
                        tokio::task::spawn_blocking(move || anti_repeat.run_eviction());
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "recognition failed");
                    notifier.notify();
                }
            }
        });
    }

    async fn join_worker(&self, handle: JoinHandle<()>) {
        match tokio::time::timeout(self.options.stop_join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::error!(%error, "OCR worker task failed"),
            Err(_) => tracing::warn!("OCR worker did not stop in time"),
        }
    }
}
