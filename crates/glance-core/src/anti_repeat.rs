//! Per (application, target) memory of the last announced text, used to
//! suppress re-announcing content that has not meaningfully changed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glance_types::ScanKey;

use crate::similarity;

pub const DEFAULT_GLOBAL_CAP: usize = 100;
pub const DEFAULT_PER_APP_CAP: usize = 10;

/// Placeholder strings some recognizers emit for media-control chrome.
const RECOGNIZER_ARTIFACTS: &[&str] = &["Play"];

struct Entry {
    prev_text: String,
    touched: u64,
}

/// Bounded last-spoken-text store.
///
/// Decisions happen under one lock per call; announcing itself is the
/// caller's job and must happen after the call returns. Eviction is split
/// out ([`try_begin_eviction`](Self::try_begin_eviction) /
/// [`run_eviction`](Self::run_eviction)) so the caller can run it on a
/// separate task without holding up the decision path.
pub struct AntiRepeat {
    entries: Mutex<HashMap<ScanKey, Entry>>,
    evicting: AtomicBool,
    clock: AtomicU64,
    global_cap: usize,
    per_app_cap: usize,
}

impl AntiRepeat {
    pub fn new(global_cap: usize, per_app_cap: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            evicting: AtomicBool::new(false),
            clock: AtomicU64::new(0),
            global_cap,
            per_app_cap,
        }
    }

    pub fn with_default_caps() -> Self {
        Self::new(DEFAULT_GLOBAL_CAP, DEFAULT_PER_APP_CAP)
    }

    /// Decide whether `recognized` is new enough to announce for `key`,
    /// updating the stored text when it is.
    ///
    /// Empty text and recognizer artifacts never announce. Suppressed text
    /// leaves the stored previous text unchanged, so slow drift below the
    /// threshold stays suppressed until it accumulates into a real change.
    pub fn should_speak(&self, key: &ScanKey, recognized: &str, threshold: f64) -> bool {
        let text = similarity::clean_text(recognized);
        if text.is_empty() || RECOGNIZER_ARTIFACTS.contains(&text.as_str()) {
            return false;
        }

        let stamp = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            prev_text: String::new(),
            touched: stamp,
        });
        entry.touched = stamp;

        let ratio = similarity::ratio(&entry.prev_text, &text);
        if ratio < threshold {
            entry.prev_text = text;
            true
        } else {
            tracing::debug!(app = %key.app, ratio, "suppressing unchanged text");
            false
        }
    }

    /// Drop all entries belonging to `app`.
    pub fn clear_app(&self, app: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.app != app);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim the eviction slot if the store is over its global cap and no
    /// eviction is already running. The claimer must call
    /// [`run_eviction`](Self::run_eviction).
    pub fn try_begin_eviction(&self) -> bool {
        if self.len() <= self.global_cap {
            return false;
        }
        !self.evicting.swap(true, Ordering::AcqRel)
    }

    /// Trim to the caps: newest `per_app_cap` entries per application,
    /// then newest `global_cap` overall. Releases the eviction slot when
    /// done.
    pub fn run_eviction(&self) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();

        let mut by_app: HashMap<String, Vec<(ScanKey, u64)>> = HashMap::new();
        for (key, entry) in entries.iter() {
            by_app
                .entry(key.app.clone())
                .or_default()
                .push((key.clone(), entry.touched));
        }
        for (_, mut keys) in by_app {
            if keys.len() <= self.per_app_cap {
                continue;
            }
            keys.sort_by(|a, b| b.1.cmp(&a.1));
            for (key, _) in keys.drain(self.per_app_cap..) {
                entries.remove(&key);
            }
        }

        if entries.len() > self.global_cap {
            let mut all: Vec<(ScanKey, u64)> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.touched))
                .collect();
            all.sort_by(|a, b| b.1.cmp(&a.1));
            for (key, _) in all.drain(self.global_cap..) {
                entries.remove(&key);
            }
        }

        tracing::debug!(before, after = entries.len(), "evicted anti-repeat entries");
        drop(entries);
        self.evicting.store(false, Ordering::Release);
    }
}
