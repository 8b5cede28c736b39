use std::time::Duration;

/// Tuning knobs for the live OCR engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Consecutive scan failures tolerated before the loop gives up.
    pub error_threshold: u32,
    /// First backoff wait after a failed iteration; doubles per failure.
    pub backoff_base: Duration,
    /// Upper bound on the backoff wait.
    pub backoff_cap: Duration,
    /// Minimum gap between spoken "OCR error" notifications.
    pub error_announce_cooldown: Duration,
    /// How long shutdown waits for the worker before giving up on it.
    pub stop_join_timeout: Duration,
    /// Applications whose focus events are ignored (the announcer itself).
    pub ignored_apps: Vec<String>,
    pub anti_repeat_global_cap: usize,
    pub anti_repeat_per_app_cap: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            error_announce_cooldown: Duration::from_secs(5),
            stop_join_timeout: Duration::from_secs(2),
            ignored_apps: vec!["glance".to_string()],
            anti_repeat_global_cap: glance_core::anti_repeat::DEFAULT_GLOBAL_CAP,
            anti_repeat_per_app_cap: glance_core::anti_repeat::DEFAULT_PER_APP_CAP,
        }
    }
}
