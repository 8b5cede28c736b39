//! The polling loop that drives live OCR.

use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::EngineInner;
use crate::targets::TargetResolver;

/// Run scan iterations until cancelled or until the consecutive-error
/// threshold is hit. Every wait in here races the cancellation token, so
/// stop requests take effect immediately instead of after a full interval.
pub(crate) async fn poll_loop(engine: Arc<EngineInner>, cancel: CancellationToken) {
    let (_, initial) = engine.snapshot().await;
    let mut targets = TargetResolver::new(&initial, engine.screen_size());
    let mut consecutive_errors = 0u32;

    while !cancel.is_cancelled() {
        let wait = match engine.scan_once(&mut targets).await {
            Ok(interval) => {
                consecutive_errors = 0;
                interval
            }
            Err(error) => {
                consecutive_errors += 1;
                tracing::warn!(%error, consecutive_errors, "scan iteration failed");
                engine.notify_scan_error();
                if consecutive_errors >= engine.options().error_threshold {
                    tracing::error!(
                        consecutive_errors,
                        "giving up on live OCR after repeated failures"
                    );
                    engine.announce_terminal_stop();
                    return;
                }
                backoff_delay(
                    engine.options().backoff_base,
                    engine.options().backoff_cap,
                    consecutive_errors,
                )
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

/// `min(cap, base * 2^errors)`.
pub(crate) fn backoff_delay(base: Duration, cap: Duration, errors: u32) -> Duration {
    let factor = 2u32.saturating_pow(errors.min(16));
    cmp::min(cap, base.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let base = Duration::from_millis(500);
        let cap = Duration::from_secs(8);
        assert_eq!(backoff_delay(base, cap, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, cap, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, cap, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, cap, 4), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, cap, 10), cap);
        assert_eq!(backoff_delay(base, cap, u32::MAX), cap);
    }
}
