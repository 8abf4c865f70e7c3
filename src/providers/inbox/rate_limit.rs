//! Client-side pacing for upstream API calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between successive calls through one client.
///
/// The upstream imposes a burst limit; a fixed inter-call interval is the
/// only throttling mechanism in the crate. There are no retries, so the
/// limiter never needs backoff state — just the last call time.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum inter-call interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until the interval since the previous call has elapsed, then
    /// stamps the current time.
    ///
    /// The first call returns immediately. Holding the lock across the
    /// sleep keeps concurrent callers strictly serialized, which is what
    /// the shared-channel model requires.
    pub async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let before = Instant::now();
        limiter.pace().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_out_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.pace().await;

        let before = Instant::now();
        limiter.pace().await;
        assert!(Instant::now() - before >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_counts_toward_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.pace().await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        let before = Instant::now();
        limiter.pace().await;

        let waited = Instant::now() - before;
        assert!(waited >= Duration::from_millis(200));
        assert!(waited < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_after_interval_has_passed() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.pace().await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        let before = Instant::now();
        limiter.pace().await;
        assert_eq!(Instant::now(), before);
    }
}
