// src/ingest/retry.rs
use std::future::Future;
use std::time::Duration;

use crate::error::AggregateError;

/// Upper bound on attempts regardless of configuration.
pub const MAX_ATTEMPTS_CAP: u32 = 4;

/// Exponential backoff policy wrapped around a single-call primitive.
///
/// Delay before attempt `n + 1` is `base_delay * 2^(n - 1)`, clamped to `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable: fn(&AggregateError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS_CAP,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            retryable: AggregateError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CAP),
            base_delay,
            ..Self::default()
        }
    }

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_predicate(mut self, retryable: fn(&AggregateError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Backoff to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AggregateError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AggregateError>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt >= max || !(self.retryable)(&e) {
                        return Err(e);
                    }
                    let wait = self.delay_for(attempt);
                    tracing::debug!(target: "ingest", attempt, wait_ms = wait.as_millis() as u64, error = %e, "retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_each_attempt() {
        let p = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn delay_is_clamped() {
        let p = RetryPolicy::new(4, Duration::from_secs(5)).with_max_delay(Duration::from_secs(6));
        assert_eq!(p.delay_for(3), Duration::from_secs(6));
    }

    #[test]
    fn attempts_are_capped() {
        assert_eq!(RetryPolicy::new(10, Duration::ZERO).max_attempts, MAX_ATTEMPTS_CAP);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::new(4, Duration::from_millis(1));
        let out = p
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AggregateError::network("https://x.test", "503"))
                    } else {
                        Ok("body")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::new(3, Duration::from_millis(1));
        let res: Result<(), _> = p
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AggregateError::network("https://x.test", "timeout")) }
            })
            .await;
        assert!(matches!(res, Err(AggregateError::Network { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn custom_predicate_limits_retries_to_server_errors() {
        fn server_errors_only(e: &AggregateError) -> bool {
            matches!(e, AggregateError::Network { status: Some(s), .. } if *s >= 500)
        }
        let p = RetryPolicy::new(4, Duration::from_millis(1)).with_predicate(server_errors_only);

        let calls = AtomicU32::new(0);
        let res: Result<(), _> = p
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AggregateError::Network {
                        url: "https://x.test".into(),
                        status: Some(404),
                        reason: "HTTP 404".into(),
                    })
                }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let res: Result<(), _> = p
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AggregateError::Network {
                        url: "https://x.test".into(),
                        status: Some(502),
                        reason: "HTTP 502".into(),
                    })
                }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::new(4, Duration::from_millis(1));
        let res: Result<(), _> = p
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AggregateError::parse("feed", "not xml")) }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
