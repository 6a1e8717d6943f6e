use std::future::Future;
use std::time::{Duration, Instant};

use tracing::debug;

use super::error::ClientError;

/// Exponential backoff schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry; attempt 0 is the first retry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        exp.min(self.max_delay)
    }
}

/// Trips open after repeated failures so a dead server isn't hammered;
/// lets a probe request through once the cooldown elapses.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    failures: u32,
    opened_at: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker::new(5, Duration::from_secs(30))
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker {
            failure_threshold,
            cooldown,
            failures: 0,
            opened_at: None,
        }
    }

    pub fn allow(&self) -> bool {
        match self.opened_at {
            None => true,
            // Half-open: one request may probe after the cooldown.
            Some(opened) => opened.elapsed() >= self.cooldown,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.opened_at = None;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
        if self.failures >= self.failure_threshold {
            self.opened_at = Some(Instant::now());
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }
}

/// Runs `op`, retrying transient errors per `policy` and feeding results
/// into the breaker. Fatal and non-transient errors return immediately.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    breaker: &mut CircuitBreaker,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    if !breaker.allow() {
        return Err(ClientError::CircuitOpen);
    }

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                breaker.record_success();
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!("request failed ({}), retrying in {:?}", e, delay);
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_transient() {
                    breaker.record_failure();
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(10), Duration::from_millis(500));
    }

    #[test]
    fn breaker_opens_at_threshold() {
        let mut breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        assert!(breaker.allow());

        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.allow());
    }

    #[test]
    fn breaker_half_opens_after_cooldown() {
        let mut breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(breaker.allow(), "cooldown of zero half-opens immediately");

        breaker.record_success();
        assert!(!breaker.is_open());
    }

    #[rocket::async_test]
    async fn retry_gives_up_on_fatal_errors() {
        let policy = RetryPolicy::default();
        let mut breaker = CircuitBreaker::default();
        let mut calls = 0;

        let result: Result<(), _> = with_retry(&policy, &mut breaker, || {
            calls += 1;
            async { Err(ClientError::AlreadySwiped { interested: None }) }
        })
        .await;

        assert!(matches!(result, Err(ClientError::AlreadySwiped { .. })));
        assert_eq!(calls, 1, "fatal errors must not be retried");
    }

    #[rocket::async_test]
    async fn retry_recovers_from_transient_errors() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let mut breaker = CircuitBreaker::default();
        let mut calls = 0;

        let result = with_retry(&policy, &mut breaker, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(ClientError::Status { status: 503 })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert!(!breaker.is_open());
    }

    #[rocket::async_test]
    async fn open_breaker_short_circuits() {
        let policy = RetryPolicy::default();
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(600));
        breaker.record_failure();

        let result: Result<(), _> =
            with_retry(&policy, &mut breaker, || async { Ok(()) }).await;

        assert!(matches!(result, Err(ClientError::CircuitOpen)));
    }
}
