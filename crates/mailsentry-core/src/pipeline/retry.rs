//! Explicit retry policy.
//!
//! Retry behavior is a value object passed to a generic wrapper, so it is
//! inspectable and testable independently of the task bodies it protects.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Exponential backoff policy with jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries` + 1).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Backoff multiplier per retry.
    pub multiplier: f64,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Random jitter as a fraction of the computed delay (0.25 = ±25%).
    pub jitter: f64,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(
        max_retries: u32,
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
        jitter: f64,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier,
            max_delay,
            jitter,
        }
    }

    /// Ingestion runs: transient provider trouble is common, so this is the
    /// most patient preset.
    #[must_use]
    pub const fn ingestion() -> Self {
        Self::new(
            5,
            Duration::from_secs(30),
            2.0,
            Duration::from_secs(600),
            0.25,
        )
    }

    /// Analysis runs.
    #[must_use]
    pub const fn analysis() -> Self {
        Self::new(
            3,
            Duration::from_secs(30),
            2.0,
            Duration::from_secs(300),
            0.25,
        )
    }

    /// Notification dispatch runs.
    #[must_use]
    pub const fn notification() -> Self {
        Self::new(
            3,
            Duration::from_secs(60),
            2.0,
            Duration::from_secs(300),
            0.25,
        )
    }

    /// Draft generation runs.
    #[must_use]
    pub const fn drafting() -> Self {
        Self::new(
            3,
            Duration::from_secs(30),
            2.0,
            Duration::from_secs(300),
            0.25,
        )
    }

    /// Delay before retry number `attempt` (0-based), with jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay.as_secs_f64() * self.multiplier.powi(attempt.min(16) as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter > 0.0 {
            let spread = capped * self.jitter;
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// How a retried operation ultimately failed.
#[derive(Debug)]
pub enum TaskFailure<E> {
    /// The error class is not retryable; no further attempts were made.
    Terminal(E),
    /// Every allowed attempt failed; the task is permanently failed.
    Exhausted {
        /// Total attempts made.
        attempts: u32,
        /// The final error.
        last: E,
    },
}

impl<E: std::fmt::Display> std::fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(e) => write!(f, "terminal failure: {e}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "failed after {attempts} attempts: {last}")
            }
        }
    }
}

/// Runs `op` under the policy, retrying only errors `retryable` accepts.
///
/// An operation that always fails retryably runs exactly
/// `policy.max_retries + 1` times, then converts to
/// [`TaskFailure::Exhausted`] — recorded by the caller, never raised
/// further.
///
/// # Errors
///
/// Returns [`TaskFailure::Terminal`] for non-retryable errors and
/// [`TaskFailure::Exhausted`] after the attempt budget is spent.
pub async fn run_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    retryable: P,
    mut op: F,
) -> Result<T, TaskFailure<E>>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !retryable(&e) => return Err(TaskFailure::Terminal(e)),
            Err(e) if attempt >= policy.max_retries => {
                return Err(TaskFailure::Exhausted {
                    attempts: attempt + 1,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {} failed ({e}), retrying in {:.1}s",
                    attempt + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), 2.0, Duration::from_millis(4), 0.0)
    }

    #[derive(Debug)]
    struct Transient;
    impl std::fmt::Display for Transient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("transient")
        }
    }

    #[tokio::test]
    async fn always_failing_runs_exactly_max_retries_plus_one() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast(3), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let Err(TaskFailure::Exhausted { attempts, .. }) = result else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn terminal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(&fast(5), |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(TaskFailure::Terminal(_))));
    }

    #[tokio::test]
    async fn success_after_failures_stops_retrying() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(&fast(5), |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Transient)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delays_grow_and_cap() {
        let policy = RetryPolicy::new(10, Duration::from_secs(30), 2.0, Duration::from_secs(600), 0.0);
        assert_eq!(policy.delay_for(0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(2), Duration::from_secs(120));
        // Capped at the ceiling from attempt 5 on.
        assert_eq!(policy.delay_for(5), Duration::from_secs(600));
        assert_eq!(policy.delay_for(9), Duration::from_secs(600));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(100), 1.0, Duration::from_secs(100), 0.25);
        for _ in 0..50 {
            let delay = policy.delay_for(0).as_secs_f64();
            assert!((75.0..=125.0).contains(&delay), "delay {delay} out of bounds");
        }
    }
}
