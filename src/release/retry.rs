//! Bounded retry with a fixed delay for artifact uploads.
//!
//! An operation gets `retries + 1` attempts. Between a failed attempt and
//! the next one the caller waits a fixed interval; there is no wait after
//! the final attempt and no backoff or jitter.

use crate::cli::RuntimeConfig;
use crate::error::{CrossbuildError, Result};
use std::future::Future;
use tokio::time::Duration;

/// Default number of additional attempts after the first one.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Highest accepted retry count.
pub const MAX_RETRIES: u32 = 20;

/// Retry behavior for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub retries: u32,
    /// Fixed pause between a failed attempt and the next
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy with `retries` additional attempts and the default delay.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Validate retry counts are reasonable
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.retries > MAX_RETRIES {
            return Err(format!(
                "retry count too high: {} (max: {})",
                self.retries, MAX_RETRIES
            ));
        }
        Ok(())
    }
}

/// All attempts failed.
#[derive(Debug)]
pub struct RetryExhausted {
    /// Attempts made
    pub attempts: u32,
    /// Error returned by the last attempt
    pub last_error: CrossbuildError,
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// `operation` receives the 1-based attempt number.
///
/// # Arguments
/// * `operation` - Async closure returning `Result<T>`
/// * `policy` - Attempt budget and delay
/// * `operation_name` - Human-readable name for logging
/// * `config` - Runtime config for user messaging
pub async fn retry_with_fixed_delay<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    operation_name: &str,
    config: &RuntimeConfig,
) -> std::result::Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                config.warning_println(&format!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, max_attempts, e
                ));
                config.indent(&format!("Retrying in {:.1}s...", policy.delay.as_secs_f64()));

                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn rejected() -> CrossbuildError {
        UploadError::Rejected {
            file: "promu-0.5.0.linux-amd64.tar.gz".to_string(),
            reason: "502 Bad Gateway".to_string(),
        }
        .into()
    }

    fn quiet() -> RuntimeConfig {
        RuntimeConfig::new(false, true)
    }

    /// Paused-clock timers fire on millisecond ticks.
    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_max_attempts_counts_first_try() {
        assert_eq!(RetryPolicy::with_retries(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
        assert_eq!(RetryPolicy::with_retries(u32::MAX).max_attempts(), u32::MAX);
    }

    #[test]
    fn test_validate_bounds() {
        assert!(RetryPolicy::with_retries(MAX_RETRIES).validate().is_ok());
        assert!(RetryPolicy::with_retries(MAX_RETRIES + 1).validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_with_fixed_delays() {
        let start = Instant::now();
        let attempt_times = Mutex::new(Vec::new());

        let result = retry_with_fixed_delay(
            |attempt| {
                attempt_times.lock().unwrap().push(start.elapsed());
                async move {
                    if attempt < 3 {
                        Err(rejected())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            &RetryPolicy::with_retries(2),
            "upload",
            &quiet(),
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        let attempt_times = attempt_times.lock().unwrap();
        assert_eq!(attempt_times.len(), 3);
        assert_near(attempt_times[0], Duration::ZERO);
        assert_near(attempt_times[1], Duration::from_secs(2));
        assert_near(attempt_times[2], Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_first_success() {
        let calls = Mutex::new(0u32);

        let result = retry_with_fixed_delay(
            |_| {
                *calls.lock().unwrap() += 1;
                async { Ok::<_, CrossbuildError>(()) }
            },
            &RetryPolicy::with_retries(5),
            "upload",
            &quiet(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_fails_immediately() {
        let start = Instant::now();
        let calls = Mutex::new(0u32);

        let result = retry_with_fixed_delay(
            |_| {
                *calls.lock().unwrap() += 1;
                async { Err::<(), _>(rejected()) }
            },
            &RetryPolicy::with_retries(0),
            "upload",
            &quiet(),
        )
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_near(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error_without_trailing_delay() {
        let start = Instant::now();

        let result = retry_with_fixed_delay(
            |attempt| async move {
                Err::<(), _>(CrossbuildError::from(UploadError::Rejected {
                    file: "a.tar.gz".to_string(),
                    reason: format!("attempt {}", attempt),
                }))
            },
            &RetryPolicy::with_retries(2),
            "upload",
            &quiet(),
        )
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.last_error.to_string().contains("attempt 3"));
        // two pauses, none after the final failure
        assert_near(start.elapsed(), Duration::from_secs(4));
    }
}
