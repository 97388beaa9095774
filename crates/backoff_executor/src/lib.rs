//! Bounded retry of flaky async operations.
//!
//! Process invocations and cloud API calls made by the E2E suite fail
//! transiently: a CLI run times out, a REST call answers 429 or 5xx, or a
//! freshly created resource is not visible yet. This crate re-invokes such an
//! operation a bounded number of times, pausing between attempts according to a
//! [`RetryPolicy`], and hands the last error back untouched when the budget is
//! spent.
//!
//! ```
//! use backoff_executor::{retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
//! let value: Result<u32, String> = retry(&policy, "answer", || async { Ok(42) }).await;
//! assert_eq!(value, Ok(42));
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

pub mod policy;

pub use policy::{DelayPolicy, RetryPolicy};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// What the executor should do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the policy's delay.
    Retry,

    /// Retry after the delay suggested by the remote side.
    RetryAfter(Duration),

    /// Give up and return this error.
    Stop,
}

/// Errors that know whether they are worth retrying.
pub trait Retryable {
    fn retry_decision(&self) -> RetryDecision;
}

/// Runs `operation` until it succeeds or the policy is exhausted, retrying every error.
///
/// Returns the first success, or the error of the final attempt unchanged.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(policy, description, operation, |_| RetryDecision::Retry).await
}

/// Like [`retry`], but lets the error decide through [`Retryable`].
pub async fn retry_classified<T, E, F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + Retryable,
{
    retry_if(policy, description, operation, |e: &E| e.retry_decision()).await
}

/// Runs `operation` under `policy`, asking `classify` what to do after each failure.
///
/// * At most `policy.attempts()` invocations are made.
/// * Policy delays are capped at `policy.max_wait`.
/// * A [`RetryDecision::RetryAfter`] longer than `policy.max_wait` ends the
///   loop immediately with the current error.
/// * [`RetryDecision::Stop`] ends the loop immediately with the current error.
pub async fn retry_if<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    description: &str,
    mut operation: F,
    mut classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: FnMut(&E) -> RetryDecision,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1u32;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        "[Successfully] {} succeeded after retry",
                        description
                    );
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if attempt >= max_attempts {
            warn!(
                attempt = attempt,
                max_attempts = max_attempts,
                error = %error,
                "[Failed] {} failed on final attempt",
                description
            );
            return Err(error);
        }

        let delay = match classify(&error) {
            RetryDecision::Stop => {
                warn!(
                    attempt = attempt,
                    error = %error,
                    "[Failed] {} failed with a non-retryable error",
                    description
                );
                return Err(error);
            }
            RetryDecision::RetryAfter(suggested) if suggested > policy.max_wait => {
                warn!(
                    attempt = attempt,
                    suggested_ms = suggested.as_millis() as u64,
                    max_wait_ms = policy.max_wait.as_millis() as u64,
                    error = %error,
                    "[Failed] {} asked to wait longer than allowed, giving up",
                    description
                );
                return Err(error);
            }
            RetryDecision::RetryAfter(suggested) => suggested,
            RetryDecision::Retry => policy.delay_after(attempt),
        };

        warn!(
            attempt = attempt,
            max_attempts = max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "[Retry] {} failed",
            description
        );

        if !delay.is_zero() {
            sleep(delay).await;
        }
        attempt += 1;
        debug!(attempt = attempt, "Retrying {}", description);
    }
}
