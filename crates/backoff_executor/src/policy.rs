//! Retry policies: how many attempts to make and how long to pause between them.

use std::time::Duration;

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

/// Default number of attempts for a retried operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Default upper bound on any single pause.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// How the pause between two attempts is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// Retry immediately.
    None,

    /// The same pause after every failed attempt.
    Fixed(Duration),

    /// The pause grows with the attempt index: `base * attempt`.
    Linear {
        /// Interval multiplied by the 1-based index of the failed attempt.
        base: Duration,
    },
}

impl DelayPolicy {
    /// Returns the pause to take after the 1-based `attempt` has failed.
    ///
    /// For every policy the result is non-decreasing in `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            DelayPolicy::None => Duration::ZERO,
            DelayPolicy::Fixed(delay) => *delay,
            DelayPolicy::Linear { base } => base.saturating_mul(attempt.max(1)),
        }
    }
}

/// Bounds for a retried operation.
///
/// `max_attempts` counts every invocation including the first one, so a policy
/// with `max_attempts == 1` calls the operation exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of invocations allowed. Zero is treated as one.
    pub max_attempts: u32,

    /// Pause between consecutive attempts.
    pub delay: DelayPolicy,

    /// Longest single pause the executor will take.
    ///
    /// Computed delays are capped at this value. A server-suggested delay that
    /// exceeds it makes the executor give up instead of waiting.
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DelayPolicy::Fixed(DEFAULT_DELAY),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Policy with a constant pause between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayPolicy::Fixed(delay),
            ..Self::default()
        }
    }

    /// Policy whose pause grows linearly with the attempt index.
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayPolicy::Linear { base },
            ..Self::default()
        }
    }

    /// Policy that calls the operation once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: DelayPolicy::None,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Number of invocations the executor will actually make.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause after the 1-based `attempt` failed, capped at `max_wait`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delay.delay_after(attempt).min(self.max_wait)
    }
}
