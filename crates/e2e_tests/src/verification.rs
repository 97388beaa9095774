//! Collecting validator findings without stopping at the first mismatch.

use std::fmt::Debug;

#[cfg(test)]
#[path = "verification_tests.rs"]
mod tests;

/// Outcome of a validator run.
///
/// Validators record every mismatch so a failing test reports all of them at
/// once; tests then call [`into_result`](Self::into_result) or assert on
/// [`passed`](Self::passed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub passed: bool,
    pub failures: Vec<String>,
}

impl Default for Verification {
    fn default() -> Self {
        Self::new()
    }
}

impl Verification {
    pub fn new() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.passed = false;
        self.failures.push(message.into());
    }

    /// Records `message` unless `condition` holds.
    pub fn check(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.fail(message);
        }
    }

    /// Records a mismatch between `expected` and `actual`.
    pub fn check_eq<T>(&mut self, what: &str, expected: T, actual: T)
    where
        T: PartialEq + Debug,
    {
        if expected != actual {
            self.fail(format!("{what}: expected {expected:?}, got {actual:?}"));
        }
    }

    pub fn merge(&mut self, other: Verification) {
        self.passed &= other.passed;
        self.failures.extend(other.failures);
    }

    /// Converts into an error listing every failure.
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.passed {
            return Ok(());
        }
        anyhow::bail!("Verification failed:\n  - {}", self.failures.join("\n  - "))
    }
}
