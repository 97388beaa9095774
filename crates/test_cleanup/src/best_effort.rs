//! Running independent cleanup operations without letting one failure stop the rest.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, join_all};
use tracing::{error, info};

#[cfg(test)]
#[path = "best_effort_tests.rs"]
mod tests;

/// A named cleanup operation.
pub struct CleanupTask<'a> {
    name: String,
    future: BoxFuture<'a, anyhow::Result<()>>,
}

impl<'a> CleanupTask<'a> {
    pub fn new<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'a,
    {
        Self {
            name: name.into(),
            future: future.boxed(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of a [`run_best_effort`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub succeeded: Vec<String>,
    /// Task name and error message.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: CleanupReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Runs every task concurrently and waits for all of them.
///
/// Failures are logged and collected; they never cancel the other tasks and
/// never turn into an error for the caller.
pub async fn run_best_effort(tasks: Vec<CleanupTask<'_>>) -> CleanupReport {
    let outcomes = join_all(tasks.into_iter().map(|task| async move {
        let result = task.future.await;
        (task.name, result)
    }))
    .await;

    let mut report = CleanupReport::default();
    for (name, result) in outcomes {
        match result {
            Ok(()) => {
                info!(task = name, "[Successfully] {}", name);
                report.succeeded.push(name);
            }
            Err(e) => {
                error!(task = name, error = %e, "[Failed] {}", name);
                report.failed.push((name, format!("{e:#}")));
            }
        }
    }
    report
}
