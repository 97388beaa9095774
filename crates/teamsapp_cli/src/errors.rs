//! Error types for CLI invocations.

use std::time::Duration;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while running an external command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The shell could not be started.
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command did not finish in time and was killed.
    #[error("Command `{command}` killed due to timeout {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// A file operation around a command (e.g. renaming a scaffolded folder) failed.
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// The command exited with a non-zero code.
    ///
    /// Negative tests match expected error text against `stdout` and `stderr`.
    #[error("Command `{command}` failed with exit code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
}

impl Error {
    /// Reports whether the error message or the captured output contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        if self.to_string().contains(needle) {
            return true;
        }
        match self {
            Error::Failed { stdout, stderr, .. } => {
                stdout.contains(needle) || stderr.contains(needle)
            }
            _ => false,
        }
    }
}
