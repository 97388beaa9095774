//! Running shell command lines with captured output, timeouts and retries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use backoff_executor::{retry, RetryPolicy};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::{Error, Result};

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

/// Where and how a command runs.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,

    /// Variables added to (or overriding) the inherited environment.
    pub env: HashMap<String, String>,

    /// The child is killed once this elapses. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured result of a command that exited with code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Runs `command` through the platform shell and waits for it.
///
/// # Errors
/// * `Error::Spawn` when the shell cannot be started.
/// * `Error::Timeout` when `options.timeout` elapses; the child is killed.
/// * `Error::Failed` when the command exits with a non-zero code.
#[instrument(skip(options), fields(cwd = ?options.cwd))]
pub async fn exec(command: &str, options: &ExecOptions) -> Result<CommandOutput> {
    let mut cmd = shell_command(command);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&options.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = command, "Executing command");
    let child = cmd.spawn().map_err(|source| Error::Spawn {
        command: command.to_string(),
        source,
    })?;

    let waited = match options.timeout {
        Some(limit) => match timeout(limit, child.wait_with_output()).await {
            Ok(waited) => waited,
            Err(_) => {
                // Dropping the wait future drops the child, which kills it.
                warn!(
                    command = command,
                    timeout_ms = limit.as_millis() as u64,
                    "Command {} killed due to timeout",
                    command
                );
                return Err(Error::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                });
            }
        },
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|source| Error::Spawn {
        command: command.to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    debug!(
        command = command,
        exit_code = exit_code,
        "Command completed"
    );

    if !output.status.success() {
        return Err(Error::Failed {
            command: command.to_string(),
            code: exit_code,
            stdout,
            stderr,
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
    })
}

/// Runs `command` under `policy`.
///
/// When `fallback` is given, every attempt after the first runs the fallback
/// command instead, e.g. a variant with extra flags that avoids a known
/// transient failure.
pub async fn exec_with_retry(
    command: &str,
    options: &ExecOptions,
    policy: &RetryPolicy,
    fallback: Option<&str>,
) -> Result<CommandOutput> {
    let mut attempt = 0u32;
    retry(policy, command, || {
        attempt += 1;
        let current = match fallback {
            Some(fallback) if attempt > 1 => fallback,
            _ => command,
        };
        exec(current, options)
    })
    .await
}
