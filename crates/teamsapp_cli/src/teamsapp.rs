//! Typed wrapper around the `teamsapp` (and legacy `teamsfx`) command line.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use backoff_executor::RetryPolicy;
use tracing::{error, info, warn};

use crate::executor::{exec, exec_with_retry, CommandOutput, ExecOptions};
use crate::Result;

#[cfg(test)]
#[path = "teamsapp_tests.rs"]
mod tests;

/// Timeout applied to scaffolding and other short commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Which generation of the CLI to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CliFlavour {
    #[default]
    TeamsApp,
    TeamsFx,
}

impl CliFlavour {
    pub fn binary(&self) -> &'static str {
        match self {
            CliFlavour::TeamsApp => "teamsapp",
            CliFlavour::TeamsFx => "teamsfx",
        }
    }

    /// `teamsapp new` takes `--capability`; the legacy CLI took `--capabilities`.
    fn capability_flag(&self) -> &'static str {
        match self {
            CliFlavour::TeamsApp => "--capability",
            CliFlavour::TeamsFx => "--capabilities",
        }
    }
}

/// Project templates that `new` can scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Tab,
    SsoTab,
    TabSpfx,
    Bot,
    Notification,
    CommandBot,
    WorkflowBot,
    MessageExtension,
    AiBot,
    ApiPlugin,
    DeclarativeAgent,
}

impl Capability {
    pub fn as_cli_arg(&self) -> &'static str {
        match self {
            Capability::Tab => "tab-non-sso",
            Capability::SsoTab => "sso-launch-page",
            Capability::TabSpfx => "tab-spfx",
            Capability::Bot => "bot",
            Capability::Notification => "notification",
            Capability::CommandBot => "command-bot",
            Capability::WorkflowBot => "workflow-bot",
            Capability::MessageExtension => "message-extension",
            Capability::AiBot => "custom-copilot-basic",
            Capability::ApiPlugin => "api-plugin",
            Capability::DeclarativeAgent => "declarative-agent",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cli_arg())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgrammingLanguage {
    JavaScript,
    TypeScript,
    CSharp,
    Python,
}

impl ProgrammingLanguage {
    pub fn as_cli_arg(&self) -> &'static str {
        match self {
            ProgrammingLanguage::JavaScript => "javascript",
            ProgrammingLanguage::TypeScript => "typescript",
            ProgrammingLanguage::CSharp => "csharp",
            ProgrammingLanguage::Python => "python",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cli_arg())
    }
}

/// Joins non-empty parts with single spaces.
fn join_args(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drives the CLI for one test.
///
/// Lifecycle commands (`provision`, `deploy`, `publish`, ...) go through the
/// retry executor; scaffolding and queries run once with [`DEFAULT_TIMEOUT`].
#[derive(Debug, Clone)]
pub struct TeamsAppCli {
    flavour: CliFlavour,
    npx: bool,
    env: HashMap<String, String>,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl Default for TeamsAppCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamsAppCli {
    pub fn new() -> Self {
        Self {
            flavour: CliFlavour::default(),
            npx: false,
            env: HashMap::new(),
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_flavour(mut self, flavour: CliFlavour) -> Self {
        self.flavour = flavour;
        self
    }

    /// Runs the CLI through `npx` instead of the globally installed binary.
    pub fn with_npx(mut self, npx: bool) -> Self {
        self.npx = npx;
        self
    }

    /// Adds process environment overrides, e.g. feature flags.
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

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn flavour(&self) -> CliFlavour {
        self.flavour
    }

    /// Prefixes `args` with the CLI invocation.
    pub fn command_line(&self, args: &str) -> String {
        let npx = if self.npx { "npx" } else { "" };
        join_args(&[npx, self.flavour.binary(), args])
    }

    fn options(&self, cwd: &Path) -> ExecOptions {
        ExecOptions::new()
            .with_cwd(cwd)
            .with_envs(self.env.clone())
    }

    pub fn new_project_args(
        &self,
        app_name: &str,
        capability: Capability,
        language: Option<ProgrammingLanguage>,
        extra: &str,
    ) -> String {
        let language = language
            .map(|l| format!("--programming-language {l}"))
            .unwrap_or_default();
        join_args(&[
            "new --interactive false --app-name",
            app_name,
            self.flavour.capability_flag(),
            capability.as_cli_arg(),
            &language,
            extra,
        ])
    }

    pub fn new_sample_args(&self, sample: &str) -> String {
        format!("new sample {sample} --interactive false")
    }

    pub fn provision_args(&self, env: &str, extra: &str) -> String {
        join_args(&["provision --env", env, "--interactive false --verbose", extra])
    }

    pub fn deploy_args(&self, env: &str, extra: &str) -> String {
        join_args(&["deploy --env", env, "--interactive false --verbose", extra])
    }

    pub fn validate_args(&self, env: &str, extra: &str) -> String {
        join_args(&["validate --env", env, "--interactive false", extra])
    }

    pub fn package_args(&self, env: &str) -> String {
        join_args(&["package --env", env, "--interactive false"])
    }

    pub fn publish_args(&self, env: &str) -> String {
        join_args(&["publish --env", env, "--interactive false"])
    }

    pub fn env_add_args(&self, new_env: &str, source_env: &str) -> String {
        join_args(&["env add", new_env, "--env", source_env, "--interactive false"])
    }

    pub fn add_args(&self, feature: &str, extra: &str) -> String {
        join_args(&["add", feature, "--interactive false", extra])
    }

    pub fn entra_app_update_args(&self, env: &str, extra: &str) -> String {
        join_args(&["entra-app update --env", env, "--interactive false", extra])
    }

    pub fn permission_grant_args(&self, env: &str, email: &str) -> String {
        join_args(&[
            "permission grant --env",
            env,
            "--email",
            email,
            "--interactive false",
        ])
    }

    pub fn permission_status_args(&self, env: &str) -> String {
        join_args(&[
            "permission status --env",
            env,
            "--list-all-collaborators --interactive false",
        ])
    }

    /// Runs `args` once with the default timeout.
    ///
    /// Negative tests use this directly and assert on the returned error.
    pub async fn run_once(&self, args: &str, cwd: &Path) -> Result<CommandOutput> {
        let command = self.command_line(args);
        let options = self.options(cwd).with_timeout(self.timeout);
        let result = exec(&command, &options).await;
        log_outcome(&command, cwd, &result);
        result
    }

    /// Runs `args` under the retry policy, without a timeout.
    pub async fn run_with_retry(
        &self,
        args: &str,
        cwd: &Path,
        fallback_args: Option<&str>,
    ) -> Result<CommandOutput> {
        let command = self.command_line(args);
        let fallback = fallback_args.map(|f| self.command_line(f));
        let result = exec_with_retry(
            &command,
            &self.options(cwd),
            &self.retry_policy,
            fallback.as_deref(),
        )
        .await;
        log_outcome(&command, cwd, &result);
        result
    }

    /// Scaffolds `app_name` inside `test_folder`.
    pub async fn create_project(
        &self,
        test_folder: &Path,
        app_name: &str,
        capability: Capability,
        language: Option<ProgrammingLanguage>,
        extra: &str,
    ) -> Result<CommandOutput> {
        self.run_once(
            &self.new_project_args(app_name, capability, language, extra),
            test_folder,
        )
        .await
    }

    /// Scaffolds a sample and renames its folder to `app_name`.
    pub async fn create_sample_project(
        &self,
        test_folder: &Path,
        sample: &str,
        app_name: &str,
    ) -> Result<CommandOutput> {
        let output = self
            .run_once(&self.new_sample_args(sample), test_folder)
            .await?;
        tokio::fs::rename(test_folder.join(sample), test_folder.join(app_name)).await?;
        Ok(output)
    }

    pub async fn provision(&self, project: &Path, env: &str, extra: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.provision_args(env, extra), project, None)
            .await
    }

    pub async fn deploy(&self, project: &Path, env: &str, extra: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.deploy_args(env, extra), project, None)
            .await
    }

    pub async fn validate(&self, project: &Path, env: &str, extra: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.validate_args(env, extra), project, None)
            .await
    }

    pub async fn package(&self, project: &Path, env: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.package_args(env), project, None)
            .await
    }

    pub async fn publish(&self, project: &Path, env: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.publish_args(env), project, None)
            .await
    }

    pub async fn add_env(
        &self,
        project: &Path,
        new_env: &str,
        source_env: &str,
    ) -> Result<CommandOutput> {
        self.run_once(&self.env_add_args(new_env, source_env), project)
            .await
    }

    pub async fn add_feature(
        &self,
        project: &Path,
        feature: &str,
        extra: &str,
    ) -> Result<CommandOutput> {
        self.run_once(&self.add_args(feature, extra), project).await
    }

    pub async fn update_entra_app(
        &self,
        project: &Path,
        env: &str,
        extra: &str,
    ) -> Result<CommandOutput> {
        self.run_with_retry(&self.entra_app_update_args(env, extra), project, None)
            .await
    }

    pub async fn grant_permission(
        &self,
        project: &Path,
        env: &str,
        email: &str,
    ) -> Result<CommandOutput> {
        self.run_with_retry(&self.permission_grant_args(env, email), project, None)
            .await
    }

    pub async fn permission_status(&self, project: &Path, env: &str) -> Result<CommandOutput> {
        self.run_with_retry(&self.permission_status_args(env), project, None)
            .await
    }

    pub async fn account_show(&self, cwd: &Path) -> Result<CommandOutput> {
        self.run_once("account show", cwd).await
    }

    pub async fn config_get(&self, cwd: &Path) -> Result<CommandOutput> {
        self.run_once("config get", cwd).await
    }

    /// Migrates a legacy project to the current layout.
    pub async fn upgrade(&self, project: &Path) -> Result<CommandOutput> {
        self.run_once("upgrade --force", project).await
    }
}

fn log_outcome(command: &str, cwd: &Path, result: &Result<CommandOutput>) {
    let cwd = cwd.display().to_string();
    match result {
        Ok(output) if output.stderr.trim().is_empty() => {
            info!(cwd = cwd, "[Successfully] {}", command);
        }
        Ok(output) => {
            warn!(
                cwd = cwd,
                stderr = output.stderr.trim(),
                "[Pending] {} wrote to stderr",
                command
            );
        }
        Err(e) => {
            error!(cwd = cwd, error = %e, "[Failed] {}", command);
        }
    }
}
