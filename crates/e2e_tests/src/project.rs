//! A scaffolded app under test and its lifecycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use teamsapp_cli::{Capability, CommandOutput, ProgrammingLanguage, TeamsAppCli};
use test_cleanup::{
    AadAppsToClean, CleanupContext, CleanupOptions, CleanupReport, SharedResource, clean_up,
};
use test_utils::dotenv::read_env_outputs;
use tracing::{info, warn};

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

/// Env output naming the Teams app created by `provision`.
pub const TEAMS_APP_ID_KEY: &str = "TEAMS_APP_ID";

/// One app under test: a unique name, its folder and the CLI that drives it.
#[derive(Debug, Clone)]
pub struct TestProject {
    app_name: String,
    test_folder: PathBuf,
    project_path: PathBuf,
    env_name: String,
    cli: TeamsAppCli,
    bot_registration: Option<SharedResource>,
    shared_apim: Option<SharedResource>,
}

impl TestProject {
    /// A uniquely named project under `~/test-folder`, in the `dev` environment.
    pub fn new(cli: TeamsAppCli) -> Result<Self> {
        let test_folder = test_utils::get_test_folder()?;
        Ok(Self::in_folder(
            test_folder,
            test_utils::get_unique_app_name(),
            cli,
        ))
    }

    pub fn in_folder(
        test_folder: impl Into<PathBuf>,
        app_name: impl Into<String>,
        cli: TeamsAppCli,
    ) -> Self {
        let test_folder = test_folder.into();
        let app_name = app_name.into();
        Self {
            project_path: test_folder.join(&app_name),
            app_name,
            test_folder,
            env_name: "dev".to_string(),
            cli,
            bot_registration: None,
            shared_apim: None,
        }
    }

    pub fn with_env(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = env_name.into();
        self
    }

    /// A bot registration the test created outside its own resource group.
    pub fn with_bot_registration(mut self, bot: SharedResource) -> Self {
        self.bot_registration = Some(bot);
        self
    }

    /// A shared API Management service the test subscribes to.
    pub fn with_shared_apim(mut self, service: SharedResource) -> Self {
        self.shared_apim = Some(service);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn test_folder(&self) -> &Path {
        &self.test_folder
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn cli(&self) -> &TeamsAppCli {
        &self.cli
    }

    pub fn resource_group_name(&self) -> String {
        test_utils::resource_group_name(&self.app_name, &self.env_name)
    }

    /// Env outputs written by the CLI for the current environment.
    pub fn outputs(&self) -> Result<HashMap<String, String>> {
        read_env_outputs(&self.project_path, &self.env_name).with_context(|| {
            format!(
                "Failed to read outputs of {} in env {}",
                self.app_name, self.env_name
            )
        })
    }

    pub async fn create(
        &self,
        capability: Capability,
        language: Option<ProgrammingLanguage>,
        extra: &str,
    ) -> Result<CommandOutput> {
        tokio::fs::create_dir_all(&self.test_folder).await?;
        let output = self
            .cli
            .create_project(&self.test_folder, &self.app_name, capability, language, extra)
            .await?;
        info!(app_name = self.app_name, "[Successfully] Scaffolded project");
        Ok(output)
    }

    pub async fn create_from_sample(&self, sample: &str) -> Result<CommandOutput> {
        tokio::fs::create_dir_all(&self.test_folder).await?;
        Ok(self
            .cli
            .create_sample_project(&self.test_folder, sample, &self.app_name)
            .await?)
    }

    pub async fn provision(&self, extra: &str) -> Result<CommandOutput> {
        Ok(self
            .cli
            .provision(&self.project_path, &self.env_name, extra)
            .await?)
    }

    pub async fn deploy(&self, extra: &str) -> Result<CommandOutput> {
        Ok(self
            .cli
            .deploy(&self.project_path, &self.env_name, extra)
            .await?)
    }

    pub async fn validate(&self, extra: &str) -> Result<CommandOutput> {
        Ok(self
            .cli
            .validate(&self.project_path, &self.env_name, extra)
            .await?)
    }

    pub async fn package(&self) -> Result<CommandOutput> {
        Ok(self.cli.package(&self.project_path, &self.env_name).await?)
    }

    pub async fn publish(&self) -> Result<CommandOutput> {
        Ok(self.cli.publish(&self.project_path, &self.env_name).await?)
    }

    /// Options for tearing this project down, including the staged Teams
    /// app when `provision` recorded one.
    pub fn cleanup_options(&self, aad_apps: AadAppsToClean) -> CleanupOptions {
        let teams_app_id = match self.outputs() {
            Ok(outputs) => outputs
                .get(TEAMS_APP_ID_KEY)
                .filter(|id| !id.is_empty())
                .cloned(),
            Err(e) => {
                warn!(app_name = self.app_name, error = %e, "No env outputs to clean up from");
                None
            }
        };
        CleanupOptions {
            env_name: self.env_name.clone(),
            aad_apps,
            teams_app_id,
            bot_registration: self.bot_registration.clone(),
            shared_apim: self.shared_apim.clone(),
        }
    }

    /// Best-effort teardown. Never fails; inspect the report for what was left.
    pub async fn cleanup(&self, ctx: &CleanupContext, aad_apps: AadAppsToClean) -> CleanupReport {
        let options = self.cleanup_options(aad_apps);
        clean_up(ctx, &self.app_name, &self.project_path, &options).await
    }
}
