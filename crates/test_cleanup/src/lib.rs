//! Cleanup utilities for resources created during E2E testing.
//!
//! This crate tears down what a test created (AAD apps, resource groups, the
//! local project folder and catalog submissions) on a best-effort basis, and
//! sweeps up orphans left behind by interrupted runs. It can be used both
//! programmatically (from test code) and via the `cleanup-orphans` binary.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use auth_handler::{AzureAdTokenProvider, Credential, TokenProvider};
use cloud_client::{
    ApimClient, BotServiceClient, CloudClient, DevPortalClient, GraphClient, ResourceGroupManager,
};
use secrecy::SecretString;

pub mod best_effort;
pub mod orphans;
pub mod project;

pub use best_effort::{CleanupReport, CleanupTask, run_best_effort};
pub use orphans::OrphanSweeper;
pub use project::{
    AadAppsToClean, CleanupContext, CleanupOptions, ResourceGroupCleanup, SharedResource,
    clean_up, clean_up_aad_apps, clean_up_apim_subscriptions, clean_up_local_project,
    clean_up_resource_group, delete_resource_group_by_name,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Configuration for cleanup operations loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Subscription holding the test resource groups
    pub subscription_id: String,
    /// Tenant of the Azure test account
    pub azure_tenant_id: String,
    pub azure_account_name: String,
    pub azure_account_password: SecretString,
    /// Tenant of the M365 test account, which owns the AAD apps
    pub m365_tenant_id: String,
    pub m365_account_name: String,
    pub m365_account_password: SecretString,
    /// Public client used for the password grant
    pub clean_client_id: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} environment variable not set"))
}

impl CleanupConfig {
    /// Load cleanup configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `AZURE_SUBSCRIPTION_ID`, `AZURE_TENANT_ID`
    /// - `AZURE_ACCOUNT_NAME`, `AZURE_ACCOUNT_PASSWORD`
    /// - `M365_TENANT_ID`, `M365_ACCOUNT_NAME`, `M365_ACCOUNT_PASSWORD`
    /// - `CLEAN_CLIENT_ID`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            azure_tenant_id: required("AZURE_TENANT_ID")?,
            azure_account_name: required("AZURE_ACCOUNT_NAME")?,
            azure_account_password: required("AZURE_ACCOUNT_PASSWORD")?.into(),
            m365_tenant_id: required("M365_TENANT_ID")?,
            m365_account_name: required("M365_ACCOUNT_NAME")?,
            m365_account_password: required("M365_ACCOUNT_PASSWORD")?.into(),
            clean_client_id: required("CLEAN_CLIENT_ID")?,
        })
    }

    fn azure_tokens(&self) -> Arc<dyn TokenProvider> {
        Arc::new(AzureAdTokenProvider::new(
            self.azure_tenant_id.clone(),
            Credential::UserPassword {
                client_id: self.clean_client_id.clone(),
                username: self.azure_account_name.clone(),
                password: self.azure_account_password.clone(),
            },
        ))
    }

    fn m365_tokens(&self) -> Arc<dyn TokenProvider> {
        Arc::new(AzureAdTokenProvider::new(
            self.m365_tenant_id.clone(),
            Credential::UserPassword {
                client_id: self.clean_client_id.clone(),
                username: self.m365_account_name.clone(),
                password: self.m365_account_password.clone(),
            },
        ))
    }
}

impl CleanupContext {
    /// Builds the Graph, ARM and developer portal clients for `config`.
    pub fn from_config(config: &CleanupConfig) -> Self {
        let m365_tokens = config.m365_tokens();
        let arm = CloudClient::arm(config.azure_tokens());
        Self {
            graph: GraphClient::new(CloudClient::graph(m365_tokens.clone())),
            resource_groups: ResourceGroupManager::new(arm.clone(), config.subscription_id.clone()),
            dev_portal: DevPortalClient::new(m365_tokens),
            bot_services: BotServiceClient::new(arm.clone(), config.subscription_id.clone()),
            apim: ApimClient::new(arm, config.subscription_id.clone()),
        }
    }

    pub fn orphan_sweeper(&self) -> OrphanSweeper {
        OrphanSweeper::new(self.graph.clone(), self.resource_groups.clone())
    }
}

/// Initialize logging for cleanup operations.
///
/// Sets up tracing with appropriate formatting for CLI use.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}
