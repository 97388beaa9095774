//! Environment-driven configuration for E2E runs.

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use secrecy::SecretString;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Enables the Bicep environment checker in the CLI.
pub const BICEP_ENV_CHECKER_FLAG: &str = "TEAMSFX_BICEP_ENV_CHECKER_ENABLE";

/// Switches the CLI to its insider-preview behaviour.
pub const INSIDER_PREVIEW_FLAG: &str = "__TEAMSFX_INSIDER_PREVIEW";

/// Accounts and ids the suite runs against, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct E2eConfig {
    pub subscription_id: String,
    pub azure_tenant_id: String,
    pub azure_account_name: String,
    pub azure_account_password: SecretString,
    azure_account_object_id: Option<String>,
    pub m365_account_name: String,
    pub m365_account_password: SecretString,
    pub m365_tenant_id: String,
    pub m365_collaborator: String,
    /// Public client used for the password grant during cleanup.
    pub clean_client_id: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} environment variable not set"))
}

impl E2eConfig {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `AZURE_SUBSCRIPTION_ID`, `AZURE_TENANT_ID`
    /// - `AZURE_ACCOUNT_NAME`, `AZURE_ACCOUNT_PASSWORD`
    /// - `M365_ACCOUNT_NAME`, `M365_ACCOUNT_PASSWORD`, `M365_TENANT_ID`
    /// - `M365_COLLABORATOR`
    /// - `CLEAN_CLIENT_ID`
    ///
    /// `AZURE_ACCOUNT_OBJECT_ID` is optional; see [`account_object_id`](Self::account_object_id).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            azure_tenant_id: required("AZURE_TENANT_ID")?,
            azure_account_name: required("AZURE_ACCOUNT_NAME")?,
            azure_account_password: required("AZURE_ACCOUNT_PASSWORD")?.into(),
            azure_account_object_id: env::var("AZURE_ACCOUNT_OBJECT_ID")
                .ok()
                .filter(|id| !id.is_empty()),
            m365_account_name: required("M365_ACCOUNT_NAME")?,
            m365_account_password: required("M365_ACCOUNT_PASSWORD")?.into(),
            m365_tenant_id: required("M365_TENANT_ID")?,
            m365_collaborator: required("M365_COLLABORATOR")?,
            clean_client_id: required("CLEAN_CLIENT_ID")?,
        })
    }

    /// Object id of the Azure test account, needed for key vault access policies.
    pub fn account_object_id(&self) -> Result<&str> {
        self.azure_account_object_id
            .as_deref()
            .context("Failed to get AZURE_ACCOUNT_OBJECT_ID from environment")
    }
}

/// Environment overrides that turn on the multi-environment CLI features.
pub fn feature_flag_env() -> HashMap<String, String> {
    HashMap::from([
        (BICEP_ENV_CHECKER_FLAG.to_string(), "true".to_string()),
        (INSIDER_PREVIEW_FLAG.to_string(), "true".to_string()),
    ])
}

/// Insider preview is on unless the flag is literally `false`.
pub fn is_insider_preview_enabled() -> bool {
    env::var(INSIDER_PREVIEW_FLAG).map_or(true, |value| value != "false")
}
