//! E2E validators, project helpers and cloud wiring for the TeamsFx suite.
//!
//! Scenarios live under `tests/`. They drive the `teamsapp` CLI through a
//! [`TestProject`], check what it provisioned with the validators in
//! [`validators`], and always finish with a best-effort cleanup.

use std::sync::Arc;

use auth_handler::{AzureAdTokenProvider, Credential, TokenProvider};
use cloud_client::{
    ApimClient, BotServiceClient, CloudClient, GraphClient, KeyVaultClient, ResourceGroupManager,
    SqlClient, StorageClient, WebAppClient,
};
use test_cleanup::{CleanupConfig, CleanupContext};
use test_utils::E2eConfig;

pub mod project;
pub mod validators;
pub mod verification;

pub use project::TestProject;
pub use validators::{
    AadExpectations, AadValidator, ApimAadExpectations, ApimDeployExpectations, ApimExpectations,
    ApimValidator, BotExpectations, BotValidator, FrontendExpectations, FrontendValidator,
    KeyVaultExpectations, KeyVaultValidator, ServicePlanValidator,
};
pub use verification::Verification;

/// Authenticated clients for the Azure subscription and the M365 tenant.
#[derive(Clone)]
pub struct CloudContext {
    config: E2eConfig,
    azure_tokens: Arc<dyn TokenProvider>,
    m365_tokens: Arc<dyn TokenProvider>,
}

impl CloudContext {
    /// Password-grant credentials for both accounts, through `CLEAN_CLIENT_ID`.
    pub fn from_config(config: E2eConfig) -> Self {
        let azure_tokens: Arc<dyn TokenProvider> = Arc::new(AzureAdTokenProvider::new(
            config.azure_tenant_id.clone(),
            Credential::UserPassword {
                client_id: config.clean_client_id.clone(),
                username: config.azure_account_name.clone(),
                password: config.azure_account_password.clone(),
            },
        ));
        let m365_tokens: Arc<dyn TokenProvider> = Arc::new(AzureAdTokenProvider::new(
            config.m365_tenant_id.clone(),
            Credential::UserPassword {
                client_id: config.clean_client_id.clone(),
                username: config.m365_account_name.clone(),
                password: config.m365_account_password.clone(),
            },
        ));
        Self::with_tokens(config, azure_tokens, m365_tokens)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_config(E2eConfig::from_env()?))
    }

    pub fn with_tokens(
        config: E2eConfig,
        azure_tokens: Arc<dyn TokenProvider>,
        m365_tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            azure_tokens,
            m365_tokens,
        }
    }

    pub fn config(&self) -> &E2eConfig {
        &self.config
    }

    pub fn arm(&self) -> CloudClient {
        CloudClient::arm(self.azure_tokens.clone())
    }

    pub fn graph(&self) -> GraphClient {
        GraphClient::new(CloudClient::graph(self.m365_tokens.clone()))
    }

    pub fn resource_groups(&self) -> ResourceGroupManager {
        ResourceGroupManager::new(self.arm(), self.config.subscription_id.clone())
    }

    pub fn web_apps(&self) -> WebAppClient {
        WebAppClient::new(self.arm(), self.config.subscription_id.clone())
    }

    pub fn key_vault(&self) -> KeyVaultClient {
        let data_plane = CloudClient::new(
            "https://vault.azure.net",
            auth_handler::KEY_VAULT_SCOPE,
            self.azure_tokens.clone(),
        );
        KeyVaultClient::new(self.arm(), data_plane, self.config.subscription_id.clone())
    }

    pub fn sql(&self) -> SqlClient {
        SqlClient::new(self.arm(), self.config.subscription_id.clone())
    }

    /// Blob client for `https://{account}.blob.core.windows.net`.
    pub fn storage(&self, account: &str) -> StorageClient {
        StorageClient::new(CloudClient::new(
            format!("https://{account}.blob.core.windows.net"),
            auth_handler::STORAGE_SCOPE,
            self.azure_tokens.clone(),
        ))
    }

    pub fn aad_validator(&self) -> AadValidator {
        AadValidator::new(self.graph())
    }

    pub fn bot_validator(&self) -> BotValidator {
        BotValidator::new(
            BotServiceClient::new(self.arm(), self.config.subscription_id.clone()),
            self.web_apps(),
        )
    }

    pub fn frontend_validator(&self) -> FrontendValidator {
        FrontendValidator::new(self.web_apps())
    }

    pub fn key_vault_validator(&self) -> KeyVaultValidator {
        KeyVaultValidator::new(self.key_vault())
    }

    pub fn apim_validator(&self) -> ApimValidator {
        ApimValidator::new(
            ApimClient::new(self.arm(), self.config.subscription_id.clone()),
            self.graph(),
        )
    }

    pub fn service_plan_validator(&self) -> ServicePlanValidator {
        ServicePlanValidator::new(self.web_apps())
    }

    /// Cleanup clients sharing this context's credentials.
    pub fn cleanup(&self) -> CleanupContext {
        CleanupContext::from_config(&CleanupConfig {
            subscription_id: self.config.subscription_id.clone(),
            azure_tenant_id: self.config.azure_tenant_id.clone(),
            azure_account_name: self.config.azure_account_name.clone(),
            azure_account_password: self.config.azure_account_password.clone(),
            m365_tenant_id: self.config.m365_tenant_id.clone(),
            m365_account_name: self.config.m365_account_name.clone(),
            m365_account_password: self.config.m365_account_password.clone(),
            clean_client_id: self.config.clean_client_id.clone(),
        })
    }
}

/// Installs a test-writer subscriber. Safe to call from every test.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Client pointed at a mock server with a fast retry policy.
#[cfg(test)]
pub(crate) fn mock_cloud_client(base_url: &str) -> CloudClient {
    use std::time::Duration;

    use backoff_executor::RetryPolicy;

    CloudClient::new(
        base_url,
        "https://mock/.default",
        Arc::new(auth_handler::StaticTokenProvider::new("test-token")),
    )
    .with_retry_policy(RetryPolicy::fixed(3, Duration::from_millis(10)))
}
