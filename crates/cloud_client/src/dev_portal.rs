//! Teams developer portal: registered apps and catalog submissions.
//!
//! The portal is slow to reflect writes, so this client retries more
//! patiently than the ARM and Graph clients.

use std::sync::Arc;
use std::time::Duration;

use auth_handler::{TokenProvider, DEV_PORTAL_SCOPE};
use backoff_executor::RetryPolicy;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::models::{DevPortalApp, StagedApp};
use crate::{CloudClient, Error, Result, DEV_PORTAL_ENDPOINT};

#[cfg(test)]
#[path = "dev_portal_tests.rs"]
mod tests;

pub const DEV_PORTAL_ATTEMPTS: u32 = 6;
pub const DEV_PORTAL_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct StagedAppList {
    #[serde(default)]
    value: Vec<StagedApp>,
}

#[derive(Debug, Clone)]
pub struct DevPortalClient {
    client: CloudClient,
}

impl DevPortalClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_client(CloudClient::new(DEV_PORTAL_ENDPOINT, DEV_PORTAL_SCOPE, tokens))
    }

    /// Uses `client` with the portal's retry policy applied.
    pub fn with_client(client: CloudClient) -> Self {
        Self {
            client: client
                .with_retry_policy(RetryPolicy::fixed(DEV_PORTAL_ATTEMPTS, DEV_PORTAL_DELAY)),
        }
    }

    pub async fn list_apps(&self) -> Result<Vec<DevPortalApp>> {
        self.client.get("/api/appdefinitions").await
    }

    pub async fn get_app(&self, teams_app_id: &str) -> Result<Option<DevPortalApp>> {
        self.client
            .get_optional(&format!("/api/appdefinitions/{teams_app_id}"))
            .await
    }

    /// Deletes an app registration. A missing app counts as deleted.
    #[instrument(skip(self))]
    pub async fn delete_app(&self, teams_app_id: &str) -> Result<()> {
        match self
            .client
            .delete(&format!("/api/appdefinitions/{teams_app_id}"))
            .await
        {
            Ok(()) | Err(Error::NotFound) => {
                info!(teams_app_id = teams_app_id, "[Successfully] Deleted Teams app");
                Ok(())
            }
            Err(e) => {
                warn!(
                    teams_app_id = teams_app_id,
                    error = %e,
                    "[Failed] Could not delete Teams app"
                );
                Err(e)
            }
        }
    }

    /// Returns the pending catalog submission for an app, if any.
    pub async fn get_staged_app(&self, teams_app_id: &str) -> Result<Option<StagedApp>> {
        let staged: Option<StagedAppList> = self
            .client
            .get_optional(&format!("/api/publishing/{teams_app_id}"))
            .await?;
        Ok(staged.and_then(|list| list.value.into_iter().next()))
    }

    /// Withdraws a pending catalog submission.
    #[instrument(skip(self))]
    pub async fn cancel_staged_app(&self, teams_app_id: &str) -> Result<()> {
        let Some(staged) = self.get_staged_app(teams_app_id).await? else {
            info!(teams_app_id = teams_app_id, "No staged app to cancel");
            return Ok(());
        };

        match self
            .client
            .delete(&format!(
                "/api/publishing/{teams_app_id}/appdefinitions/{}",
                staged.id
            ))
            .await
        {
            Ok(()) | Err(Error::NotFound) => {
                info!(
                    teams_app_id = teams_app_id,
                    staged_id = staged.id,
                    "[Successfully] Cancelled staged app"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
