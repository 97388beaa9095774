//! Microsoft Graph operations: directory applications, users and installed Teams apps.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{AadApp, DirectoryObject, InstalledTeamsApp, ServicePrincipal};
use crate::{CloudClient, Error, Result};

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;

#[derive(Debug, Deserialize)]
struct UserId {
    id: String,
}

/// Client for the Graph endpoints the suite validates and cleans up.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: CloudClient,
}

impl GraphClient {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Fetches an application by object id.
    ///
    /// # Errors
    /// `Error::NotFound` when the application does not exist.
    #[instrument(skip(self))]
    pub async fn get_aad_app(&self, object_id: &str) -> Result<AadApp> {
        self.client.get(&format!("/applications/{object_id}")).await
    }

    /// Lists every application visible to the caller.
    pub async fn list_aad_apps(&self) -> Result<Vec<AadApp>> {
        self.client.get_paged("/applications").await
    }

    /// Lists applications whose display name starts with `prefix`.
    #[instrument(skip(self))]
    pub async fn list_aad_apps_by_name_prefix(&self, prefix: &str) -> Result<Vec<AadApp>> {
        let filter = format!("startswith(displayName,'{}')", escape_odata(prefix));
        self.client
            .get_paged(&format!("/applications?$filter={filter}"))
            .await
    }

    /// Resolves a client id (`appId`) to the application's object id.
    ///
    /// Returns `Ok(None)` when no application carries that client id.
    #[instrument(skip(self))]
    pub async fn find_object_id_by_app_id(&self, app_id: &str) -> Result<Option<String>> {
        let filter = format!("appId eq '{}'", escape_odata(app_id));
        let apps: Vec<AadApp> = self
            .client
            .get_paged(&format!("/applications?$filter={filter}"))
            .await?;
        Ok(apps.into_iter().next().map(|app| app.id))
    }

    /// Lists the service principals created for client id `app_id`.
    #[instrument(skip(self))]
    pub async fn list_service_principals_by_app_id(
        &self,
        app_id: &str,
    ) -> Result<Vec<ServicePrincipal>> {
        let filter = format!("appId eq '{}'", escape_odata(app_id));
        self.client
            .get_paged(&format!("/servicePrincipals?$filter={filter}"))
            .await
    }

    /// Deletes an application and purges it from the deleted-items bin.
    ///
    /// A missing application is not an error; the purge is attempted either way.
    #[instrument(skip(self))]
    pub async fn delete_aad_app(&self, object_id: &str) -> Result<()> {
        match self
            .client
            .delete(&format!("/applications/{object_id}"))
            .await
        {
            Ok(()) | Err(Error::NotFound) => {}
            Err(e) => return Err(e),
        }

        match self
            .client
            .delete(&format!("/directory/deletedItems/{object_id}"))
            .await
        {
            Ok(()) => {
                info!(object_id = object_id, "[Successfully] Deleted AAD app");
                Ok(())
            }
            Err(Error::NotFound) => {
                debug!(object_id = object_id, "AAD app was already purged");
                Ok(())
            }
            Err(e) => {
                warn!(object_id = object_id, error = %e, "[Failed] Could not purge AAD app");
                Err(e)
            }
        }
    }

    /// Lists the owners of an application.
    pub async fn list_owners(&self, object_id: &str) -> Result<Vec<DirectoryObject>> {
        self.client
            .get_paged(&format!("/applications/{object_id}/owners"))
            .await
    }

    /// Looks up a user's object id by user principal name.
    pub async fn get_user_id(&self, user_principal_name: &str) -> Result<String> {
        let user: UserId = self
            .client
            .get(&format!("/users/{user_principal_name}"))
            .await?;
        Ok(user.id)
    }

    /// Finds the installation id of a Teams app (by manifest id) installed for a user.
    #[instrument(skip(self))]
    pub async fn get_installed_teams_app_id(
        &self,
        user_id: &str,
        teams_app_id: &str,
    ) -> Result<Option<String>> {
        let filter = format!("teamsApp/externalId eq '{}'", escape_odata(teams_app_id));
        let installed: Vec<InstalledTeamsApp> = self
            .client
            .get_paged(&format!(
                "/users/{user_id}/teamwork/installedApps?$expand=teamsApp&$filter={filter}"
            ))
            .await?;
        Ok(installed.into_iter().next().map(|app| app.id))
    }

    /// Removes a Teams app installation from a user.
    #[instrument(skip(self))]
    pub async fn uninstall_teams_app(&self, user_id: &str, installation_id: &str) -> Result<()> {
        self.client
            .delete(&format!(
                "/users/{user_id}/teamwork/installedApps/{installation_id}"
            ))
            .await
    }
}

/// Escapes a literal for use inside an OData single-quoted string.
fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}
