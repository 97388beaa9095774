//! Key Vault: vault metadata and access policies on the management plane,
//! secrets on the data plane.

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::models::{AccessPolicy, KeyVault, Permissions, Secret};
use crate::{arm_resource_path, CloudClient, Error, Result};

#[cfg(test)]
#[path = "key_vault_tests.rs"]
mod tests;

pub const KEY_VAULT_MANAGEMENT_API_VERSION: &str = "2022-07-01";
pub const KEY_VAULT_DATA_API_VERSION: &str = "7.4";

#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    management: CloudClient,
    data_plane: CloudClient,
    subscription_id: String,
}

impl KeyVaultClient {
    /// `management` talks to ARM; `data_plane` must request Key Vault tokens.
    pub fn new(
        management: CloudClient,
        data_plane: CloudClient,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            management,
            data_plane,
            subscription_id: subscription_id.into(),
        }
    }

    fn vault_path(&self, resource_group: &str, vault_name: &str, child: &str) -> String {
        arm_resource_path(
            &self.subscription_id,
            resource_group,
            &format!("Microsoft.KeyVault/vaults/{vault_name}{child}"),
            KEY_VAULT_MANAGEMENT_API_VERSION,
        )
    }

    pub async fn get_vault(&self, resource_group: &str, vault_name: &str) -> Result<KeyVault> {
        self.management
            .get(&self.vault_path(resource_group, vault_name, ""))
            .await
    }

    /// Grants `object_id` get/list/set/delete on secrets.
    #[instrument(skip(self))]
    pub async fn add_secret_access_policy(
        &self,
        resource_group: &str,
        vault_name: &str,
        tenant_id: &str,
        object_id: &str,
    ) -> Result<()> {
        self.update_access_policy(resource_group, vault_name, "add", tenant_id, object_id)
            .await?;
        info!(
            vault_name = vault_name,
            object_id = object_id,
            "[Successfully] Added Key Vault access policy"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_secret_access_policy(
        &self,
        resource_group: &str,
        vault_name: &str,
        tenant_id: &str,
        object_id: &str,
    ) -> Result<()> {
        self.update_access_policy(resource_group, vault_name, "remove", tenant_id, object_id)
            .await
    }

    async fn update_access_policy(
        &self,
        resource_group: &str,
        vault_name: &str,
        operation: &str,
        tenant_id: &str,
        object_id: &str,
    ) -> Result<()> {
        let policy = AccessPolicy {
            tenant_id: tenant_id.to_string(),
            object_id: object_id.to_string(),
            permissions: Permissions {
                secrets: ["get", "list", "set", "delete"]
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                ..Default::default()
            },
        };
        let body = json!({ "properties": { "accessPolicies": [policy] } });
        let child = format!("/accessPolicies/{operation}");
        let _: serde_json::Value = self
            .management
            .put_json(&self.vault_path(resource_group, vault_name, &child), &body)
            .await?;
        Ok(())
    }

    /// Reads a secret as `object_id`, holding an access policy only for the
    /// duration of the read.
    ///
    /// The policy is removed whether or not the read succeeds. A failed
    /// removal is logged and does not mask the read's outcome.
    #[instrument(skip(self))]
    pub async fn read_secret_with_temporary_access(
        &self,
        resource_group: &str,
        vault_name: &str,
        tenant_id: &str,
        object_id: &str,
        secret_name: &str,
    ) -> Result<String> {
        let vault = self.get_vault(resource_group, vault_name).await?;
        let vault_uri = vault
            .properties
            .vault_uri
            .ok_or_else(|| Error::InvalidUrl(format!("Key Vault {vault_name} has no vaultUri")))?;

        self.add_secret_access_policy(resource_group, vault_name, tenant_id, object_id)
            .await?;
        let secret = self.get_secret(&vault_uri, secret_name).await;
        if let Err(e) = self
            .remove_secret_access_policy(resource_group, vault_name, tenant_id, object_id)
            .await
        {
            warn!(
                vault_name = vault_name,
                object_id = object_id,
                error = %e,
                "[Failed] Could not remove Key Vault access policy"
            );
        }
        secret
    }

    /// Reads a secret value. `vault_uri` is the vault's `properties.vaultUri`.
    pub async fn get_secret(&self, vault_uri: &str, name: &str) -> Result<String> {
        let secret: Secret = self
            .data_plane
            .get(&secret_url(vault_uri, name))
            .await?;
        Ok(secret.value)
    }

    pub async fn set_secret(&self, vault_uri: &str, name: &str, value: &str) -> Result<()> {
        let _: Secret = self
            .data_plane
            .put_json(&secret_url(vault_uri, name), &json!({ "value": value }))
            .await?;
        Ok(())
    }
}

fn secret_url(vault_uri: &str, name: &str) -> String {
    format!(
        "{}/secrets/{}?api-version={}",
        vault_uri.trim_end_matches('/'),
        name,
        KEY_VAULT_DATA_API_VERSION
    )
}
