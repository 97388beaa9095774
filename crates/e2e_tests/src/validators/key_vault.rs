//! Key Vault secret checks.

use std::collections::HashMap;

use anyhow::Result;
use cloud_client::resource_id::{get_key_vault_name, get_resource_group_name};
use cloud_client::{Error as CloudError, KeyVaultClient};
use tracing::info;

use super::output;
use crate::Verification;

#[cfg(test)]
#[path = "key_vault_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVaultExpectations {
    pub resource_group: String,
    pub vault_name: String,
    pub tenant_id: String,
    /// Principal granted read access while the secrets are checked.
    pub reader_object_id: String,
    pub secret_names: Vec<String>,
}

impl KeyVaultExpectations {
    /// Reads `KEY_VAULT_RESOURCE_ID` from env outputs.
    pub fn from_outputs(
        outputs: &HashMap<String, String>,
        tenant_id: impl Into<String>,
        reader_object_id: impl Into<String>,
    ) -> Result<Self> {
        let vault_id = output(outputs, "KEY_VAULT_RESOURCE_ID")?;
        Ok(Self {
            resource_group: get_resource_group_name(vault_id)?,
            vault_name: get_key_vault_name(vault_id)?,
            tenant_id: tenant_id.into(),
            reader_object_id: reader_object_id.into(),
            secret_names: Vec::new(),
        })
    }

    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secret_names.push(name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct KeyVaultValidator {
    key_vault: KeyVaultClient,
}

impl KeyVaultValidator {
    pub fn new(key_vault: KeyVaultClient) -> Self {
        Self { key_vault }
    }

    /// Checks the vault exists in the expected tenant and every expected
    /// secret holds a value. Access for the reader is revoked afterwards.
    pub async fn validate(&self, expected: &KeyVaultExpectations) -> Result<Verification> {
        info!(
            vault = expected.vault_name,
            resource_group = expected.resource_group,
            "Validating Key Vault"
        );
        let mut verification = Verification::new();

        let vault = match self
            .key_vault
            .get_vault(&expected.resource_group, &expected.vault_name)
            .await
        {
            Ok(vault) => vault,
            Err(CloudError::NotFound) => {
                verification.fail(format!("Key Vault {} does not exist", expected.vault_name));
                return Ok(verification);
            }
            Err(e) => return Err(e.into()),
        };
        verification.check_eq(
            "Key Vault tenant",
            Some(expected.tenant_id.as_str()),
            vault.properties.tenant_id.as_deref(),
        );

        for name in &expected.secret_names {
            match self
                .key_vault
                .read_secret_with_temporary_access(
                    &expected.resource_group,
                    &expected.vault_name,
                    &expected.tenant_id,
                    &expected.reader_object_id,
                    name,
                )
                .await
            {
                Ok(value) => verification.check(
                    !value.is_empty(),
                    format!("Key Vault secret {name} is empty"),
                ),
                Err(CloudError::NotFound) => {
                    verification.fail(format!("Key Vault secret {name} does not exist"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(verification)
    }
}
