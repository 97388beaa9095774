//! Resource group lifecycle on Azure Resource Manager.

use std::collections::HashMap;
use std::time::Duration;

use backoff_executor::{retry_classified, RetryPolicy};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::models::ResourceGroup;
use crate::{CloudClient, Error, Result};

#[cfg(test)]
#[path = "resource_groups_tests.rs"]
mod tests;

/// API version used for resource group calls.
pub const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";

/// Number of existence checks made after a delete request.
pub const DELETE_POLL_ATTEMPTS: u32 = 40;

/// Pause between existence checks after a delete request.
pub const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct ResourceGroupCreate<'a> {
    location: &'a str,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    tags: &'a HashMap<String, String>,
}

/// Creates, inspects and deletes resource groups in one subscription.
#[derive(Debug, Clone)]
pub struct ResourceGroupManager {
    client: CloudClient,
    subscription_id: String,
    delete_poll_policy: RetryPolicy,
}

impl ResourceGroupManager {
    pub fn new(client: CloudClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            delete_poll_policy: RetryPolicy::fixed(DELETE_POLL_ATTEMPTS, DELETE_POLL_INTERVAL),
        }
    }

    /// Overrides how long [`delete_resource_group`](Self::delete_resource_group)
    /// waits for the group to disappear.
    pub fn with_delete_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.delete_poll_policy = policy;
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn group_path(&self, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{}?api-version={}",
            self.subscription_id, name, RESOURCE_GROUP_API_VERSION
        )
    }

    /// Creates the group, or updates its location and tags if it exists.
    #[instrument(skip(self, tags))]
    pub async fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &HashMap<String, String>,
    ) -> Result<ResourceGroup> {
        let group: ResourceGroup = self
            .client
            .put_json(&self.group_path(name), &ResourceGroupCreate { location, tags })
            .await?;
        info!(
            resource_group = name,
            location = location,
            "[Successfully] Created resource group"
        );
        Ok(group)
    }

    /// # Errors
    /// `Error::NotFound` when the group does not exist.
    pub async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup> {
        self.client.get(&self.group_path(name)).await
    }

    /// Reports whether the group exists. A 404 is `Ok(false)`.
    pub async fn has_resource_group(&self, name: &str) -> Result<bool> {
        Ok(self
            .client
            .get_optional::<ResourceGroup>(&self.group_path(name))
            .await?
            .is_some())
    }

    /// Deletes the group and waits until it is gone.
    ///
    /// Returns `Ok(true)` once a lookup reports the group missing (including
    /// when it never existed) and `Ok(false)` when the poll budget runs out
    /// while the group is still visible.
    #[instrument(skip(self))]
    pub async fn delete_resource_group(&self, name: &str) -> Result<bool> {
        match self.client.delete(&self.group_path(name)).await {
            Ok(()) => {}
            Err(Error::NotFound) => {
                info!(resource_group = name, "Resource group does not exist");
                return Ok(true);
            }
            Err(e) => return Err(e),
        }

        let description = format!("wait for deletion of resource group {name}");
        let outcome = retry_classified(&self.delete_poll_policy, &description, || async move {
            if self.has_resource_group(name).await? {
                Err(Error::Pending(format!("resource group {name} still exists")))
            } else {
                Ok(())
            }
        })
        .await;

        match outcome {
            Ok(()) => {
                info!(resource_group = name, "[Successfully] Deleted resource group");
                Ok(true)
            }
            Err(Error::Pending(_)) => {
                warn!(
                    resource_group = name,
                    attempts = self.delete_poll_policy.attempts(),
                    "[Failed] Resource group still exists after deletion"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Lists all groups in the subscription, with their creation time.
    pub async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>> {
        self.client
            .get_paged(&format!(
                "/subscriptions/{}/resourcegroups?api-version={}&$expand=createdTime",
                self.subscription_id, RESOURCE_GROUP_API_VERSION
            ))
            .await
    }

    /// Lists groups whose name contains `fragment`, ignoring case.
    pub async fn search_resource_groups(&self, fragment: &str) -> Result<Vec<ResourceGroup>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .list_resource_groups()
            .await?
            .into_iter()
            .filter(|group| group.name.to_lowercase().contains(&needle))
            .collect())
    }
}
