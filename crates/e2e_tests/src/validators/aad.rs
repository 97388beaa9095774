//! AAD application registration checks.

use std::collections::HashMap;

use anyhow::Result;
use backoff_executor::{retry_if, RetryDecision, RetryPolicy, Retryable};
use cloud_client::{Error as CloudError, GraphClient};
use tracing::info;

use super::output;
use crate::Verification;

#[cfg(test)]
#[path = "aad_tests.rs"]
mod tests;

/// What the AAD app created for a project should look like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AadExpectations {
    pub object_id: String,
    pub client_id: Option<String>,
    pub display_name: Option<String>,
    pub identifier_uri: Option<String>,
    /// User principal name expected among the app's owners.
    pub owner: Option<String>,
}

impl AadExpectations {
    /// Reads `AAD_APP_OBJECT_ID` and `AAD_APP_CLIENT_ID` from env outputs.
    pub fn from_outputs(outputs: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            object_id: output(outputs, "AAD_APP_OBJECT_ID")?.to_string(),
            client_id: outputs.get("AAD_APP_CLIENT_ID").cloned(),
            ..Self::default()
        })
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_identifier_uri(mut self, uri: impl Into<String>) -> Self {
        self.identifier_uri = Some(uri.into());
        self
    }

    pub fn with_owner(mut self, user_principal_name: impl Into<String>) -> Self {
        self.owner = Some(user_principal_name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AadValidator {
    graph: GraphClient,
    lookup_policy: RetryPolicy,
}

impl AadValidator {
    pub fn new(graph: GraphClient) -> Self {
        Self {
            graph,
            lookup_policy: RetryPolicy::default(),
        }
    }

    /// Overrides how long a freshly created app may stay invisible.
    pub fn with_lookup_policy(mut self, policy: RetryPolicy) -> Self {
        self.lookup_policy = policy;
        self
    }

    pub async fn validate(&self, expected: &AadExpectations) -> Result<Verification> {
        info!(object_id = expected.object_id, "Validating AAD app");
        let mut verification = Verification::new();

        // Directory replication lags behind creation, so 404 is retried here.
        let description = format!("get AAD app {}", expected.object_id);
        let found = retry_if(
            &self.lookup_policy,
            &description,
            || self.graph.get_aad_app(&expected.object_id),
            |e| match e {
                CloudError::NotFound => RetryDecision::Retry,
                other => other.retry_decision(),
            },
        )
        .await;
        let app = match found {
            Ok(app) => app,
            Err(CloudError::NotFound) => {
                verification.fail(format!("AAD app {} does not exist", expected.object_id));
                return Ok(verification);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(client_id) = &expected.client_id {
            verification.check_eq("AAD app client id", client_id.as_str(), app.app_id.as_str());
        }
        if let Some(name) = &expected.display_name {
            verification.check_eq("AAD app display name", name.as_str(), app.display_name.as_str());
        }
        if let Some(uri) = &expected.identifier_uri {
            verification.check(
                app.identifier_uris.iter().any(|u| u == uri),
                format!(
                    "AAD app identifier URIs {:?} do not contain {uri}",
                    app.identifier_uris
                ),
            );
        }
        if let Some(owner) = &expected.owner {
            let owners = self.graph.list_owners(&expected.object_id).await?;
            verification.check(
                owners.iter().any(|o| {
                    o.user_principal_name
                        .as_deref()
                        .is_some_and(|upn| upn.eq_ignore_ascii_case(owner))
                }),
                format!("AAD app {} is not owned by {owner}", expected.object_id),
            );
        }

        Ok(verification)
    }
}
