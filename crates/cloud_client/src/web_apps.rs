//! App Service sites, their settings and their plans.

use std::collections::HashMap;

use reqwest::Method;
use tracing::instrument;

use crate::models::{AppSettings, ServicePlan, Site};
use crate::{arm_resource_path, CloudClient, Result};

#[cfg(test)]
#[path = "web_apps_tests.rs"]
mod tests;

pub const WEB_API_VERSION: &str = "2022-03-01";

#[derive(Debug, Clone)]
pub struct WebAppClient {
    client: CloudClient,
    subscription_id: String,
}

impl WebAppClient {
    pub fn new(client: CloudClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn path(&self, resource_group: &str, resource: &str) -> String {
        arm_resource_path(
            &self.subscription_id,
            resource_group,
            &format!("Microsoft.Web/{resource}"),
            WEB_API_VERSION,
        )
    }

    #[instrument(skip(self))]
    pub async fn get_site(&self, resource_group: &str, site_name: &str) -> Result<Site> {
        self.client
            .get(&self.path(resource_group, &format!("sites/{site_name}")))
            .await
    }

    /// Reads the application settings of a site.
    ///
    /// The list endpoint is a POST because it returns secrets.
    #[instrument(skip(self))]
    pub async fn list_app_settings(
        &self,
        resource_group: &str,
        site_name: &str,
    ) -> Result<HashMap<String, String>> {
        let value = self
            .client
            .request(
                Method::POST,
                &self.path(
                    resource_group,
                    &format!("sites/{site_name}/config/appsettings/list"),
                ),
                None,
            )
            .await?;
        let settings: AppSettings = serde_json::from_value(value)?;
        Ok(settings.properties)
    }

    pub async fn get_service_plan(
        &self,
        resource_group: &str,
        plan_name: &str,
    ) -> Result<ServicePlan> {
        self.client
            .get(&self.path(resource_group, &format!("serverfarms/{plan_name}")))
            .await
    }
}
