//! API Management services and the entities the CLI provisions inside them.

use serde_json::json;
use tracing::{info, instrument};

use crate::models::{
    Api, ApiVersionSet, ApimProduct, ApimService, ApimServiceCreate, ApimServiceCreateProperties,
    ApimSubscription, AuthorizationServer, Sku,
};
use crate::{arm_resource_path, CloudClient, Error, Result};

#[cfg(test)]
#[path = "apim_tests.rs"]
mod tests;

pub const APIM_API_VERSION: &str = "2022-08-01";

/// Publisher recorded on services created by the suite.
pub const TEST_PUBLISHER: &str = "teamsfx-test@microsoft.com";

#[derive(Debug, Clone)]
pub struct ApimClient {
    client: CloudClient,
    subscription_id: String,
}

impl ApimClient {
    pub fn new(client: CloudClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn path(&self, resource_group: &str, service_name: &str, child: Option<&str>) -> String {
        let resource = match child {
            Some(child) => format!("Microsoft.ApiManagement/service/{service_name}/{child}"),
            None => format!("Microsoft.ApiManagement/service/{service_name}"),
        };
        arm_resource_path(
            &self.subscription_id,
            resource_group,
            &resource,
            APIM_API_VERSION,
        )
    }

    /// Creates a Consumption-tier service so a test can reuse an existing instance.
    #[instrument(skip(self))]
    pub async fn create_or_update_service(
        &self,
        resource_group: &str,
        service_name: &str,
        location: &str,
    ) -> Result<ApimService> {
        let body = ApimServiceCreate {
            location: location.to_string(),
            sku: Sku {
                name: "Consumption".to_string(),
                tier: None,
                capacity: Some(0),
            },
            properties: ApimServiceCreateProperties {
                publisher_name: TEST_PUBLISHER.to_string(),
                publisher_email: TEST_PUBLISHER.to_string(),
            },
        };
        let service: ApimService = self
            .client
            .put_json(&self.path(resource_group, service_name, None), &body)
            .await?;
        info!(
            service_name = service_name,
            "[Successfully] Created API Management service"
        );
        Ok(service)
    }

    pub async fn get_service(
        &self,
        resource_group: &str,
        service_name: &str,
    ) -> Result<ApimService> {
        self.client
            .get(&self.path(resource_group, service_name, None))
            .await
    }

    pub async fn get_product(
        &self,
        resource_group: &str,
        service_name: &str,
        product_name: &str,
    ) -> Result<ApimProduct> {
        self.client
            .get(&self.path(
                resource_group,
                service_name,
                Some(&format!("products/{product_name}")),
            ))
            .await
    }

    pub async fn get_authorization_server(
        &self,
        resource_group: &str,
        service_name: &str,
        server_name: &str,
    ) -> Result<AuthorizationServer> {
        self.client
            .get(&self.path(
                resource_group,
                service_name,
                Some(&format!("authorizationServers/{server_name}")),
            ))
            .await
    }

    pub async fn get_api_version_set(
        &self,
        resource_group: &str,
        service_name: &str,
        version_set_id: &str,
    ) -> Result<ApiVersionSet> {
        self.client
            .get(&self.path(
                resource_group,
                service_name,
                Some(&format!("apiVersionSets/{version_set_id}")),
            ))
            .await
    }

    pub async fn get_api(
        &self,
        resource_group: &str,
        service_name: &str,
        api_id: &str,
    ) -> Result<Api> {
        self.client
            .get(&self.path(resource_group, service_name, Some(&format!("apis/{api_id}"))))
            .await
    }

    /// Reports whether `api_id` is attached to a product.
    pub async fn product_has_api(
        &self,
        resource_group: &str,
        service_name: &str,
        product_name: &str,
        api_id: &str,
    ) -> Result<bool> {
        let apis: Vec<Api> = self
            .client
            .get_paged(&self.path(
                resource_group,
                service_name,
                Some(&format!("products/{product_name}/apis")),
            ))
            .await?;
        Ok(apis.iter().any(|api| api.name == api_id))
    }

    pub async fn list_subscriptions(
        &self,
        resource_group: &str,
        service_name: &str,
    ) -> Result<Vec<ApimSubscription>> {
        self.client
            .get_paged(&self.path(resource_group, service_name, Some("subscriptions")))
            .await
    }

    /// Creates a subscription scoped to `scope` (e.g. `/products/<id>`).
    #[instrument(skip(self))]
    pub async fn create_subscription(
        &self,
        resource_group: &str,
        service_name: &str,
        subscription_name: &str,
        scope: &str,
    ) -> Result<ApimSubscription> {
        let body = json!({
            "properties": {
                "displayName": subscription_name,
                "scope": scope,
            }
        });
        self.client
            .put_json(
                &self.path(
                    resource_group,
                    service_name,
                    Some(&format!("subscriptions/{subscription_name}")),
                ),
                &body,
            )
            .await
    }

    /// Deletes a subscription. A missing subscription counts as deleted.
    pub async fn delete_subscription(
        &self,
        resource_group: &str,
        service_name: &str,
        subscription_name: &str,
    ) -> Result<()> {
        match self
            .client
            .delete(&self.path(
                resource_group,
                service_name,
                Some(&format!("subscriptions/{subscription_name}")),
            ))
            .await
        {
            Ok(()) | Err(Error::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
