//! App Service plan checks.

use anyhow::Result;
use cloud_client::{Error as CloudError, WebAppClient};
use tracing::info;

use crate::Verification;

#[cfg(test)]
#[path = "service_plan_tests.rs"]
mod tests;

#[derive(Debug, Clone)]
pub struct ServicePlanValidator {
    web_apps: WebAppClient,
}

impl ServicePlanValidator {
    pub fn new(web_apps: WebAppClient) -> Self {
        Self { web_apps }
    }

    /// Checks that `plan_name` exists and runs on `expected_sku`, e.g. `B1`.
    pub async fn validate(
        &self,
        resource_group: &str,
        plan_name: &str,
        expected_sku: &str,
    ) -> Result<Verification> {
        info!(plan = plan_name, sku = expected_sku, "Validating service plan");
        let mut verification = Verification::new();

        match self.web_apps.get_service_plan(resource_group, plan_name).await {
            Ok(plan) => {
                verification.check_eq("service plan SKU", expected_sku, plan.sku.name.as_str());
            }
            Err(CloudError::NotFound) => {
                verification.fail(format!("Service plan {plan_name} does not exist"));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(verification)
    }
}
