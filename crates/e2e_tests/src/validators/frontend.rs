//! Tab hosting checks.

use std::collections::HashMap;

use anyhow::Result;
use cloud_client::resource_id::{get_resource_group_name, get_site_name};
use cloud_client::{Error as CloudError, WebAppClient};
use tracing::info;

use super::output;
use crate::Verification;

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendExpectations {
    pub resource_group: String,
    pub site_name: String,
    /// Host name the CLI reported, e.g. `TAB_DOMAIN`.
    pub domain: Option<String>,
}

impl FrontendExpectations {
    /// Reads `TAB_AZURE_APP_SERVICE_RESOURCE_ID` and, if present, `TAB_DOMAIN`.
    pub fn from_outputs(outputs: &HashMap<String, String>) -> Result<Self> {
        let site_id = output(outputs, "TAB_AZURE_APP_SERVICE_RESOURCE_ID")?;
        Ok(Self {
            resource_group: get_resource_group_name(site_id)?,
            site_name: get_site_name(site_id)?,
            domain: outputs.get("TAB_DOMAIN").filter(|d| !d.is_empty()).cloned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FrontendValidator {
    web_apps: WebAppClient,
}

impl FrontendValidator {
    pub fn new(web_apps: WebAppClient) -> Self {
        Self { web_apps }
    }

    pub async fn validate(&self, expected: &FrontendExpectations) -> Result<Verification> {
        info!(site = expected.site_name, "Validating frontend hosting");
        let mut verification = Verification::new();

        let site = match self
            .web_apps
            .get_site(&expected.resource_group, &expected.site_name)
            .await
        {
            Ok(site) => site,
            Err(CloudError::NotFound) => {
                verification.fail(format!("Site {} does not exist", expected.site_name));
                return Ok(verification);
            }
            Err(e) => return Err(e.into()),
        };

        let state = site.properties.state.unwrap_or_default();
        verification.check(
            state.eq_ignore_ascii_case("running"),
            format!("Site {} is {state:?}, expected Running", expected.site_name),
        );
        if let Some(domain) = &expected.domain {
            verification.check_eq(
                "site host name",
                Some(domain.as_str()),
                site.properties.default_host_name.as_deref(),
            );
        }

        Ok(verification)
    }
}
