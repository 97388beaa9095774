//! API Management checks for projects that import their API into APIM.

use anyhow::Result;
use backoff_executor::{retry_if, RetryDecision, RetryPolicy, Retryable};
use cloud_client::models::AadApp;
use cloud_client::resource_id::{
    get_apim_product_name, get_apim_service_name, get_authorization_server_name,
    get_resource_group_name,
};
use cloud_client::{ApimClient, Error as CloudError, GraphClient};
use tracing::info;

use crate::Verification;

#[cfg(test)]
#[path = "apim_tests.rs"]
mod tests;

/// SKU the templates provision.
pub const APIM_SKU: &str = "Consumption";

const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApimExpectations {
    pub resource_group: String,
    pub service_name: String,
    pub product_name: String,
    pub auth_server_name: String,
    /// Client id of the AAD app APIM authenticates with.
    pub client_id: String,
    /// Identifier URI of the backend's AAD app.
    pub application_id_uri: String,
    pub tenant_id: String,
    /// When set, the API must be attached to the product.
    pub api_id: Option<String>,
}

impl ApimExpectations {
    /// Derives the service, product and authorization server names from
    /// their resource ids.
    pub fn from_resource_ids(
        product_id: &str,
        auth_server_id: &str,
        client_id: impl Into<String>,
        application_id_uri: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            resource_group: get_resource_group_name(product_id)?,
            service_name: get_apim_service_name(product_id)?,
            product_name: get_apim_product_name(product_id)?,
            auth_server_name: get_authorization_server_name(auth_server_id)?,
            client_id: client_id.into(),
            application_id_uri: application_id_uri.into(),
            tenant_id: tenant_id.into(),
            api_id: None,
        })
    }

    pub fn with_api(mut self, api_id: impl Into<String>) -> Self {
        self.api_id = Some(api_id.into());
        self
    }

    fn oauth_endpoint(&self, kind: &str) -> String {
        format!("{LOGIN_ENDPOINT}/{}/oauth2/v2.0/{kind}", self.tenant_id)
    }
}

/// What deploy should have imported into the service checked by
/// [`ApimValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApimDeployExpectations {
    pub service: ApimExpectations,
    pub api_prefix: String,
    pub resource_name_suffix: String,
    pub api_version: String,
    pub version_set_id: String,
    /// Title of the OpenAPI document, used as the API display name.
    pub display_name: String,
    /// Endpoint of the Function app serving the API.
    pub function_endpoint: String,
}

impl ApimDeployExpectations {
    /// `{prefix}-{suffix}`, the path the API is served under.
    pub fn api_path(&self) -> String {
        format!("{}-{}", self.api_prefix, self.resource_name_suffix)
    }

    /// `{prefix}-{suffix}-{version}`
    pub fn api_id(&self) -> String {
        format!("{}-{}", self.api_path(), self.api_version)
    }

    fn service_url(&self) -> String {
        format!("{}/api", self.function_endpoint.trim_end_matches('/'))
    }
}

/// The AAD registrations wired up for APIM during provision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApimAadExpectations {
    /// Object id of the client registration APIM signs in with.
    pub client_object_id: String,
    /// Client id of the client registration APIM signs in with.
    pub client_client_id: String,
    /// Object id of the backend's registration.
    pub app_object_id: String,
    /// Client id of the backend's registration.
    pub app_client_id: String,
    /// Id of the delegated scope the backend exposes.
    pub scope_id: String,
}

#[derive(Debug, Clone)]
pub struct ApimValidator {
    apim: ApimClient,
    graph: GraphClient,
    lookup_policy: RetryPolicy,
}

impl ApimValidator {
    pub fn new(apim: ApimClient, graph: GraphClient) -> Self {
        Self {
            apim,
            graph,
            lookup_policy: RetryPolicy::default(),
        }
    }

    /// Overrides how long AAD registrations may take to settle.
    pub fn with_lookup_policy(mut self, policy: RetryPolicy) -> Self {
        self.lookup_policy = policy;
        self
    }

    pub async fn validate(&self, expected: &ApimExpectations) -> Result<Verification> {
        info!(
            service = expected.service_name,
            product = expected.product_name,
            "Validating API Management"
        );
        let mut verification = Verification::new();
        let rg = expected.resource_group.as_str();
        let service_name = expected.service_name.as_str();

        match self.apim.get_service(rg, service_name).await {
            Ok(service) => verification.check_eq("APIM SKU", APIM_SKU, service.sku.name.as_str()),
            Err(CloudError::NotFound) => {
                verification.fail(format!("APIM service {service_name} does not exist"));
                return Ok(verification);
            }
            Err(e) => return Err(e.into()),
        }

        match self
            .apim
            .get_authorization_server(rg, service_name, &expected.auth_server_name)
            .await
        {
            Ok(server) => {
                let props = server.properties;
                let scope = format!("{}/.default", expected.application_id_uri);
                let authorize = expected.oauth_endpoint("authorize");
                let token = expected.oauth_endpoint("token");
                verification.check_eq(
                    "OAuth server client id",
                    Some(expected.client_id.as_str()),
                    props.client_id.as_deref(),
                );
                verification.check_eq(
                    "OAuth server default scope",
                    Some(scope.as_str()),
                    props.default_scope.as_deref(),
                );
                verification.check_eq(
                    "OAuth authorization endpoint",
                    Some(authorize.as_str()),
                    props.authorization_endpoint.as_deref(),
                );
                verification.check_eq(
                    "OAuth token endpoint",
                    Some(token.as_str()),
                    props.token_endpoint.as_deref(),
                );
            }
            Err(CloudError::NotFound) => verification.fail(format!(
                "Authorization server {} does not exist",
                expected.auth_server_name
            )),
            Err(e) => return Err(e.into()),
        }

        match self
            .apim
            .get_product(rg, service_name, &expected.product_name)
            .await
        {
            Ok(product) => verification.check_eq(
                "product subscriptionRequired",
                Some(false),
                product.properties.subscription_required,
            ),
            Err(CloudError::NotFound) => {
                verification.fail(format!("Product {} does not exist", expected.product_name))
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(api_id) = &expected.api_id {
            let attached = self
                .apim
                .product_has_api(rg, service_name, &expected.product_name, api_id)
                .await?;
            verification.check(
                attached,
                format!("API {api_id} is not part of product {}", expected.product_name),
            );
        }

        Ok(verification)
    }

    /// Checks the version set, the imported API and its product membership.
    pub async fn validate_deploy(
        &self,
        expected: &ApimDeployExpectations,
    ) -> Result<Verification> {
        let service = &expected.service;
        let rg = service.resource_group.as_str();
        let service_name = service.service_name.as_str();
        let api_id = expected.api_id();
        info!(
            service = service_name,
            api = api_id.as_str(),
            "Validating API Management deploy"
        );
        let mut verification = Verification::new();

        match self
            .apim
            .get_api_version_set(rg, service_name, &expected.version_set_id)
            .await
        {
            Ok(_) => {}
            Err(CloudError::NotFound) => verification.fail(format!(
                "API version set {} does not exist",
                expected.version_set_id
            )),
            Err(e) => return Err(e.into()),
        }

        match self.apim.get_api(rg, service_name, &api_id).await {
            Ok(api) => {
                let props = api.properties;
                let api_path = expected.api_path();
                let service_url = expected.service_url();
                let auth_server = props
                    .authentication_settings
                    .and_then(|settings| settings.o_auth2)
                    .and_then(|oauth| oauth.authorization_server_id);

                verification.check_eq("API path", Some(api_path.as_str()), props.path.as_deref());
                verification.check_eq(
                    "API authorization server",
                    Some(service.auth_server_name.as_str()),
                    auth_server.as_deref(),
                );
                verification.check(
                    props
                        .api_version_set_id
                        .as_deref()
                        .is_some_and(|id| id.contains(&expected.version_set_id)),
                    format!(
                        "API version set id {:?} does not reference {}",
                        props.api_version_set_id, expected.version_set_id
                    ),
                );
                verification.check_eq(
                    "API service URL",
                    Some(service_url.as_str()),
                    props.service_url.as_deref(),
                );
                verification.check_eq(
                    "API display name",
                    Some(expected.display_name.as_str()),
                    props.display_name.as_deref(),
                );
                verification.check_eq(
                    "API version",
                    Some(expected.api_version.as_str()),
                    props.api_version.as_deref(),
                );
                verification.check_eq(
                    "API subscriptionRequired",
                    Some(false),
                    props.subscription_required,
                );
                verification.check(
                    props.protocols.iter().any(|p| p == "https"),
                    format!("API protocols {:?} do not include https", props.protocols),
                );
            }
            Err(CloudError::NotFound) => {
                verification.fail(format!("API {api_id} does not exist"));
                return Ok(verification);
            }
            Err(e) => return Err(e.into()),
        }

        let attached = self
            .apim
            .product_has_api(rg, service_name, &service.product_name, &api_id)
            .await?;
        verification.check(
            attached,
            format!("API {api_id} is not part of product {}", service.product_name),
        );

        Ok(verification)
    }

    /// Checks the registration APIM uses to call the backend.
    pub async fn validate_client_aad(
        &self,
        expected: &ApimAadExpectations,
    ) -> Result<Verification> {
        info!(object_id = expected.client_object_id, "Validating APIM client AAD app");
        let mut verification = Verification::new();

        let ready = |app: &AadApp| {
            !app.password_credentials.is_empty() && !app.required_resource_access.is_empty()
        };
        let Some(app) = self.wait_for_app(&expected.client_object_id, ready).await? else {
            verification.fail(format!(
                "APIM client AAD app {} does not exist",
                expected.client_object_id
            ));
            return Ok(verification);
        };

        let id_tokens = app
            .web
            .as_ref()
            .and_then(|web| web.implicit_grant_settings.as_ref())
            .and_then(|grants| grants.enable_id_token_issuance);
        verification.check_eq("APIM client ID token issuance", Some(true), id_tokens);
        verification.check(
            !app.password_credentials.is_empty(),
            "APIM client AAD app has no client secret",
        );

        match app
            .required_resource_access
            .iter()
            .find(|access| access.resource_app_id == expected.app_client_id)
        {
            Some(access) => verification.check(
                access
                    .resource_access
                    .iter()
                    .any(|grant| grant.id == expected.scope_id && grant.kind == "Scope"),
                format!(
                    "APIM client AAD app is not granted scope {} of {}",
                    expected.scope_id, expected.app_client_id
                ),
            ),
            None => verification.fail(format!(
                "APIM client AAD app requests no access to {}",
                expected.app_client_id
            )),
        }

        Ok(verification)
    }

    /// Checks that the backend's registration trusts the APIM client and
    /// has a service principal.
    pub async fn validate_app_aad(
        &self,
        expected: &ApimAadExpectations,
    ) -> Result<Verification> {
        info!(object_id = expected.app_object_id, "Validating AAD app behind APIM");
        let mut verification = Verification::new();

        let ready = |app: &AadApp| {
            app.api
                .as_ref()
                .is_some_and(|api| !api.known_client_applications.is_empty())
        };
        match self.wait_for_app(&expected.app_object_id, ready).await? {
            Some(app) => {
                let known = app
                    .api
                    .map(|api| api.known_client_applications)
                    .unwrap_or_default();
                verification.check(
                    known.contains(&expected.client_client_id),
                    format!(
                        "Known client applications {known:?} do not include {}",
                        expected.client_client_id
                    ),
                );
            }
            None => verification.fail(format!(
                "AAD app {} does not exist",
                expected.app_object_id
            )),
        }

        let description = format!("list service principals of {}", expected.app_client_id);
        let found = retry_if(
            &self.lookup_policy,
            &description,
            || async move {
                let principals = self
                    .graph
                    .list_service_principals_by_app_id(&expected.app_client_id)
                    .await?;
                if principals.is_empty() {
                    Err(CloudError::Pending(format!(
                        "no service principal for {}",
                        expected.app_client_id
                    )))
                } else {
                    Ok(principals)
                }
            },
            |e| e.retry_decision(),
        )
        .await;
        match found {
            Ok(principals) => verification.check(
                principals
                    .iter()
                    .any(|principal| principal.app_id == expected.app_client_id),
                format!("No service principal for {}", expected.app_client_id),
            ),
            Err(CloudError::Pending(message)) => verification.fail(message),
            Err(e) => return Err(e.into()),
        }

        Ok(verification)
    }

    /// Fetches an app, retrying while it is missing or `ready` rejects it.
    ///
    /// Returns `Ok(None)` when the app never appeared. An app that never
    /// became ready is returned as last seen so the caller can report why.
    async fn wait_for_app<R>(
        &self,
        object_id: &str,
        ready: R,
    ) -> std::result::Result<Option<AadApp>, CloudError>
    where
        R: Fn(&AadApp) -> bool,
    {
        let ready = &ready;
        let description = format!("get AAD app {object_id}");
        let found = retry_if(
            &self.lookup_policy,
            &description,
            || async move {
                let app = self.graph.get_aad_app(object_id).await?;
                if ready(&app) {
                    Ok(app)
                } else {
                    Err(CloudError::Pending(format!("AAD app {object_id} is not set up yet")))
                }
            },
            |e| match e {
                CloudError::NotFound => RetryDecision::Retry,
                other => other.retry_decision(),
            },
        )
        .await;

        match found {
            Ok(app) => Ok(Some(app)),
            Err(CloudError::NotFound) => Ok(None),
            Err(CloudError::Pending(_)) => self.graph.get_aad_app(object_id).await.map(Some),
            Err(e) => Err(e),
        }
    }
}
