//! Data models returned by the cloud APIs.
//!
//! Only the fields the E2E validators look at are modelled. Unknown fields
//! are ignored, and most fields default so that partially populated
//! responses still deserialize.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A directory (Entra ID) application registration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AadApp {
    /// Object id of the application.
    #[serde(default)]
    pub id: String,

    /// Client id of the application.
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub identifier_uris: Vec<String>,

    #[serde(default)]
    pub sign_in_audience: Option<String>,

    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub password_credentials: Vec<PasswordCredential>,

    /// Permissions the app requests on other apps' APIs.
    #[serde(default)]
    pub required_resource_access: Vec<RequiredResourceAccess>,

    #[serde(default)]
    pub api: Option<ApiApplication>,

    #[serde(default)]
    pub web: Option<WebApplication>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    #[serde(default)]
    pub key_id: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResourceAccess {
    /// Client id of the app exposing the API.
    pub resource_app_id: String,

    #[serde(default)]
    pub resource_access: Vec<ResourceAccess>,
}

/// A delegated scope (`Scope`) or application role (`Role`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceAccess {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplication {
    /// Clients consented together with this app.
    #[serde(default)]
    pub known_client_applications: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApplication {
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    #[serde(default)]
    pub implicit_grant_settings: Option<ImplicitGrantSettings>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitGrantSettings {
    #[serde(default)]
    pub enable_id_token_issuance: Option<bool>,

    #[serde(default)]
    pub enable_access_token_issuance: Option<bool>,
}

/// The tenant-local instance of an application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub app_id: String,
}

/// A directory object such as an application owner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub user_principal_name: Option<String>,
}

/// A Teams app installed for a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledTeamsApp {
    pub id: String,

    #[serde(default)]
    pub teams_app: Option<TeamsAppRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsAppRef {
    pub id: String,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,
}

/// An ARM resource group.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,

    /// Only present when listed with `$expand=createdTime`.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// An App Service site (web app or function app).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub properties: SiteProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProperties {
    /// `Running` or `Stopped`.
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub default_host_name: Option<String>,

    #[serde(default)]
    pub server_farm_id: Option<String>,
}

/// `POST .../config/appsettings/list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Sku {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

/// An App Service plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePlan {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub sku: Sku,
}

/// A bot channel registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotService {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub properties: BotServiceProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotServiceProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    /// Messaging endpoint, e.g. `https://site.azurewebsites.net/api/messages`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub msa_app_id: Option<String>,
}

/// An API Management service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApimService {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub sku: Sku,
}

/// Body used to create an API Management service.
#[derive(Debug, Clone, Serialize)]
pub struct ApimServiceCreate {
    pub location: String,
    pub sku: Sku,
    pub properties: ApimServiceCreateProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApimServiceCreateProperties {
    pub publisher_name: String,
    pub publisher_email: String,
}

/// Generic ARM child resource: `{ id, name, properties }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmResource<P> {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub properties: P,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub subscription_required: Option<bool>,

    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationServerProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_registration_endpoint: Option<String>,

    #[serde(default)]
    pub authorization_endpoint: Option<String>,

    #[serde(default)]
    pub token_endpoint: Option<String>,

    #[serde(default)]
    pub default_scope: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersionSetProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub versioning_scheme: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub api_version_set_id: Option<String>,

    #[serde(default)]
    pub service_url: Option<String>,

    #[serde(default)]
    pub subscription_required: Option<bool>,

    #[serde(default)]
    pub protocols: Vec<String>,

    #[serde(default)]
    pub authentication_settings: Option<ApiAuthenticationSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAuthenticationSettings {
    #[serde(default, rename = "oAuth2")]
    pub o_auth2: Option<ApiOAuth2Settings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOAuth2Settings {
    #[serde(default)]
    pub authorization_server_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionProperties {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
}

pub type ApimProduct = ArmResource<ProductProperties>;
pub type AuthorizationServer = ArmResource<AuthorizationServerProperties>;
pub type ApiVersionSet = ArmResource<ApiVersionSetProperties>;
pub type Api = ArmResource<ApiProperties>;
pub type ApimSubscription = ArmResource<SubscriptionProperties>;

/// A Key Vault (management plane view).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyVault {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub properties: KeyVaultProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub vault_uri: Option<String>,

    #[serde(default)]
    pub access_policies: Vec<AccessPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    pub tenant_id: String,
    pub object_id: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
}

/// A Key Vault secret (data plane view).
#[derive(Debug, Clone, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub id: Option<String>,

    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlServerProperties {
    #[serde(default)]
    pub fully_qualified_domain_name: Option<String>,

    #[serde(default)]
    pub administrator_login: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleProperties {
    pub start_ip_address: String,
    pub end_ip_address: String,
}

pub type SqlServer = ArmResource<SqlServerProperties>;
pub type FirewallRule = ArmResource<FirewallRuleProperties>;

/// An app registered in the Teams developer portal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevPortalApp {
    #[serde(default)]
    pub teams_app_id: String,

    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub short_name: Option<String>,
}

/// An app submitted to the organisation catalog and awaiting approval.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedApp {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub publishing_state: Option<String>,
}
