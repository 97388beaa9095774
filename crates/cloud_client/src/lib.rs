//! Crate for talking to the cloud REST APIs the E2E suite validates against.
//!
//! [`CloudClient`] is a small bearer-token JSON requester. Every request it
//! sends runs through the backoff executor, so throttling, server errors and
//! transport failures are retried according to the client's [`RetryPolicy`]
//! while 404/409 and other client errors are surfaced immediately.
//!
//! The resource-specific clients ([`GraphClient`], [`ResourceGroupManager`],
//! [`WebAppClient`] and friends) are thin typed wrappers over it.

use std::sync::Arc;
use std::time::Duration;

use auth_handler::TokenProvider;
use backoff_executor::{retry_classified, RetryPolicy};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod apim;
pub mod bot_service;
pub mod dev_portal;
pub mod graph;
pub mod key_vault;
pub mod models;
pub mod resource_groups;
pub mod resource_id;
pub mod sql;
pub mod storage;
pub mod web_apps;

pub use apim::ApimClient;
pub use bot_service::BotServiceClient;
pub use dev_portal::DevPortalClient;
pub use graph::GraphClient;
pub use key_vault::KeyVaultClient;
pub use resource_groups::ResourceGroupManager;
pub use resource_id::ResourceId;
pub use sql::SqlClient;
pub use storage::StorageClient;
pub use web_apps::WebAppClient;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Azure Resource Manager endpoint.
pub const ARM_ENDPOINT: &str = "https://management.azure.com";

/// Microsoft Graph v1.0 endpoint.
pub const GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Teams developer portal endpoint.
pub const DEV_PORTAL_ENDPOINT: &str = "https://dev.teams.microsoft.com";

/// Result type for cloud API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One page of a list response.
///
/// ARM calls the continuation `nextLink`, Graph calls it `@odata.nextLink`.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,

    #[serde(default, rename = "nextLink", alias = "@odata.nextLink")]
    next_link: Option<String>,
}

/// A bearer-token JSON client bound to one API endpoint and token scope.
#[derive(Clone)]
pub struct CloudClient {
    base_url: String,
    scope: String,
    tokens: Arc<dyn TokenProvider>,
    http: reqwest::Client,
    headers: HeaderMap,
    retry_policy: RetryPolicy,
}

impl CloudClient {
    /// Creates a client for `base_url`, requesting tokens for `scope`.
    ///
    /// Requests use [`RetryPolicy::default`] until
    /// [`with_retry_policy`](Self::with_retry_policy) says otherwise.
    pub fn new(
        base_url: impl Into<String>,
        scope: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            scope: scope.into(),
            tokens,
            http: reqwest::Client::new(),
            headers: HeaderMap::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Client for Azure Resource Manager.
    pub fn arm(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(ARM_ENDPOINT, auth_handler::AZURE_MANAGEMENT_SCOPE, tokens)
    }

    /// Client for Microsoft Graph.
    pub fn graph(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(GRAPH_ENDPOINT, auth_handler::GRAPH_SCOPE, tokens)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Adds a header sent with every request, e.g. `x-ms-version` for Storage.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Resolves `path` against the base URL. Absolute URLs (paging links) pass through.
    fn url(&self, path: &str) -> Result<Url> {
        let raw = if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Sends one request and returns the response body on success.
    async fn send_once(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<String> {
        let token = self
            .tokens
            .get_access_token(&[self.scope.as_str()])
            .await
            .map_err(|e| Error::AuthError(e.to_string()))?;

        let mut request = self
            .http
            .request(method, url.clone())
            .headers(self.headers.clone())
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        debug!(
            status = status.as_u16(),
            url = %url,
            "Cloud API returned an error status"
        );
        Err(error_for_status(status, text, retry_after))
    }

    /// Sends a request with retries and returns the raw response body.
    #[instrument(skip(self, body), fields(base_url = %self.base_url))]
    pub async fn request_text(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String> {
        let url = &self.url(path)?;
        let description = format!("{method} {}", url.path());
        retry_classified(&self.retry_policy, &description, || {
            self.send_once(method.clone(), url, body)
        })
        .await
    }

    /// Sends a request with retries and parses the JSON response.
    ///
    /// An empty body (204, 202) comes back as `Value::Null`.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let text = self.request_text(method, path, body).await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Like [`get`](Self::get), but maps 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Collects every item of a list endpoint, following continuation links.
    pub async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(path.to_string());

        while let Some(link) = next {
            let page: Page<T> = self.get(&link).await?;
            debug!(count = page.value.len(), "Received page");
            items.extend(page.value);
            next = page.next_link.filter(|l| !l.is_empty());
        }

        Ok(items)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::PUT, path, Some(&body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::POST, path, Some(&body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn patch_json<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(&body)).await?;
        Ok(())
    }

    /// Issues a DELETE. The caller decides what a 404 means.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request_text(Method::DELETE, path, None)
            .await
            .map(|_| ())
            .inspect_err(|e| {
                if !matches!(e, Error::NotFound) {
                    error!(path = path, error = %e, "Delete request failed");
                }
            })
    }
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClient")
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Builds `/subscriptions/{sub}/resourceGroups/{rg}/providers/{resource}?api-version={v}`.
pub(crate) fn arm_resource_path(
    subscription_id: &str,
    resource_group: &str,
    resource: &str,
    api_version: &str,
) -> String {
    format!(
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}\
         /providers/{resource}?api-version={api_version}"
    )
}

/// Reads a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Client pointed at a mock server with a fast retry policy.
#[cfg(test)]
pub(crate) fn mock_client(base_url: &str) -> CloudClient {
    CloudClient::new(
        base_url,
        "https://mock/.default",
        Arc::new(auth_handler::StaticTokenProvider::new("test-token")),
    )
    .with_retry_policy(RetryPolicy::fixed(3, Duration::from_millis(10)))
}

fn error_for_status(status: StatusCode, body: String, retry_after: Option<Duration>) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound,
        StatusCode::CONFLICT => Error::Conflict(body),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimitExceeded { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthError(body),
        _ => Error::Status {
            status: status.as_u16(),
            body,
        },
    }
}
