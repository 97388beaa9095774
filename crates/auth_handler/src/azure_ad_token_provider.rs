//! Directory (Azure AD) token provider.
//!
//! Provides a concrete implementation of `TokenProvider` backed by the
//! `oauth2/v2.0/token` endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::{AuthError, AuthResult, TokenProvider};

#[cfg(test)]
#[path = "azure_ad_token_provider_tests.rs"]
mod tests;

/// Public cloud login host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Credential used against the token endpoint.
pub enum Credential {
    /// `client_credentials` grant for a service principal.
    ServicePrincipal {
        client_id: String,
        client_secret: SecretString,
    },

    /// `password` grant for a test account.
    UserPassword {
        client_id: String,
        username: String,
        password: SecretString,
    },
}

impl Credential {
    fn client_id(&self) -> &str {
        match self {
            Credential::ServicePrincipal { client_id, .. } => client_id,
            Credential::UserPassword { client_id, .. } => client_id,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ServicePrincipal { client_id, .. } => f
                .debug_struct("ServicePrincipal")
                .field("client_id", client_id)
                .field("client_secret", &"<REDACTED>")
                .finish(),
            Credential::UserPassword {
                client_id,
                username,
                ..
            } => f
                .debug_struct("UserPassword")
                .field("client_id", client_id)
                .field("username", username)
                .field("password", &"<REDACTED>")
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Token provider for a single tenant and credential.
///
/// # Examples
///
/// ```rust,no_run
/// use auth_handler::{AzureAdTokenProvider, Credential, TokenProvider, GRAPH_SCOPE};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = AzureAdTokenProvider::new(
///     "my-tenant-id",
///     Credential::UserPassword {
///         client_id: "client-id".to_string(),
///         username: "user@contoso.onmicrosoft.com".to_string(),
///         password: "secret".to_string().into(),
///     },
/// );
///
/// let token = provider.get_access_token(&[GRAPH_SCOPE]).await?;
/// println!("Got token: {} chars", token.len());
/// # Ok(())
/// # }
/// ```
pub struct AzureAdTokenProvider {
    authority_host: String,
    tenant_id: String,
    credential: Credential,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl AzureAdTokenProvider {
    pub fn new(tenant_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id: tenant_id.into(),
            credential,
            http: reqwest::Client::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Points the provider at a different login host (sovereign clouds, tests).
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }

    fn form(&self, scope: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("client_id", self.credential.client_id().to_string()),
            ("scope", scope.to_string()),
        ];
        match &self.credential {
            Credential::ServicePrincipal { client_secret, .. } => {
                form.push(("grant_type", "client_credentials".to_string()));
                form.push(("client_secret", client_secret.expose_secret().to_string()));
            }
            Credential::UserPassword {
                username, password, ..
            } => {
                form.push(("grant_type", "password".to_string()));
                form.push(("username", username.clone()));
                form.push(("password", password.expose_secret().to_string()));
            }
        }
        form
    }

    async fn request_token(&self, scope: &str) -> AuthResult<CachedToken> {
        let response = self
            .http
            .post(self.token_url())
            .form(&self.form(scope))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                error = body.error,
                tenant_id = self.tenant_id,
                "Token endpoint refused the request"
            );
            if body.error == "invalid_grant" || body.error == "invalid_client" {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                message: if body.error_description.is_empty() {
                    body.error
                } else {
                    body.error_description
                },
            });
        }

        let body: TokenResponse = response.json().await?;
        if body.access_token.is_empty() {
            return Err(AuthError::Other("Failed to get token.".to_string()));
        }

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for AzureAdTokenProvider {
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    async fn get_access_token(&self, scopes: &[&str]) -> AuthResult<String> {
        let scope = scopes.join(" ");
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.get(&scope) {
            if cached.expires_at > Instant::now() {
                debug!(scope = scope, "Using cached access token");
                return Ok(cached.token.clone());
            }
        }

        info!(scope = scope, "Requesting access token");
        let fresh = self.request_token(&scope).await?;
        let token = fresh.token.clone();
        cache.insert(scope, fresh);
        Ok(token)
    }
}

impl std::fmt::Debug for AzureAdTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAdTokenProvider")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("credential", &self.credential)
            .finish()
    }
}
