//! Bearer-token acquisition for the E2E suite.
//!
//! Every cloud API the suite talks to (resource management, Microsoft Graph,
//! the Teams developer portal, Key Vault and Storage data planes) expects an
//! OAuth bearer token. This crate hides where the token comes from behind the
//! [`TokenProvider`] trait:
//!
//! - [`AzureAdTokenProvider`] talks to the directory token endpoint with a
//!   service principal or a test account.
//! - [`StaticTokenProvider`] hands out a fixed token and stands in for the
//!   real provider in offline tests.

use async_trait::async_trait;

mod azure_ad_token_provider;

pub use azure_ad_token_provider::{AzureAdTokenProvider, Credential, DEFAULT_AUTHORITY_HOST};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Scope for Azure Resource Manager.
pub const AZURE_MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Scope for Microsoft Graph.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Scope for the Teams developer portal.
pub const DEV_PORTAL_SCOPE: &str = "https://dev.teams.microsoft.com/AppDefinitions.ReadWrite";

/// Scope for the Key Vault data plane.
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Scope for the Storage data plane.
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while acquiring a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials provided")]
    InvalidCredentials,

    #[error("Token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Other(String),
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns an access token valid for `scopes`.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidCredentials` when the directory rejects the
    /// credential and `AuthError::TokenEndpoint` for any other refusal.
    async fn get_access_token(&self, scopes: &[&str]) -> AuthResult<String>;
}

/// Token provider that always returns the same token.
///
/// Used where the suite needs a credential but the remote side is mocked.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_access_token(&self, _scopes: &[&str]) -> AuthResult<String> {
        if self.token.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.token.clone())
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<REDACTED>")
            .finish()
    }
}
