//! Error types for cloud API operations.
//!
//! Every REST client in this crate reports failures through [`Error`]. The
//! variants double as the retry classification used by the backoff executor:
//! transient conditions (throttling, server errors, transport failures and
//! resources that are not visible yet) are retried, everything else is
//! surfaced immediately.

use std::time::Duration;

use backoff_executor::{RetryDecision, Retryable};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while talking to a cloud API.
///
/// ## Examples
///
/// ```rust,ignore
/// use cloud_client::Error;
///
/// match manager.get_resource_group(&name).await {
///     Ok(group) => println!("Found {}", group.name),
///     Err(Error::NotFound) => println!("{name} is gone"),
///     Err(err) => eprintln!("Lookup failed: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API refused the bearer token (401 or 403), or no token could be obtained.
    #[error("Failed to authenticate against the cloud API: {0}")]
    AuthError(String),

    /// The request conflicts with the current state of the resource (409).
    ///
    /// Typical causes are a resource that is still being deleted or a name
    /// that is already taken.
    #[error("Request conflicts with the current state of the resource: {0}")]
    Conflict(String),

    /// The response body could not be parsed into the expected structure.
    #[error("Failed to deserialize cloud API response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An identifier string did not have the expected ARM shape.
    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The requested resource was not found (404).
    #[error("Resource not found")]
    NotFound,

    /// A condition the caller is waiting for has not settled yet.
    ///
    /// Cloud APIs are eventually consistent: a deleted resource group can keep
    /// answering lookups for a while. Pollers report that state with this
    /// variant so the executor keeps waiting.
    #[error("Operation has not completed yet: {0}")]
    Pending(String),

    /// The API is throttling requests (429).
    ///
    /// `retry_after` carries the `Retry-After` header when the server sent one.
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// Any other non-success status.
    #[error("Cloud API returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl Retryable for Error {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            Error::RateLimitExceeded {
                retry_after: Some(delay),
            } => RetryDecision::RetryAfter(*delay),
            Error::RateLimitExceeded { retry_after: None } => RetryDecision::Retry,
            Error::Status { status, .. } if *status >= 500 => RetryDecision::Retry,
            Error::Http(_) | Error::Pending(_) => RetryDecision::Retry,
            Error::AuthError(_)
            | Error::Conflict(_)
            | Error::Deserialization(_)
            | Error::InvalidResourceId(_)
            | Error::InvalidUrl(_)
            | Error::NotFound
            | Error::Status { .. } => RetryDecision::Stop,
        }
    }
}
