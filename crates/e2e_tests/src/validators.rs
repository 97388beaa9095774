//! Checks that provisioned cloud resources match what the CLI reported.
//!
//! Each validator reads the resource through the cloud REST clients and
//! returns a [`Verification`](crate::Verification) listing every mismatch.
//! A resource that does not exist is a failed check, not an error; errors
//! are reserved for problems reaching the API.

pub mod aad;
pub mod apim;
pub mod bot;
pub mod frontend;
pub mod key_vault;
pub mod service_plan;

pub use aad::{AadExpectations, AadValidator};
pub use apim::{ApimAadExpectations, ApimDeployExpectations, ApimExpectations, ApimValidator};
pub use bot::{BotExpectations, BotValidator};
pub use frontend::{FrontendExpectations, FrontendValidator};
pub use key_vault::{KeyVaultExpectations, KeyVaultValidator};
pub use service_plan::ServicePlanValidator;

use std::collections::HashMap;

use anyhow::{Context, Result};

/// Reads a required key from the env outputs of a provisioned project.
pub(crate) fn output<'a>(outputs: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    outputs
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .with_context(|| format!("{key} not found in env outputs"))
}
