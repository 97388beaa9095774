//! Test utilities for the E2E suite.
//!
//! This crate provides the naming conventions that keep concurrent test runs
//! isolated, the environment-driven configuration, and helpers for reading
//! and mutating the files the CLI writes into a project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

pub mod config;
pub mod dotenv;
pub mod project_files;

pub use config::{E2eConfig, feature_flag_env, is_insider_preview_enabled};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Prefix carried by every app, resource group and AAD app a test creates.
///
/// The orphan sweeper relies on it to recognise leftovers.
pub const APP_NAME_PREFIX: &str = "fxE2E";

/// Name of the shared working folder under the home directory.
pub const TEST_FOLDER_NAME: &str = "test-folder";

pub fn get_app_name_prefix() -> &'static str {
    APP_NAME_PREFIX
}

/// Generate a unique app name.
///
/// Format: `fxE2E{epoch millis}{two hex chars}`, e.g. `fxE2E17049000000004f`.
/// The result is alphanumeric, so it is also usable as a storage or key
/// vault name prefix.
pub fn get_unique_app_name() -> String {
    let random_suffix = &Uuid::new_v4().simple().to_string()[..2];
    format!(
        "{}{}{}",
        APP_NAME_PREFIX,
        Utc::now().timestamp_millis(),
        random_suffix
    )
}

/// Strips everything except ASCII letters and digits.
pub fn convert_to_alphanumeric_only(app_name: &str) -> String {
    app_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Resource group the CLI provisions for `app_name` in `env_name`.
pub fn resource_group_name(app_name: &str, env_name: &str) -> String {
    format!("{app_name}-{env_name}-rg")
}

/// Reports whether `name` was generated by this suite.
pub fn is_test_resource_name(name: &str) -> bool {
    name.starts_with(APP_NAME_PREFIX)
}

/// Returns `~/test-folder`, creating it if needed.
pub fn get_test_folder() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    let folder = home.join(TEST_FOLDER_NAME);
    if !folder.exists() {
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create test folder {}", folder.display()))?;
        debug!(path = %folder.display(), "Created test folder");
    }
    Ok(folder)
}
