//! Parsing of ARM resource identifiers.
//!
//! The CLI writes full resource ids into its env and state files, e.g.
//! `/subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Web/sites/<site>`.
//! Validators need the individual parts back to call the management APIs.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

#[cfg(test)]
#[path = "resource_id_tests.rs"]
mod tests;

static RESOURCE_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(concat!(
        r"(?i)^/subscriptions/([^/]+)/resourceGroups/([^/]+)",
        r"(?:/providers/([^/]+)((?:/[^/]+/[^/]+)*))?/?$",
    )) {
        Ok(regex) => regex,
        Err(err) => panic!("Resource id regex is invalid: {err}"),
    }
});

/// A parsed ARM resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// Resource provider namespace, e.g. `Microsoft.Web`.
    pub provider: Option<String>,
    /// `(type, name)` pairs below the provider, outermost first.
    pub resources: Vec<(String, String)>,
}

impl ResourceId {
    /// Parses an id such as
    /// `/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app`.
    ///
    /// # Errors
    /// Returns `Error::InvalidResourceId` when the string is not an ARM id.
    pub fn parse(id: &str) -> Result<Self> {
        let captures = RESOURCE_ID_REGEX
            .captures(id.trim())
            .ok_or_else(|| Error::InvalidResourceId(id.to_string()))?;

        let segments: Vec<&str> = captures
            .get(4)
            .map(|m| m.as_str().split('/').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self {
            subscription_id: captures[1].to_string(),
            resource_group: captures[2].to_string(),
            provider: captures.get(3).map(|m| m.as_str().to_string()),
            resources: segments
                .chunks_exact(2)
                .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                .collect(),
        })
    }

    /// Name of the resource of the given type, compared case-insensitively.
    pub fn name_of(&self, resource_type: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|(kind, _)| kind.eq_ignore_ascii_case(resource_type))
            .map(|(_, name)| name.as_str())
    }

    /// Name of the innermost resource.
    pub fn name(&self) -> Option<&str> {
        self.resources.last().map(|(_, name)| name.as_str())
    }

    fn require(&self, resource_type: &str, id: &str) -> Result<String> {
        self.name_of(resource_type)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidResourceId(format!("{id} has no '{resource_type}' segment"))
            })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{provider}")?;
            for (kind, name) in &self.resources {
                write!(f, "/{kind}/{name}")?;
            }
        }
        Ok(())
    }
}

pub fn get_subscription_id(id: &str) -> Result<String> {
    Ok(ResourceId::parse(id)?.subscription_id)
}

pub fn get_resource_group_name(id: &str) -> Result<String> {
    Ok(ResourceId::parse(id)?.resource_group)
}

pub fn get_site_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("sites", id)
}

pub fn get_server_farm_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("serverfarms", id)
}

pub fn get_apim_service_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("service", id)
}

pub fn get_apim_product_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("products", id)
}

pub fn get_authorization_server_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("authorizationServers", id)
}

pub fn get_key_vault_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("vaults", id)
}

pub fn get_sql_server_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("servers", id)
}

pub fn get_storage_account_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("storageAccounts", id)
}

pub fn get_bot_name(id: &str) -> Result<String> {
    ResourceId::parse(id)?.require("botServices", id)
}
