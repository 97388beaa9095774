//! Helpers that read and mutate files inside a scaffolded project.
//!
//! Tests use them to tune provisioning (SKUs, identifier URIs, target
//! resource groups) and to inject faults before running the CLI again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::dotenv;

#[cfg(test)]
#[path = "project_files_tests.rs"]
mod tests;

/// Placeholder syntax used in legacy state files for values kept in userdata.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"\{\{([^{}]+)\}\}") {
        Ok(regex) => regex,
        Err(error) => panic!("Invalid placeholder regex: {error}"),
    });

/// Action id of the step that extends a Teams app to Outlook and Microsoft 365.
pub const EXTEND_TO_M365_ACTION: &str = "teamsApp/extendToM365";

/// A sequence item of `teamsapp.yml` that runs [`EXTEND_TO_M365_ACTION`].
static EXTEND_TO_M365_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r#"^\s*-\s+uses:\s*["']?teamsApp/extendToM365["']?\s*(#.*)?$"#) {
        Ok(regex) => regex,
        Err(error) => panic!("Invalid extendToM365 regex: {error}"),
    }
});

/// Content written by [`write_malformed_permissions`]; it is not valid JSON.
pub const MALFORMED_PERMISSIONS: &str =
    r#"[{"resource": "Microsoft Graph", "delegated": ["User.Read""#;

/// Value written by [`set_invalid_aad_object_id`].
pub const INVALID_AAD_OBJECT_ID: &str = "invalid-aad-object-id";

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Walks `keys` down from `value`, creating empty objects along the way.
fn object_at<'a>(
    value: &'a mut Value,
    keys: &[&str],
) -> Result<&'a mut serde_json::Map<String, Value>> {
    let mut current = value;
    for key in keys {
        let map = current
            .as_object_mut()
            .with_context(|| format!("Expected an object above `{key}`"))?;
        current = map.entry(key.to_string()).or_insert_with(|| json!({}));
    }
    current
        .as_object_mut()
        .with_context(|| format!("Expected an object at `{}`", keys.join(".")))
}

pub fn provision_parameters_path(project: &Path) -> PathBuf {
    project.join("infra").join("azure.parameters.json")
}

pub fn legacy_provision_parameters_path(project: &Path, env_name: &str) -> PathBuf {
    project
        .join(".fx")
        .join("configs")
        .join(format!("azure.parameters.{env_name}.json"))
}

/// Sets `parameters.<key>.value` in `infra/azure.parameters.json`.
pub fn set_provision_parameter(project: &Path, key: &str, value: &str) -> Result<()> {
    let path = provision_parameters_path(project);
    let mut parameters = read_json(&path)?;
    object_at(&mut parameters, &["parameters"])?.insert(key.to_string(), json!({ "value": value }));
    write_json(&path, &parameters)?;
    debug!(key = key, value = value, "Set provision parameter");
    Ok(())
}

/// Sets `parameters.provisionParameters.value.<key>` in the legacy per-env parameter file.
pub fn set_legacy_provision_parameter(
    project: &Path,
    env_name: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    let path = legacy_provision_parameters_path(project, env_name);
    let mut parameters = read_json(&path)?;
    object_at(&mut parameters, &["parameters", "provisionParameters", "value"])?
        .insert(key.to_string(), Value::String(value.to_string()));
    write_json(&path, &parameters)
}

pub fn get_legacy_provision_parameter(
    project: &Path,
    env_name: &str,
    key: &str,
) -> Result<Option<String>> {
    let parameters = read_json(&legacy_provision_parameters_path(project, env_name))?;
    let pointer = format!("/parameters/provisionParameters/value/{key}");
    Ok(parameters
        .pointer(&pointer)
        .and_then(Value::as_str)
        .map(str::to_string))
}

pub fn aad_manifest_path(project: &Path) -> PathBuf {
    project.join("aad.manifest.json")
}

/// Replaces the AAD manifest's identifier URIs with `identifier_uri`.
pub fn set_aad_manifest_identifier_uris(project: &Path, identifier_uri: &str) -> Result<()> {
    let path = aad_manifest_path(project);
    let mut manifest = read_json(&path)?;
    object_at(&mut manifest, &[])?.insert("identifierUris".into(), json!([identifier_uri]));
    write_json(&path, &manifest)
}

pub fn update_aad_manifest_name(project: &Path, name: &str) -> Result<()> {
    let path = aad_manifest_path(project);
    let mut manifest = read_json(&path)?;
    object_at(&mut manifest, &[])?.insert("name".into(), Value::String(name.to_string()));
    write_json(&path, &manifest)
}

/// Drops the `teamsApp/extendToM365` step from the `provision` stage.
///
/// The file is edited line by line so comments and formatting elsewhere
/// survive. Returns whether anything was removed. A file without a
/// provision stage is left untouched.
pub fn remove_extend_to_m365(teamsapp_yml: &Path) -> Result<bool> {
    let content = fs::read_to_string(teamsapp_yml)
        .with_context(|| format!("Failed to read {}", teamsapp_yml.display()))?;
    serde_yaml::from_str::<serde_yaml::Value>(&content)
        .with_context(|| format!("Failed to parse {}", teamsapp_yml.display()))?;

    let mut kept = Vec::new();
    let mut in_provision = false;
    // Indentation of the dash of the item being dropped.
    let mut dropping: Option<usize> = None;
    let mut removed = 0;

    for line in content.lines() {
        let indent = line.len() - line.trim_start().len();
        let blank = line.trim().is_empty();

        if let Some(item_indent) = dropping {
            if blank || indent > item_indent {
                continue;
            }
            dropping = None;
        }

        if indent == 0 && !blank && !line.starts_with(['#', '-']) {
            in_provision = line.starts_with("provision:");
        }
        if in_provision && EXTEND_TO_M365_ITEM.is_match(line) {
            dropping = Some(indent);
            removed += 1;
            continue;
        }
        kept.push(line);
    }

    if removed == 0 {
        return Ok(false);
    }

    let mut updated = kept.join("\n");
    if content.ends_with('\n') {
        updated.push('\n');
    }
    fs::write(teamsapp_yml, updated)
        .with_context(|| format!("Failed to write {}", teamsapp_yml.display()))?;
    info!(path = %teamsapp_yml.display(), "Removed {} action", EXTEND_TO_M365_ACTION);
    Ok(true)
}

/// Points modules in a Bicep file at another resource group.
///
/// After each line containing one of `search_strings` a
/// `scope: resourceGroup('<name>')` line is inserted, indented like the
/// line that follows it. Returns the number of insertions.
pub fn customize_bicep_to_resource_group(
    bicep_file: &Path,
    resource_group: &str,
    search_strings: &[&str],
) -> Result<usize> {
    let content = fs::read_to_string(bicep_file)
        .with_context(|| format!("Failed to read {}", bicep_file.display()))?;
    let lines: Vec<&str> = content.lines().collect();
    let scope = format!("scope: resourceGroup('{resource_group}')");

    let mut output = Vec::with_capacity(lines.len());
    let mut inserted = 0;
    for (index, line) in lines.iter().enumerate() {
        output.push(line.to_string());
        if search_strings.iter().any(|needle| line.contains(needle)) {
            let next = lines.get(index + 1).copied().unwrap_or("");
            let indent: String = next.chars().take_while(|c| c.is_whitespace()).collect();
            output.push(format!("{indent}{scope}"));
            inserted += 1;
        }
    }

    let mut updated = output.join("\n");
    updated.push('\n');
    fs::write(bicep_file, updated)
        .with_context(|| format!("Failed to write {}", bicep_file.display()))?;
    Ok(inserted)
}

/// App setting value that resolves a secret from Key Vault.
pub fn key_vault_secret_reference(vault_name: &str, secret_name: &str) -> String {
    format!("@Microsoft.KeyVault(VaultName={vault_name};SecretName={secret_name})")
}

/// Loads `.fx/states/state.<env>.json` with `{{key}}` placeholders resolved.
///
/// Placeholders are looked up in `.fx/states/<env>.userdata`. Unknown keys,
/// or a missing userdata file, leave the placeholder in place.
pub fn load_state(project: &Path, env_name: &str) -> Result<Value> {
    let states = project.join(".fx").join("states");
    let mut state = read_json(&states.join(format!("state.{env_name}.json")))?;

    let userdata_file = states.join(format!("{env_name}.userdata"));
    if !userdata_file.exists() {
        return Ok(state);
    }
    let userdata = dotenv::read_dot_env_file(&userdata_file)?;

    if let Some(components) = state.as_object_mut() {
        for component in components.values_mut().filter_map(Value::as_object_mut) {
            for value in component.values_mut() {
                let Some(key) = value
                    .as_str()
                    .and_then(|text| PLACEHOLDER.captures(text))
                    .map(|captures| captures[1].to_string())
                else {
                    continue;
                };
                if let Some(secret) = userdata.get(&key) {
                    *value = Value::String(secret.clone());
                }
            }
        }
    }

    Ok(state)
}

/// Overwrites `permissions.json` with content the CLI cannot parse.
pub fn write_malformed_permissions(project: &Path) -> Result<PathBuf> {
    let path = project.join("permissions.json");
    fs::write(&path, MALFORMED_PERMISSIONS)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Replaces `AAD_APP_OBJECT_ID` in `.env.<env>` with an id no directory holds.
pub fn set_invalid_aad_object_id(project: &Path, env_name: &str) -> Result<()> {
    dotenv::edit_dot_env_file(
        &dotenv::env_file_path(project, env_name),
        "AAD_APP_OBJECT_ID",
        INVALID_AAD_OBJECT_ID,
    )
}

pub fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Expected file {} to exist", path.display());
    }
    Ok(())
}
