//! Reading and editing the `.env.<env>` files the CLI writes its outputs to.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "dotenv_tests.rs"]
mod tests;

/// Folder holding the per-environment files inside a project.
pub const ENV_FOLDER: &str = "env";

/// Key assigned on `line`, if the line is an assignment.
///
/// Used to locate the line to rewrite when editing. Values are parsed by
/// `dotenvy` when reading.
fn assignment_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, _) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// Parses dotenv content. Later assignments win.
pub fn parse(content: &str) -> Result<HashMap<String, String>> {
    dotenvy::from_read_iter(content.as_bytes())
        .collect::<std::result::Result<_, _>>()
        .context("Failed to parse env content")
}

/// Reads and parses a dotenv file.
pub fn read_dot_env_file(path: &Path) -> Result<HashMap<String, String>> {
    dotenvy::from_path_iter(path)
        .and_then(|entries| entries.collect())
        .with_context(|| format!("Failed to read env file {}", path.display()))
}

/// Sets `key` to `value`, replacing an existing assignment or appending one.
///
/// Comments and other assignments are left as they are.
pub fn edit_dot_env_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to edit env file {}", path.display()))?;

    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| match assignment_key(line) {
            Some(existing) if existing == key => {
                replaced = true;
                let export = if line.trim_start().starts_with("export ") {
                    "export "
                } else {
                    ""
                };
                format!("{export}{key}={value}")
            }
            _ => line.to_string(),
        })
        .collect();
    if !replaced {
        lines.push(format!("{key}={value}"));
    }

    let mut updated = lines.join("\n");
    updated.push('\n');
    fs::write(path, updated)
        .with_context(|| format!("Failed to write env file {}", path.display()))?;
    debug!(path = %path.display(), key = key, "Updated env file");
    Ok(())
}

pub fn env_file_path(project: &Path, env_name: &str) -> PathBuf {
    project.join(ENV_FOLDER).join(format!(".env.{env_name}"))
}

pub fn user_env_file_path(project: &Path, env_name: &str) -> PathBuf {
    project.join(ENV_FOLDER).join(format!(".env.{env_name}.user"))
}

/// Reads the outputs of a provisioned environment.
///
/// Values from `.env.<env>.user` override those in `.env.<env>`. The user
/// file is optional.
pub fn read_env_outputs(project: &Path, env_name: &str) -> Result<HashMap<String, String>> {
    let mut outputs = read_dot_env_file(&env_file_path(project, env_name))?;

    let user_file = user_env_file_path(project, env_name);
    if user_file.exists() {
        outputs.extend(read_dot_env_file(&user_file)?);
    } else {
        warn!(path = %user_file.display(), "No user env file");
    }

    Ok(outputs)
}
