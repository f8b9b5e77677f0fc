//! Shortcut filter expansion.
//!
//! The convenience options (`--host`, `--service`, ...) expand their operand
//! into an ordinary filter expression, so everything downstream deals with
//! compiled expressions only.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Escape a value for inclusion in a single-quoted expression literal
#[must_use]
pub fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .trim()
        .to_string()
}

#[must_use]
pub fn host(name: &str) -> String {
    format!("type == 'host' and host_name == '{}'", escape(name))
}

/// `HOST;DESCRIPTION` matches host and description; a bare operand matches
/// the description alone
#[must_use]
pub fn service(spec: &str) -> String {
    match spec.split_once(';') {
        Some((host_name, description)) => format!(
            "type == 'service' and host_name == '{}' and service_description == '{}'",
            escape(host_name),
            escape(description)
        ),
        None => format!(
            "type == 'service' and service_description == '{}'",
            escape(spec)
        ),
    }
}

#[must_use]
pub fn command(name: &str) -> String {
    format!("type == 'command' and command_name == '{}'", escape(name))
}

#[must_use]
pub fn contact(name: &str) -> String {
    format!("type == 'contact' and contact_name == '{}'", escape(name))
}

#[must_use]
pub fn hostgroup(name: &str) -> String {
    format!("type == 'hostgroup' and hostgroup_name == '{}'", escape(name))
}

#[must_use]
pub fn servicegroup(name: &str) -> String {
    format!(
        "type == 'servicegroup' and servicegroup_name == '{}'",
        escape(name)
    )
}

/// Read filter expressions from `path`, one per non-blank line
///
/// # Errors
/// Fails when the file cannot be read.
pub fn load_filter_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read filter file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
