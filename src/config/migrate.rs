//! Upgrade of an existing config file written by an older release.
//!
//! Keys introduced after the file was written are appended with their
//! default value; keys the user already set are never touched.

use super::Config;
use crate::errors::{AppError, AppResult};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// Add every key of `Config::default()` missing from the YAML file at `path`.
/// Returns the names of the keys that were added (empty when nothing changed
/// or the file does not exist).
pub fn fill_missing_keys(path: &Path) -> AppResult<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut yaml: Value = if content.trim().is_empty() {
        Value::Mapping(Default::default())
    } else {
        serde_yaml::from_str(&content)?
    };

    let Some(map) = yaml.as_mapping_mut() else {
        return Err(AppError::Config(format!(
            "{} is not a YAML mapping",
            path.display()
        )));
    };

    let defaults = serde_yaml::to_value(Config::default())?;
    let Some(defaults) = defaults.as_mapping() else {
        return Ok(Vec::new());
    };

    let mut added = Vec::new();
    for (k, v) in defaults {
        if !map.contains_key(k) {
            map.insert(k.clone(), v.clone());
            if let Some(name) = k.as_str() {
                added.push(name.to_string());
            }
        }
    }

    if !added.is_empty() {
        fs::write(path, serde_yaml::to_string(&yaml)?)?;
    }

    Ok(added)
}
