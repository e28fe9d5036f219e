//! Configuration Management
//!
//! This module supplies the connection configuration the cache reads on `init`.
//!
//! # Configuration Shape
//! The cache reads the sub-tree under [`COMPONENT_NAMESPACE`] (`docstack:mongodb`):
//! ```json
//! {
//!   "docstack": {
//!     "mongodb": {
//!       "mongo-1": {
//!         "host": "mongodb://localhost:27017/app",
//!         "options": { "connectTimeoutMS": 2000 }
//!       },
//!       "mongo-2": { "host": "mongodb://localhost:27018/app" }
//!     }
//!   }
//! }
//! ```
//!
//! # Configuration Locations (CLI)
//! - Local: `.docstack/config.json` (team-shareable, per-project)
//! - Global: `~/.config/docstack/config.json` (per-user)
//!
//! The local file wins when both exist. Library users pass their own
//! [`ConfigProvider`] and never touch these paths.

pub mod options;

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DocstackError, Result};

pub use options::{
    redact_host, ConnectionOptions, ConnectionSettings, DEFAULT_OPTIONS_REVISION,
};

/// Key of the connection map inside the configuration tree
pub const COMPONENT_NAMESPACE: &str = "docstack:mongodb";

/// Source of resolved configuration values
///
/// Keys are colon-separated paths into a nested tree (`"docstack:mongodb"`).
/// Returns `None` when nothing is stored under the key.
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
}

/// Layered in-memory JSON configuration
///
/// Lookups consult the `overrides` layer first and fall back to `defaults`.
/// Each component instance gets its own value; nothing is shared globally.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    defaults: Value,
    overrides: Value,
}

impl JsonConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration whose override layer is `value`
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self {
            defaults: Value::Null,
            overrides: value,
        }
    }

    /// Create a configuration holding only the connection map
    ///
    /// `connections` is placed under [`COMPONENT_NAMESPACE`].
    #[must_use]
    pub fn with_connections(connections: Value) -> Self {
        Self::from_value(serde_json::json!({ "docstack": { "mongodb": connections } }))
    }

    /// Read a JSON file into the override layer
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DocstackError::config_error(format!("Could not read config file: {e}")))?;

        let value = serde_json::from_str::<Value>(&contents)
            .map_err(|e| DocstackError::config_error(format!("Invalid config file format: {e}")))?;

        Ok(Self::from_value(value))
    }

    /// Replace the defaults layer
    pub fn set_defaults(&mut self, defaults: Value) {
        self.defaults = defaults;
    }

    /// Replace the override layer
    pub fn set(&mut self, overrides: Value) {
        self.overrides = overrides;
    }
}

impl ConfigProvider for JsonConfig {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.overrides, key).or_else(|| lookup(&self.defaults, key)).cloned()
    }
}

fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split(':')
        .filter(|segment| !segment.is_empty())
        .try_fold(tree, |node, segment| node.get(segment))
}

/// Get path to local config file (`.docstack/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        DocstackError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".docstack").join("config.json"))
}

/// Get path to global config file (`~/.config/docstack/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DocstackError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("docstack").join("config.json"))
}

/// Load configuration with precedence (explicit path, then local, then global)
///
/// An explicit path must exist. With no explicit path and no config file on
/// disk, an empty configuration is returned.
pub fn load_with_precedence(explicit: Option<&Path>) -> Result<JsonConfig> {
    if let Some(path) = explicit {
        return JsonConfig::from_file(path);
    }

    let local_path = local_config_path()?;
    if local_path.exists() {
        return JsonConfig::from_file(&local_path);
    }

    let global_path = global_config_path()?;
    if global_path.exists() {
        return JsonConfig::from_file(&global_path);
    }

    Ok(JsonConfig::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_lookup_nested_path() {
        let config =
            JsonConfig::with_connections(json!({ "mongo-1": { "host": "mongodb://h1/db" } }));
        assert_eq!(
            config.get(COMPONENT_NAMESPACE),
            Some(json!({ "mongo-1": { "host": "mongodb://h1/db" } }))
        );
        assert_eq!(config.get("docstack:mongodb:mongo-1:host"), Some(json!("mongodb://h1/db")));
        assert_eq!(config.get("docstack:redis"), None);
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let mut config = JsonConfig::new();
        config.set_defaults(json!({
            "docstack": { "mongodb": { "a": { "host": "mongodb://defaults" } } }
        }));
        assert_eq!(config.get("docstack:mongodb:a:host"), Some(json!("mongodb://defaults")));

        config.set(json!({ "docstack": { "mongodb": { "a": { "host": "mongodb://override" } } } }));
        assert_eq!(config.get("docstack:mongodb:a:host"), Some(json!("mongodb://override")));
    }

    #[test]
    fn test_empty_config_has_nothing() {
        let config = JsonConfig::new();
        assert_eq!(config.get(COMPONENT_NAMESPACE), None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"docstack": {{"mongodb": {{"a": {{"host": "mongodb://h1/db"}}}}}}}}"#
        )
        .unwrap();

        let config = JsonConfig::from_file(file.path()).unwrap();
        assert_eq!(config.get("docstack:mongodb:a:host"), Some(json!("mongodb://h1/db")));
    }

    #[test]
    fn test_from_file_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = JsonConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.message().contains("Invalid config file format"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_with_precedence(Some(&missing)).unwrap_err();
        assert!(err.message().contains("Could not read config file"));
    }

    #[test]
    fn test_config_paths() {
        let local = local_config_path().unwrap();
        assert!(local.ends_with(".docstack/config.json"));

        if let Ok(global) = global_config_path() {
            assert!(global.ends_with("docstack/config.json"));
        }
    }
}
