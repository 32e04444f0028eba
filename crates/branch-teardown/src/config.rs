//! Global tear-down configuration.
//!
//! [`GlobalConfig`] holds the administratively configured tear-down job name.
//! It is injected into the listener rather than living in a static, and is
//! read far more often than it is written.
//!
//! [`GlobalConfigFile`] persists the value as the single `tearDownJob` field of
//! a small JSON document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Result, TearDownError};

/// Form field the administrative configuration page submits.
pub const FORM_FIELD: &str = "jobteardown.tearDownJob";

/// Default file name for the persisted configuration.
pub const DEFAULT_CONFIG_FILE: &str = "jobteardown.json";

/// Process-wide tear-down configuration.
///
/// Empty names are never stored, so a reader sees either a usable name or
/// nothing.
#[derive(Debug, Default)]
pub struct GlobalConfig {
    tear_down_job: RwLock<Option<String>>,
}

impl GlobalConfig {
    /// Configuration with no global tear-down job.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration preset to `name` (empty means unset).
    pub fn with_tear_down_job(name: impl Into<String>) -> Self {
        let config = Self::new();
        config.set_tear_down_job(name);
        config
    }

    /// Snapshot of the configured tear-down job name.
    pub fn tear_down_job(&self) -> Option<String> {
        self.tear_down_job
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the configured name. An empty string clears it.
    ///
    /// The name is stored verbatim; no trimming or case folding.
    pub fn set_tear_down_job(&self, name: impl Into<String>) {
        let name = name.into();
        let value = if name.is_empty() { None } else { Some(name) };
        debug!(tear_down_job = ?value, "global tear-down job updated");
        *self
            .tear_down_job
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
    }

    /// Remove the configured name.
    pub fn clear(&self) {
        self.set_tear_down_job(String::new());
    }

    /// Apply a submitted administrative form.
    ///
    /// A missing field clears the value, the same as submitting it empty.
    pub fn apply_form(&self, form: &HashMap<String, String>) {
        let submitted = form.get(FORM_FIELD).cloned().unwrap_or_default();
        self.set_tear_down_job(submitted);
    }

    /// Serializable snapshot of the current state.
    pub fn to_document(&self) -> ConfigDocument {
        ConfigDocument {
            tear_down_job: self.tear_down_job(),
        }
    }
}

impl From<ConfigDocument> for GlobalConfig {
    fn from(doc: ConfigDocument) -> Self {
        GlobalConfig::with_tear_down_job(doc.tear_down_job.unwrap_or_default())
    }
}

/// On-disk shape of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "tearDownJob", default, skip_serializing_if = "Option::is_none")]
    pub tear_down_job: Option<String>,
}

/// File-backed persistence for [`GlobalConfig`].
#[derive(Debug, Clone)]
pub struct GlobalConfigFile {
    path: PathBuf,
}

impl GlobalConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the file from `TEARDOWN_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_FILE`] in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var("TEARDOWN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration. A missing file means nothing is configured.
    pub fn load(&self) -> Result<GlobalConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no tear-down configuration file");
            return Ok(GlobalConfig::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let doc: ConfigDocument = serde_json::from_str(&raw).map_err(|e| {
            TearDownError::Config(format!("invalid {}: {e}", self.path.display()))
        })?;
        Ok(GlobalConfig::from(doc))
    }

    /// Persist the current configuration.
    pub fn save(&self, config: &GlobalConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&config.to_document())?;
        std::fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "tear-down configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_by_default() {
        assert_eq!(GlobalConfig::new().tear_down_job(), None);
    }

    #[test]
    fn test_set_and_clear() {
        let config = GlobalConfig::new();
        config.set_tear_down_job("my-custom-global-executor");
        assert_eq!(
            config.tear_down_job().as_deref(),
            Some("my-custom-global-executor")
        );

        config.clear();
        assert_eq!(config.tear_down_job(), None);
    }

    #[test]
    fn test_empty_name_is_never_stored() {
        let config = GlobalConfig::with_tear_down_job("");
        assert_eq!(config.tear_down_job(), None);
    }

    #[test]
    fn test_name_stored_verbatim() {
        let config = GlobalConfig::with_tear_down_job(" My-Job ");
        assert_eq!(config.tear_down_job().as_deref(), Some(" My-Job "));
    }

    #[test]
    fn test_apply_form() {
        let config = GlobalConfig::new();
        let mut form = HashMap::new();
        form.insert(FORM_FIELD.to_string(), "my-custom-global-executor".to_string());
        config.apply_form(&form);
        assert_eq!(
            config.tear_down_job().as_deref(),
            Some("my-custom-global-executor")
        );

        config.apply_form(&HashMap::new());
        assert_eq!(config.tear_down_job(), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = GlobalConfigFile::new(dir.path().join("nested").join(DEFAULT_CONFIG_FILE));

        let config = GlobalConfig::with_tear_down_job("my-custom-global-executor");
        file.save(&config).unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"tearDownJob\""));

        let loaded = file.load().unwrap();
        assert_eq!(
            loaded.tear_down_job().as_deref(),
            Some("my-custom-global-executor")
        );
    }

    #[test]
    fn test_missing_file_loads_unset() {
        let dir = tempfile::tempdir().unwrap();
        let file = GlobalConfigFile::new(dir.path().join("absent.json"));
        assert_eq!(file.load().unwrap().tear_down_job(), None);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "not json").unwrap();

        let err = GlobalConfigFile::new(&path).load().unwrap_err();
        assert!(matches!(err, TearDownError::Config(_)));
    }
}
