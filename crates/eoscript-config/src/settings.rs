use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Application settings, read from `settings.json` in the data directory.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Base URL of the openEO API.
  pub api_url: String,
  /// Prefix placed in front of the access token in the `Authorization` header.
  pub auth_prefix: String,
  /// Title used for every service created by a run.
  pub service_title: String,
  /// Python interpreter used by the script engine.
  pub python: PathBuf,
  /// Packages that must be importable before the engine reports ready.
  pub python_packages: Vec<String>,
  /// Install missing packages with pip during engine initialization.
  pub install_packages: bool,
  /// Validate every graph with the API before creating its service.
  pub validate_graphs: bool,
  /// Delete services remotely once they are replaced or superseded.
  pub cleanup_services: bool,
  /// Quiet period before editor changes are committed to the session.
  pub editor_debounce_ms: u64,
  /// Key under which the session is persisted.
  pub storage_namespace: String,
  /// Optional per-request HTTP timeout.
  pub request_timeout_ms: Option<u64>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_url: "https://api.explorer.eopf.copernicus.eu/openeo".to_string(),
      auth_prefix: "Bearer oidc/oidc/".to_string(),
      service_title: "eoscript ephemeral service".to_string(),
      python: PathBuf::from("python3"),
      python_packages: vec!["openeo".to_string()],
      install_packages: true,
      validate_graphs: false,
      cleanup_services: true,
      editor_debounce_ms: 300,
      storage_namespace: "openeo-editor-storage".to_string(),
      request_timeout_ms: None,
    }
  }
}

impl Settings {
  /// Load settings from `path`, falling back to defaults if the file is absent.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }
}
