use serde::{Deserialize, Serialize};

/// One spectral band available from the active collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandVariable {
  /// Script variable name (e.g. `B02`).
  pub variable: String,
  /// Band identifier as published by the catalog (e.g. `reflectance|b02`).
  pub name: String,
  /// Human readable label (e.g. `Blue`).
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub common_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolution: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wavelength: Option<String>,
  /// Reference used by generated code to pull the band out of the datacube.
  pub path: String,
}

impl BandVariable {
  /// True if `id` names this band by variable, name or path (case-insensitive).
  pub fn matches(&self, id: &str) -> bool {
    self.variable.eq_ignore_ascii_case(id)
      || self.name.eq_ignore_ascii_case(id)
      || self.path.eq_ignore_ascii_case(id)
  }
}
