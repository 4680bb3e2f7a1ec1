use serde::{Deserialize, Serialize};

/// Response of `GET /collections`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionList {
  #[serde(default)]
  pub collections: Vec<Collection>,
  #[serde(default)]
  pub links: Vec<serde_json::Value>,
}

/// The parts of a STAC collection the editor uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub keywords: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub license: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extent: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summaries: Option<Summaries>,
}

impl Collection {
  /// Title for display, falling back to the id.
  pub fn display_title(&self) -> &str {
    self
      .title
      .as_deref()
      .filter(|title| !title.is_empty())
      .unwrap_or(&self.id)
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summaries {
  #[serde(default)]
  pub bands: Vec<CollectionBand>,
}

/// One entry of `summaries.bands`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionBand {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(
    rename = "eo:common_name",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub common_name: Option<String>,
  /// Center wavelength in micrometers.
  #[serde(
    rename = "eo:center_wavelength",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub center_wavelength: Option<f64>,
}
