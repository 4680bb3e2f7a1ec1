use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window, serialized as `["start", "end"]`.
///
/// An empty pair means the window has not been chosen yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRange(pub String, pub String);

impl TemporalRange {
  pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
    Self(start.into(), end.into())
  }

  pub fn start(&self) -> &str {
    &self.0
  }

  pub fn end(&self) -> &str {
    &self.1
  }

  /// True when neither bound has been set.
  pub fn is_unset(&self) -> bool {
    self.0.is_empty() && self.1.is_empty()
  }

  /// Check that both bounds are dates and the window is not inverted.
  ///
  /// An unset range is accepted; callers that need a window use
  /// [`TemporalRange::require`].
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.is_unset() {
      return Ok(());
    }
    let start = parse_date(&self.0)?;
    let end = parse_date(&self.1)?;
    if start > end {
      return Err(ConfigError::InvertedRange {
        start: self.0.clone(),
        end: self.1.clone(),
      });
    }
    Ok(())
  }

  /// Like [`TemporalRange::validate`], but an unset range is an error.
  pub fn require(&self) -> Result<(), ConfigError> {
    if self.is_unset() {
      return Err(ConfigError::MissingTemporalRange);
    }
    self.validate()
  }
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
  NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ConfigError::InvalidDate {
    value: value.to_string(),
  })
}

/// Area of interest in degrees, serialized as `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
  pub west: f64,
  pub south: f64,
  pub east: f64,
  pub north: f64,
}

impl BoundingBox {
  pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
    Self {
      west,
      south,
      east,
      north,
    }
  }

  /// Object form used inside generated scripts.
  pub fn to_extent(&self) -> serde_json::Value {
    serde_json::json!({
      "west": self.west,
      "south": self.south,
      "east": self.east,
      "north": self.north,
    })
  }
}

impl From<[f64; 4]> for BoundingBox {
  fn from(value: [f64; 4]) -> Self {
    Self::new(value[0], value[1], value[2], value[3])
  }
}

impl From<BoundingBox> for [f64; 4] {
  fn from(value: BoundingBox) -> Self {
    [value.west, value.south, value.east, value.north]
  }
}

/// Reject cloud-cover ceilings outside 0..=100.
pub fn validate_cloud_cover(cloud_cover: u8) -> Result<(), ConfigError> {
  if cloud_cover > 100 {
    return Err(ConfigError::InvalidCloudCover(cloud_cover));
  }
  Ok(())
}

/// Input to a single run.
///
/// `selected_bands` is order-significant: the i-th entry becomes `data[i]`
/// inside the user script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
  pub collection_id: String,
  #[serde(default)]
  pub selected_bands: Vec<String>,
  #[serde(default)]
  pub temporal_range: TemporalRange,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bounding_box: Option<BoundingBox>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cloud_cover: Option<u8>,
  /// Extra algorithm parameters merged into the script's run configuration.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub algorithm_params: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionConfig {
  pub fn new(collection_id: impl Into<String>, temporal_range: TemporalRange) -> Self {
    Self {
      collection_id: collection_id.into(),
      selected_bands: Vec::new(),
      temporal_range,
      bounding_box: None,
      cloud_cover: None,
      algorithm_params: serde_json::Map::new(),
    }
  }

  pub fn with_bands<I, S>(mut self, bands: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.selected_bands = bands.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_cloud_cover(mut self, cloud_cover: u8) -> Self {
    self.cloud_cover = Some(cloud_cover);
    self
  }

  pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
    self.bounding_box = Some(bounding_box);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_temporal_range_serializes_as_pair() {
    let range = TemporalRange::new("2025-05-12", "2025-05-13");
    let json = serde_json::to_value(&range).unwrap();
    assert_eq!(json, serde_json::json!(["2025-05-12", "2025-05-13"]));
  }

  #[test]
  fn test_temporal_range_validation() {
    assert!(TemporalRange::new("2025-05-12", "2025-05-12").validate().is_ok());
    assert!(TemporalRange::default().validate().is_ok());
    assert!(matches!(
      TemporalRange::default().require(),
      Err(ConfigError::MissingTemporalRange)
    ));
    assert!(matches!(
      TemporalRange::new("2025-05-13", "2025-05-12").validate(),
      Err(ConfigError::InvertedRange { .. })
    ));
    assert!(matches!(
      TemporalRange::new("12/05/2025", "2025-05-13").validate(),
      Err(ConfigError::InvalidDate { .. })
    ));
  }

  #[test]
  fn test_bounding_box_array_form() {
    let bbox: BoundingBox = serde_json::from_str("[12.1, 45.2, 13.4, 46.0]").unwrap();
    assert_eq!(bbox.west, 12.1);
    assert_eq!(bbox.north, 46.0);
    assert_eq!(
      serde_json::to_value(bbox).unwrap(),
      serde_json::json!([12.1, 45.2, 13.4, 46.0])
    );
    assert_eq!(bbox.to_extent()["east"], 13.4);
  }

  #[test]
  fn test_execution_config_camel_case() {
    let config = ExecutionConfig::new(
      "sentinel-2-l2a",
      TemporalRange::new("2025-05-12", "2025-05-13"),
    )
    .with_bands(["B02", "B03", "B04"])
    .with_cloud_cover(20);

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["collectionId"], "sentinel-2-l2a");
    assert_eq!(json["selectedBands"], serde_json::json!(["B02", "B03", "B04"]));
    assert_eq!(json["cloudCover"], 20);
    assert!(json.get("boundingBox").is_none());
  }

  #[test]
  fn test_cloud_cover_bounds() {
    assert!(validate_cloud_cover(0).is_ok());
    assert!(validate_cloud_cover(100).is_ok());
    assert!(matches!(
      validate_cloud_cover(101),
      Err(ConfigError::InvalidCloudCover(101))
    ));
  }
}
