use serde::{Deserialize, Serialize};

use crate::execution::{BoundingBox, TemporalRange};

const TRUE_COLOR: &str = include_str!("../algorithms/true_color.py");
const FALSE_COLOR: &str = include_str!("../algorithms/false_color.py");
const NDVI: &str = include_str!("../algorithms/ndvi.py");

/// A named preset bundling a starting script with its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
  pub id: String,
  pub name: String,
  pub description: String,
  pub collection_id: String,
  pub temporal_range: TemporalRange,
  pub cloud_cover: u8,
  pub default_bands: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bounding_box: Option<BoundingBox>,
  #[serde(default)]
  pub suggested_algorithm: String,
}

/// Scenes shipped with the application.
pub fn builtin_scenes() -> Vec<Scene> {
  let adriatic = BoundingBox::new(12.2, 44.9, 13.6, 45.8);
  vec![
    Scene {
      id: "sentinel-2-true-color".to_string(),
      name: "Sentinel-2 L2A true color".to_string(),
      description: "Natural color composite over the northern Adriatic".to_string(),
      collection_id: "sentinel-2-l2a".to_string(),
      temporal_range: TemporalRange::new("2025-07-01", "2025-07-31"),
      cloud_cover: 20,
      default_bands: vec!["B02".into(), "B03".into(), "B04".into()],
      bounding_box: Some(adriatic),
      suggested_algorithm: TRUE_COLOR.to_string(),
    },
    Scene {
      id: "sentinel-2-false-color".to_string(),
      name: "Sentinel-2 L2A false color".to_string(),
      description: "Near infrared composite highlighting vegetation".to_string(),
      collection_id: "sentinel-2-l2a".to_string(),
      temporal_range: TemporalRange::new("2025-07-01", "2025-07-31"),
      cloud_cover: 20,
      default_bands: vec!["B03".into(), "B04".into(), "B08".into()],
      bounding_box: Some(adriatic),
      suggested_algorithm: FALSE_COLOR.to_string(),
    },
    Scene {
      id: "sentinel-2-ndvi".to_string(),
      name: "Sentinel-2 L2A NDVI".to_string(),
      description: "Vegetation index with a true color reference layer".to_string(),
      collection_id: "sentinel-2-l2a".to_string(),
      temporal_range: TemporalRange::new("2025-06-01", "2025-06-30"),
      cloud_cover: 30,
      default_bands: vec!["B02".into(), "B03".into(), "B04".into(), "B08".into()],
      bounding_box: None,
      suggested_algorithm: NDVI.to_string(),
    },
  ]
}

/// Look up a built-in scene by id.
pub fn find_scene(id: &str) -> Option<Scene> {
  builtin_scenes().into_iter().find(|scene| scene.id == id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_scenes_are_valid() {
    for scene in builtin_scenes() {
      assert!(scene.temporal_range.require().is_ok(), "{}", scene.id);
      assert!(scene.cloud_cover <= 100);
      assert!(!scene.default_bands.is_empty());
      assert!(!scene.suggested_algorithm.is_empty());
    }
  }

  #[test]
  fn test_find_scene() {
    let scene = find_scene("sentinel-2-ndvi").expect("scene exists");
    assert_eq!(scene.default_bands.len(), 4);
    assert!(scene.suggested_algorithm.contains("map_graphs"));
    assert!(find_scene("does-not-exist").is_none());
  }
}
