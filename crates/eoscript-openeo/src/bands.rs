//! Band variables derived from collection metadata.

use eoscript_config::BandVariable;

use crate::catalog::Collection;

const REFLECTANCE_PREFIX: &str = "reflectance|";

/// Spectral bands of `collection`, in catalog order.
///
/// Keeps reflectance bands and any band that declares a common name or a
/// center wavelength. Returns an empty list when the collection carries no
/// band summary.
pub fn extract_bands(collection: &Collection) -> Vec<BandVariable> {
  let Some(summaries) = &collection.summaries else {
    return Vec::new();
  };

  summaries
    .bands
    .iter()
    .filter(|band| {
      band.name.starts_with(REFLECTANCE_PREFIX)
        || band.common_name.is_some()
        || band.center_wavelength.is_some_and(|w| w != 0.0)
    })
    .map(|band| {
      let short = band.name.split('|').nth(1).unwrap_or(&band.name);
      let label = band
        .description
        .as_deref()
        .and_then(|description| description.split('(').next())
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(&band.name);

      BandVariable {
        variable: short.to_uppercase(),
        name: band.name.clone(),
        label: label.to_string(),
        common_name: band.common_name.clone(),
        resolution: sentinel2_resolution(short).map(str::to_string),
        wavelength: band
          .center_wavelength
          .filter(|w| *w != 0.0)
          .map(|w| format!("{} nm", (w * 1000.0).round() as i64)),
        path: band.name.clone(),
      }
    })
    .collect()
}

fn sentinel2_resolution(band: &str) -> Option<&'static str> {
  match band.to_ascii_lowercase().as_str() {
    "b02" | "b03" | "b04" | "b08" => Some("10m"),
    "b05" | "b06" | "b07" | "b8a" | "b11" | "b12" => Some("20m"),
    "b01" | "b09" | "b10" => Some("60m"),
    _ => None,
  }
}

/// Bands split for a band picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandGroups {
  pub reflectance: Vec<BandVariable>,
  pub other: Vec<BandVariable>,
}

/// Split bands into reflectance and other, each sorted by name.
pub fn group_bands(bands: &[BandVariable]) -> BandGroups {
  let (mut reflectance, mut other): (Vec<_>, Vec<_>) = bands
    .iter()
    .cloned()
    .partition(|band| band.path.contains(REFLECTANCE_PREFIX) || band.common_name.is_some());
  reflectance.sort_by(|a, b| a.name.cmp(&b.name));
  other.sort_by(|a, b| a.name.cmp(&b.name));
  BandGroups { reflectance, other }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collection() -> Collection {
    serde_json::from_value(serde_json::json!({
      "id": "sentinel-2-l2a",
      "summaries": {
        "bands": [
          { "name": "reflectance|b04", "description": "Red (band 4)", "eo:common_name": "red", "eo:center_wavelength": 0.665 },
          { "name": "reflectance|b8a", "description": "Narrow NIR (band 8a)", "eo:center_wavelength": 0.865 },
          { "name": "scl", "description": "Scene classification" },
          { "name": "aot", "description": "", "eo:center_wavelength": 0.5 },
          { "name": "reflectance|b01" }
        ]
      }
    }))
    .unwrap()
  }

  #[test]
  fn test_extract_bands() {
    let bands = extract_bands(&collection());
    let names: Vec<_> = bands.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["reflectance|b04", "reflectance|b8a", "aot", "reflectance|b01"]);

    let red = &bands[0];
    assert_eq!(red.variable, "B04");
    assert_eq!(red.label, "Red");
    assert_eq!(red.common_name.as_deref(), Some("red"));
    assert_eq!(red.resolution.as_deref(), Some("10m"));
    assert_eq!(red.wavelength.as_deref(), Some("665 nm"));
    assert_eq!(red.path, "reflectance|b04");

    assert_eq!(bands[1].variable, "B8A");
    assert_eq!(bands[1].resolution.as_deref(), Some("20m"));

    // Empty description falls back to the band name.
    assert_eq!(bands[2].label, "aot");
    assert_eq!(bands[2].variable, "AOT");
    assert_eq!(bands[2].resolution, None);

    assert_eq!(bands[3].label, "reflectance|b01");
    assert_eq!(bands[3].resolution.as_deref(), Some("60m"));
    assert_eq!(bands[3].wavelength, None);
  }

  #[test]
  fn test_extract_bands_without_summaries() {
    let collection = Collection {
      id: "bare".to_string(),
      ..Default::default()
    };
    assert!(extract_bands(&collection).is_empty());
  }

  #[test]
  fn test_group_bands() {
    let bands = extract_bands(&collection());
    let groups = group_bands(&bands);

    let reflectance: Vec<_> = groups.reflectance.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(reflectance, ["reflectance|b01", "reflectance|b04", "reflectance|b8a"]);
    let other: Vec<_> = groups.other.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(other, ["aot"]);
  }
}
