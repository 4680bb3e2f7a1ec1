use eoscript_config::{BandVariable, ExecutionConfig, validate_cloud_cover};
use minijinja::{Environment, UndefinedBehavior, Value, context};
use serde_json::json;

use crate::error::PreambleError;

const LOADER_TEMPLATE: &str = include_str!("../templates/loader.py.j2");

/// Build the executable unit for one run.
///
/// `bands` must already be in selection order (see [`resolve_selection`]);
/// the i-th band is `data[i]` inside the user script. The user script is
/// appended verbatim after the preamble.
pub fn compose(
  script: &str,
  config: &ExecutionConfig,
  bands: &[BandVariable],
) -> Result<String, PreambleError> {
  if config.collection_id.trim().is_empty() {
    return Err(PreambleError::MissingCollection);
  }
  config.temporal_range.require()?;
  if let Some(cloud_cover) = config.cloud_cover {
    validate_cloud_cover(cloud_cover)?;
  }

  let bindings: Vec<_> = bands
    .iter()
    .map(|band| {
      json!({
        "variable": python_identifier(&band.variable),
        "path": band.path,
      })
    })
    .collect();

  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);

  let preamble = env.render_str(
    LOADER_TEMPLATE,
    context! {
      run_config => run_config(config, bands).to_string(),
      collection_id => &config.collection_id,
      temporal_start => config.temporal_range.start(),
      temporal_end => config.temporal_range.end(),
      bounding_box => Value::from_serialize(config.bounding_box.map(|b| b.to_extent())),
      cloud_cover => config.cloud_cover,
      bands => Value::from_serialize(&bindings),
    },
  )?;

  let mut source = String::with_capacity(preamble.len() + script.len() + 32);
  source.push_str(preamble.trim_end());
  source.push_str("\n\n# user script\n");
  source.push_str(script);
  if !script.ends_with('\n') {
    source.push('\n');
  }
  Ok(source)
}

/// The `RUN_CONFIG` object exposed to scripts.
fn run_config(config: &ExecutionConfig, bands: &[BandVariable]) -> serde_json::Value {
  json!({
    "collectionId": config.collection_id,
    "bands": bands.iter().map(|band| band.path.as_str()).collect::<Vec<_>>(),
    "time": [config.temporal_range.start(), config.temporal_range.end()],
    "boundingBox": config.bounding_box.map(|b| b.to_extent()),
    "cloudCover": config.cloud_cover,
    "params": config.algorithm_params,
  })
}

/// Map selected band ids onto band variables, keeping selection order.
///
/// Ids match a band's variable, name or path, ignoring case. When no band
/// metadata is available yet every id is accepted and mapped onto the
/// catalog's `reflectance|<id>` naming.
pub fn resolve_selection(
  available: &[BandVariable],
  selected: &[String],
) -> Result<Vec<BandVariable>, PreambleError> {
  selected
    .iter()
    .map(|id| {
      if available.is_empty() {
        return Ok(synthesized(id));
      }
      available
        .iter()
        .find(|band| band.matches(id))
        .cloned()
        .ok_or_else(|| PreambleError::UnknownBand { band: id.clone() })
    })
    .collect()
}

fn synthesized(id: &str) -> BandVariable {
  let short = id.rsplit('|').next().unwrap_or(id);
  let path = format!("reflectance|{}", short.to_lowercase());
  BandVariable {
    variable: short.to_uppercase(),
    name: path.clone(),
    label: short.to_uppercase(),
    common_name: None,
    resolution: None,
    wavelength: None,
    path,
  }
}

/// Band variables become Python names, so anything else becomes `_`.
fn python_identifier(variable: &str) -> String {
  let mut name: String = variable
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
    .collect();
  if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
    name.insert(0, '_');
  }
  name
}

#[cfg(test)]
mod tests {
  use super::*;
  use eoscript_config::{BoundingBox, ConfigError, TemporalRange};

  fn band(variable: &str) -> BandVariable {
    let path = format!("reflectance|{}", variable.to_lowercase());
    BandVariable {
      variable: variable.to_string(),
      name: path.clone(),
      label: variable.to_string(),
      common_name: None,
      resolution: Some("10m".to_string()),
      wavelength: None,
      path,
    }
  }

  fn config() -> ExecutionConfig {
    ExecutionConfig::new(
      "sentinel-2-l2a",
      TemporalRange::new("2025-06-01", "2025-06-30"),
    )
    .with_cloud_cover(30)
  }

  #[test]
  fn test_compose_is_deterministic() {
    let bands = vec![band("B04"), band("B08")];
    let first = compose("result = 1", &config(), &bands).unwrap();
    let second = compose("result = 1", &config(), &bands).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_user_script_is_last() {
    let script = "B04 = 'overridden'\nmap_graphs = []";
    let source = compose(script, &config(), &[band("B04")]).unwrap();

    assert!(source.ends_with("B04 = 'overridden'\nmap_graphs = []\n"));
    let binding = source.find("B04 = datacube.band(\"reflectance|b04\")").unwrap();
    let user = source.rfind("B04 = 'overridden'").unwrap();
    assert!(binding < user);
  }

  #[test]
  fn test_bindings_follow_selection_order() {
    let bands = vec![band("B08"), band("B02"), band("B04")];
    let source = compose("", &config(), &bands).unwrap();

    let positions: Vec<_> = ["B08 =", "B02 =", "B04 ="]
      .iter()
      .map(|needle| source.find(needle).unwrap())
      .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(source.contains(
      "bands=[\n        \"reflectance|b08\",\n        \"reflectance|b02\",\n        \"reflectance|b04\",\n    ]"
    ));
  }

  #[test]
  fn test_run_config_contents() {
    let mut config = config().with_bounding_box(BoundingBox::new(12.25, 44.5, 13.5, 45.5));
    config
      .algorithm_params
      .insert("gain".to_string(), serde_json::json!(2.5));

    let run = run_config(&config, &[band("B02")]);
    assert_eq!(run["collectionId"], "sentinel-2-l2a");
    assert_eq!(run["bands"], serde_json::json!(["reflectance|b02"]));
    assert_eq!(run["time"], serde_json::json!(["2025-06-01", "2025-06-30"]));
    assert_eq!(run["boundingBox"]["north"], 45.5);
    assert_eq!(run["cloudCover"], 30);
    assert_eq!(run["params"]["gain"], 2.5);

    let source = compose("", &config, &[band("B02")]).unwrap();
    assert!(source.contains("RUN_CONFIG = json.loads("));
    assert!(source.contains("\"west\": 12.25"));
    assert!(source.contains("SPATIAL_PARAMETERS = []"));
  }

  #[test]
  fn test_parameterized_extent_without_bbox() {
    let source = compose("", &config(), &[band("B02")]).unwrap();
    assert!(source.contains("{\"from_parameter\": \"spatial_extent_west\"}"));
    assert!(source.contains("\"name\": \"spatial_extent_north\""));
    assert!(source.contains("\"y\": 30"));
  }

  #[test]
  fn test_cloud_filter_omitted_when_unset() {
    let config = ExecutionConfig::new(
      "sentinel-2-l2a",
      TemporalRange::new("2025-06-01", "2025-06-30"),
    );
    let source = compose("", &config, &[]).unwrap();
    assert!(!source.contains("eo:cloud_cover"));
  }

  #[test]
  fn test_missing_temporal_range_fails() {
    let config = ExecutionConfig::new("sentinel-2-l2a", TemporalRange::default());
    let err = compose("", &config, &[]).unwrap_err();
    assert!(matches!(
      err,
      PreambleError::InvalidConfig(ConfigError::MissingTemporalRange)
    ));
  }

  #[test]
  fn test_missing_collection_fails() {
    let config = ExecutionConfig::new(" ", TemporalRange::new("2025-06-01", "2025-06-30"));
    assert!(matches!(
      compose("", &config, &[]),
      Err(PreambleError::MissingCollection)
    ));
  }

  #[test]
  fn test_resolve_selection_keeps_order_and_ignores_case() {
    let available = vec![band("B02"), band("B03"), band("B04")];
    let selected = vec!["b04".to_string(), "reflectance|b02".to_string()];
    let resolved = resolve_selection(&available, &selected).unwrap();

    let variables: Vec<_> = resolved.iter().map(|b| b.variable.as_str()).collect();
    assert_eq!(variables, ["B04", "B02"]);
  }

  #[test]
  fn test_resolve_selection_unknown_band() {
    let available = vec![band("B02")];
    let err = resolve_selection(&available, &["B99".to_string()]).unwrap_err();
    assert!(matches!(err, PreambleError::UnknownBand { band } if band == "B99"));
  }

  #[test]
  fn test_resolve_selection_without_metadata() {
    let resolved = resolve_selection(&[], &["B8A".to_string()]).unwrap();
    assert_eq!(resolved[0].variable, "B8A");
    assert_eq!(resolved[0].path, "reflectance|b8a");
  }

  #[test]
  fn test_python_identifier() {
    assert_eq!(python_identifier("B02"), "B02");
    assert_eq!(python_identifier("scl-mask"), "scl_mask");
    assert_eq!(python_identifier("8A"), "_8A");
  }
}
