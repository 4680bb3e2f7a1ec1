use serde::{Deserialize, Serialize};

/// One computational result produced by running a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
  /// Engine-defined process graph.
  pub process_graph: serde_json::Value,
  /// Parameters declared by the graph.
  #[serde(default)]
  pub parameters: Vec<serde_json::Value>,
  /// Display name, unique within one run.
  pub name: String,
  #[serde(default = "default_visible")]
  pub visible: bool,
}

fn default_visible() -> bool {
  true
}

impl GraphResult {
  pub fn new(name: impl Into<String>, process_graph: serde_json::Value) -> Self {
    Self {
      process_graph,
      parameters: Vec::new(),
      name: name.into(),
      visible: true,
    }
  }

  /// The `process` object submitted to the remote API.
  pub fn process(&self) -> serde_json::Value {
    serde_json::json!({
      "process_graph": self.process_graph,
      "parameters": self.parameters,
    })
  }
}

/// A graph result deployed as a remote tile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
  /// Locally generated identifier.
  pub id: String,
  /// Remote resource location as returned by the API.
  pub location: String,
  /// Tile endpoint template.
  pub tile_url: String,
  pub graph_result: GraphResult,
  pub visible: bool,
}

impl ServiceInfo {
  /// Raster source description for a map layer showing this service.
  pub fn layer_source(&self) -> LayerSource {
    LayerSource {
      id: format!("service-{}", self.id),
      tiles: vec![decode_tile_template(&self.tile_url)],
    }
  }
}

/// Raster tile source for the map view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSource {
  pub id: String,
  pub tiles: Vec<String>,
}

/// A graph whose submission failed while its siblings succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFailure {
  pub graph_name: String,
  pub error: String,
}

/// Tile templates often come back with `{z}/{x}/{y}` percent-encoded.
fn decode_tile_template(url: &str) -> String {
  url
    .replace("%7B", "{")
    .replace("%7b", "{")
    .replace("%7D", "}")
    .replace("%7d", "}")
}
