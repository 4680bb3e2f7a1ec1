use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::types::GraphResult;

/// Name given to the graph of a legacy single-graph script.
pub const DEFAULT_GRAPH_NAME: &str = "Result";

/// Parse the raw value returned by the script engine into graph results.
///
/// Accepted shapes, optionally wrapped in a JSON string:
///
/// - a single graph object (`{"process_graph": ...}`), named
///   [`DEFAULT_GRAPH_NAME`] unless it carries a name
/// - a list of graph objects, each with a `name`
/// - an object mapping names to graph objects
///
/// Declaration order is preserved in every case. An empty list or map is a
/// valid result with no graphs.
pub fn extract(raw: &Value) -> Result<Vec<GraphResult>, ExtractError> {
  match raw {
    Value::String(text) => {
      let parsed: Value = serde_json::from_str(text)
        .map_err(|e| ExtractError::malformed(format!("output is not valid JSON: {}", e)))?;
      if parsed.is_string() {
        return Err(ExtractError::malformed("output is a doubly encoded string"));
      }
      extract(&parsed)
    }
    Value::Object(object) if object.contains_key("process_graph") => {
      let graph = parse_graph(object, Some(DEFAULT_GRAPH_NAME), 0)?;
      Ok(vec![graph])
    }
    Value::Object(object) => extract_named(object),
    Value::Array(items) => extract_list(items),
    other => Err(ExtractError::malformed(format!(
      "expected a graph, a list of graphs or named graphs, got {}",
      kind(other)
    ))),
  }
}

fn extract_list(items: &[Value]) -> Result<Vec<GraphResult>, ExtractError> {
  let graphs = items
    .iter()
    .enumerate()
    .map(|(index, item)| match item {
      Value::Object(object) => parse_graph(object, None, index),
      other => Err(ExtractError::malformed(format!(
        "graph {} is {}, expected an object",
        index + 1,
        kind(other)
      ))),
    })
    .collect::<Result<Vec<_>, _>>()?;
  finish(graphs)
}

fn extract_named(object: &Map<String, Value>) -> Result<Vec<GraphResult>, ExtractError> {
  let graphs = object
    .iter()
    .enumerate()
    .map(|(index, (key, item))| match item {
      Value::Object(entry) => parse_graph(entry, Some(key), index),
      other => Err(ExtractError::malformed(format!(
        "graph '{}' is {}, expected an object",
        key,
        kind(other)
      ))),
    })
    .collect::<Result<Vec<_>, _>>()?;
  finish(graphs)
}

fn parse_graph(
  object: &Map<String, Value>,
  fallback_name: Option<&str>,
  index: usize,
) -> Result<GraphResult, ExtractError> {
  let process_graph = object
    .get("process_graph")
    .filter(|graph| !graph.is_null())
    .cloned()
    .ok_or_else(|| {
      ExtractError::malformed(format!("graph {} has no process_graph", index + 1))
    })?;

  let name = match object.get("name") {
    Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
    Some(Value::String(_)) | None => fallback_name
      .map(str::to_string)
      .ok_or_else(|| ExtractError::malformed(format!("graph {} has no name", index + 1)))?,
    Some(other) => {
      return Err(ExtractError::malformed(format!(
        "graph {} name is {}, expected a string",
        index + 1,
        kind(other)
      )));
    }
  };

  let parameters = match object.get("parameters") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(parameters)) => parameters.clone(),
    Some(other) => {
      return Err(ExtractError::malformed(format!(
        "parameters of '{}' is {}, expected a list",
        name,
        kind(other)
      )));
    }
  };

  let visible = match object.get("visible") {
    None | Some(Value::Null) => true,
    Some(Value::Bool(visible)) => *visible,
    Some(other) => {
      return Err(ExtractError::malformed(format!(
        "visible flag of '{}' is {}, expected a boolean",
        name,
        kind(other)
      )));
    }
  };

  Ok(GraphResult {
    process_graph,
    parameters,
    name,
    visible,
  })
}

fn finish(graphs: Vec<GraphResult>) -> Result<Vec<GraphResult>, ExtractError> {
  let mut seen = HashSet::new();
  for graph in &graphs {
    if !seen.insert(graph.name.as_str()) {
      return Err(ExtractError::malformed(format!(
        "graph name '{}' is used more than once",
        graph.name
      )));
    }
  }
  Ok(graphs)
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}
