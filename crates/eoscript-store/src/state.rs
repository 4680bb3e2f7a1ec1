use eoscript_config::{BoundingBox, ExecutionConfig, TemporalRange};
use eoscript_graph::{ServiceInfo, SubmissionFailure};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_COLLECTION: &str = "sentinel-2-l2a";
pub(crate) const DEFAULT_CLOUD_COVER: u8 = 50;

/// Everything the editor shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
  pub script: String,
  /// The script changed since the last publish.
  pub has_unapplied_changes: bool,
  pub collection_id: String,
  pub temporal_range: TemporalRange,
  pub cloud_cover: u8,
  /// Order-significant.
  pub selected_bands: Vec<String>,
  pub bounding_box: Option<BoundingBox>,
  pub services: Vec<ServiceInfo>,
  pub scene_id: Option<String>,
  /// Graphs that failed in the last partially successful publish.
  #[serde(skip)]
  pub failures: Vec<SubmissionFailure>,
  /// Bumped whenever published services are invalidated.
  #[serde(skip)]
  pub config_generation: u64,
}

impl Default for SessionState {
  fn default() -> Self {
    Self {
      script: String::new(),
      has_unapplied_changes: false,
      collection_id: DEFAULT_COLLECTION.to_string(),
      temporal_range: TemporalRange::default(),
      cloud_cover: DEFAULT_CLOUD_COVER,
      selected_bands: Vec::new(),
      bounding_box: None,
      services: Vec::new(),
      scene_id: None,
      failures: Vec::new(),
      config_generation: 0,
    }
  }
}

impl SessionState {
  /// Run configuration derived from this state.
  pub fn execution_config(&self) -> ExecutionConfig {
    let mut config = ExecutionConfig::new(self.collection_id.clone(), self.temporal_range.clone())
      .with_bands(self.selected_bands.iter().cloned())
      .with_cloud_cover(self.cloud_cover);
    config.bounding_box = self.bounding_box;
    config
  }

  pub fn persisted(&self) -> PersistedSession {
    PersistedSession {
      code: self.script.clone(),
      collection_id: self.collection_id.clone(),
      temporal_range: self.temporal_range.clone(),
      cloud_cover: self.cloud_cover,
      selected_bands: self.selected_bands.clone(),
      bounding_box: self.bounding_box,
      scene_id: self.scene_id.clone(),
    }
  }

  pub(crate) fn restore(persisted: PersistedSession) -> Self {
    Self {
      script: persisted.code,
      collection_id: persisted.collection_id,
      temporal_range: persisted.temporal_range,
      cloud_cover: persisted.cloud_cover,
      selected_bands: persisted.selected_bands,
      bounding_box: persisted.bounding_box,
      scene_id: persisted.scene_id,
      ..Self::default()
    }
  }
}

/// The part of the session that survives a reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
  pub code: String,
  pub collection_id: String,
  pub temporal_range: TemporalRange,
  pub cloud_cover: u8,
  pub selected_bands: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bounding_box: Option<BoundingBox>,
  pub scene_id: Option<String>,
}

/// Configuration applied by [`SessionStore::reset_to_defaults`](crate::SessionStore::reset_to_defaults).
#[derive(Debug, Clone, PartialEq)]
pub struct ResetDefaults {
  pub collection_id: String,
  pub cloud_cover: u8,
  pub temporal_range: TemporalRange,
  pub selected_bands: Vec<String>,
  pub bounding_box: Option<BoundingBox>,
}

impl Default for ResetDefaults {
  fn default() -> Self {
    let state = SessionState::default();
    Self {
      collection_id: state.collection_id,
      cloud_cover: state.cloud_cover,
      temporal_range: state.temporal_range,
      selected_bands: state.selected_bands,
      bounding_box: state.bounding_box,
    }
  }
}
