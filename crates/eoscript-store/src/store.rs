use std::sync::Arc;

use eoscript_config::{BoundingBox, ExecutionConfig, Scene, TemporalRange, validate_cloud_cover};
use eoscript_graph::{ServiceInfo, SubmissionFailure};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::state::{PersistedSession, ResetDefaults, SessionState};
use crate::storage::{MemoryStorage, SessionStorage};

/// On-disk envelope, `{"state": {...}, "version": 0}`.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
  state: PersistedSession,
  #[serde(default)]
  version: u32,
}

/// Single owner of the session state.
///
/// Share it as `Arc<SessionStore>`. Every update is applied atomically and
/// observers see whole states only.
pub struct SessionStore {
  state: watch::Sender<SessionState>,
  storage: Arc<dyn SessionStorage>,
  key: String,
}

impl SessionStore {
  /// Open the session stored under `key`, or start a fresh one.
  ///
  /// Unreadable or corrupt data is logged and ignored.
  pub fn open(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
    let key = key.into();
    let state = match storage.load(&key) {
      Ok(Some(raw)) => match serde_json::from_str::<Envelope>(&raw) {
        Ok(envelope) => {
          debug!(key = %key, "session restored");
          SessionState::restore(envelope.state)
        }
        Err(e) => {
          warn!(key = %key, error = %e, "ignoring corrupt session");
          SessionState::default()
        }
      },
      Ok(None) => SessionState::default(),
      Err(e) => {
        warn!(key = %key, error = %e, "failed to read session");
        SessionState::default()
      }
    };

    let (state, _) = watch::channel(state);
    Self {
      state,
      storage,
      key,
    }
  }

  /// A session kept in memory only.
  pub fn in_memory() -> Self {
    Self::open(Arc::new(MemoryStorage::new()), "session")
  }

  pub fn snapshot(&self) -> SessionState {
    self.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.state.subscribe()
  }

  pub fn execution_config(&self) -> ExecutionConfig {
    self.state.borrow().execution_config()
  }

  /// Replace the script. Marks unapplied changes unless the text is unchanged.
  pub fn set_script(&self, script: impl Into<String>) {
    let script = script.into();
    self.update(|state| {
      if state.script != script {
        state.script = script;
        state.has_unapplied_changes = true;
      }
    });
  }

  pub fn set_has_unapplied_changes(&self, changed: bool) {
    self.update(|state| state.has_unapplied_changes = changed);
  }

  /// Switch collection. Published services are dropped.
  pub fn set_collection_id(&self, collection_id: impl Into<String>) {
    let collection_id = collection_id.into();
    self.update(|state| {
      state.collection_id = collection_id;
      invalidate(state);
    });
  }

  /// Change the time window. Published services are dropped.
  pub fn set_temporal_range(&self, range: TemporalRange) -> Result<(), StoreError> {
    range.validate()?;
    self.update(|state| {
      state.temporal_range = range;
      invalidate(state);
    });
    Ok(())
  }

  /// Change the cloud-cover ceiling. Published services are dropped.
  pub fn set_cloud_cover(&self, cloud_cover: u8) -> Result<(), StoreError> {
    validate_cloud_cover(cloud_cover)?;
    self.update(|state| {
      state.cloud_cover = cloud_cover;
      invalidate(state);
    });
    Ok(())
  }

  pub fn set_selected_bands(&self, bands: Vec<String>) {
    self.update(|state| state.selected_bands = bands);
  }

  pub fn set_bounding_box(&self, bounding_box: Option<BoundingBox>) {
    self.update(|state| state.bounding_box = bounding_box);
  }

  /// Replace the published services with the result of a run.
  ///
  /// Clears the unapplied-changes flag and returns the services that were
  /// replaced.
  pub fn publish(
    &self,
    services: Vec<ServiceInfo>,
    failures: Vec<SubmissionFailure>,
  ) -> Vec<ServiceInfo> {
    let mut replaced = Vec::new();
    self.update(|state| {
      replaced = replace_services(state, services, failures);
    });
    replaced
  }

  /// Like [`publish`](Self::publish), but only if the services have not been
  /// invalidated since `config_generation` was observed.
  ///
  /// Returns `None`, leaving the state untouched, when the configuration
  /// moved on in the meantime.
  pub fn publish_if_current(
    &self,
    config_generation: u64,
    services: Vec<ServiceInfo>,
    failures: Vec<SubmissionFailure>,
  ) -> Option<Vec<ServiceInfo>> {
    let mut replaced = None;
    self.update(|state| {
      if state.config_generation == config_generation {
        replaced = Some(replace_services(state, services, failures));
      }
    });
    replaced
  }

  /// Flip the visibility of one service. Returns false if it does not exist.
  pub fn toggle_service_visibility(&self, service_id: &str) -> bool {
    let mut found = false;
    self.update(|state| {
      if let Some(service) = state.services.iter_mut().find(|s| s.id == service_id) {
        service.visible = !service.visible;
        found = true;
      }
    });
    found
  }

  pub fn clear_services(&self) {
    self.update(invalidate);
  }

  pub fn set_scene_id(&self, scene_id: Option<String>) {
    self.update(|state| state.scene_id = scene_id);
  }

  /// Load a scene: script, configuration and bands in one update.
  pub fn hydrate_from_scene(&self, scene: &Scene) {
    self.update(|state| {
      state.scene_id = Some(scene.id.clone());
      state.collection_id = scene.collection_id.clone();
      state.temporal_range = scene.temporal_range.clone();
      state.cloud_cover = scene.cloud_cover;
      state.selected_bands = scene.default_bands.clone();
      state.bounding_box = scene.bounding_box;
      state.script = scene.suggested_algorithm.clone();
      state.has_unapplied_changes = false;
      invalidate(state);
    });
  }

  /// Start over from `defaults`: empty script, no scene, no services.
  pub fn reset_to_defaults(&self, defaults: ResetDefaults) {
    self.update(|state| {
      let config_generation = state.config_generation;
      *state = SessionState {
        collection_id: defaults.collection_id,
        cloud_cover: defaults.cloud_cover,
        temporal_range: defaults.temporal_range,
        selected_bands: defaults.selected_bands,
        bounding_box: defaults.bounding_box,
        config_generation,
        ..SessionState::default()
      };
      invalidate(state);
    });
  }

  /// Back to the initial state.
  pub fn clear(&self) {
    self.update(|state| {
      let config_generation = state.config_generation;
      *state = SessionState {
        config_generation,
        ..SessionState::default()
      };
      invalidate(state);
    });
  }

  /// Apply one change and persist it while the state is still locked, so
  /// storage always ends up holding the latest persisted subset.
  fn update(&self, apply: impl FnOnce(&mut SessionState)) {
    self.state.send_if_modified(|state| {
      let before = state.clone();
      apply(state);
      if *state == before {
        return false;
      }
      let after = state.persisted();
      if after != before.persisted() {
        self.persist(after);
      }
      true
    });
  }

  fn persist(&self, state: PersistedSession) {
    let result = serde_json::to_string(&Envelope { state, version: 0 })
      .map_err(StoreError::from)
      .and_then(|raw| self.storage.save(&self.key, &raw));
    if let Err(e) = result {
      warn!(key = %self.key, error = %e, "failed to persist session");
    }
  }
}

fn invalidate(state: &mut SessionState) {
  state.services.clear();
  state.failures.clear();
  state.config_generation += 1;
}

fn replace_services(
  state: &mut SessionState,
  services: Vec<ServiceInfo>,
  failures: Vec<SubmissionFailure>,
) -> Vec<ServiceInfo> {
  state.failures = failures;
  state.has_unapplied_changes = false;
  std::mem::replace(&mut state.services, services)
}
