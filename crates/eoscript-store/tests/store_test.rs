//! SessionStore invalidation and persistence.

use std::sync::Arc;

use eoscript_config::{BoundingBox, TemporalRange, find_scene};
use eoscript_graph::{GraphResult, ServiceInfo, SubmissionFailure};
use eoscript_store::{
  FsStorage, MemoryStorage, ResetDefaults, SessionStorage, SessionStore, StoreError,
};

fn service(id: &str) -> ServiceInfo {
  ServiceInfo {
    id: id.to_string(),
    location: format!("/services/{id}"),
    tile_url: format!("https://tiles.example/{id}/{{z}}/{{x}}/{{y}}"),
    graph_result: GraphResult::new(id, serde_json::json!({})),
    visible: true,
  }
}

fn published() -> SessionStore {
  let store = SessionStore::in_memory();
  store.publish(vec![service("a"), service("b")], Vec::new());
  store
}

#[test]
fn test_config_changes_clear_services() {
  let store = published();
  store.set_collection_id("sentinel-1-grd");
  assert!(store.snapshot().services.is_empty());

  let store = published();
  store
    .set_temporal_range(TemporalRange::new("2025-05-01", "2025-05-31"))
    .unwrap();
  assert!(store.snapshot().services.is_empty());

  let store = published();
  store.set_cloud_cover(10).unwrap();
  assert!(store.snapshot().services.is_empty());
}

#[test]
fn test_band_and_bbox_changes_keep_services() {
  let store = published();
  store.set_selected_bands(vec!["B08".to_string(), "B04".to_string()]);
  store.set_bounding_box(Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));

  let state = store.snapshot();
  assert_eq!(state.services.len(), 2);
  assert_eq!(state.selected_bands, ["B08", "B04"]);
}

#[test]
fn test_invalid_values_are_rejected() {
  let store = published();
  let err = store.set_cloud_cover(101).unwrap_err();
  assert!(matches!(err, StoreError::Invalid(_)));

  let err = store
    .set_temporal_range(TemporalRange::new("2025-06-30", "2025-06-01"))
    .unwrap_err();
  assert!(matches!(err, StoreError::Invalid(_)));

  let state = store.snapshot();
  assert_eq!(state.cloud_cover, 50);
  assert_eq!(state.services.len(), 2);
}

#[test]
fn test_invalidation_is_a_single_update() {
  let store = published();
  let mut changes = store.subscribe();
  changes.borrow_and_update();

  store.set_collection_id("sentinel-1-grd");

  assert!(changes.has_changed().unwrap());
  let seen = changes.borrow_and_update().clone();
  assert_eq!(seen.collection_id, "sentinel-1-grd");
  assert!(seen.services.is_empty());
}

#[test]
fn test_publish_replaces_and_clears_flag() {
  let store = SessionStore::in_memory();
  store.set_script("x = 1");
  store.publish(vec![service("a")], Vec::new());

  let failures = vec![SubmissionFailure {
    graph_name: "SWIR".to_string(),
    error: "failed to create service (500): boom".to_string(),
  }];
  store.set_script("x = 2");
  let replaced = store.publish(vec![service("b"), service("c")], failures.clone());

  assert_eq!(replaced, vec![service("a")]);
  let state = store.snapshot();
  let ids: Vec<_> = state.services.iter().map(|s| s.id.as_str()).collect();
  assert_eq!(ids, ["b", "c"]);
  assert_eq!(state.failures, failures);
  assert!(!state.has_unapplied_changes);
}

#[test]
fn test_toggle_visibility() {
  let store = published();
  assert!(store.toggle_service_visibility("b"));
  let state = store.snapshot();
  assert!(state.services[0].visible);
  assert!(!state.services[1].visible);
}

#[test]
fn test_hydrate_from_scene() {
  let store = published();
  store.set_script("draft");
  let scene = find_scene("sentinel-2-true-color").unwrap();
  store.hydrate_from_scene(&scene);

  let state = store.snapshot();
  assert_eq!(state.scene_id.as_deref(), Some("sentinel-2-true-color"));
  assert_eq!(state.script, scene.suggested_algorithm);
  assert_eq!(state.selected_bands, scene.default_bands);
  assert_eq!(state.temporal_range, scene.temporal_range);
  assert_eq!(state.cloud_cover, scene.cloud_cover);
  assert_eq!(state.bounding_box, scene.bounding_box);
  assert!(state.services.is_empty());
  assert!(!state.has_unapplied_changes);
}

#[test]
fn test_reset_and_clear() {
  let store = published();
  store.set_script("x = 1");
  store.set_scene_id(Some("sentinel-2-ndvi".to_string()));

  store.reset_to_defaults(ResetDefaults {
    collection_id: "sentinel-2-l1c".to_string(),
    cloud_cover: 20,
    temporal_range: TemporalRange::new("2025-01-01", "2025-01-31"),
    selected_bands: vec!["B04".to_string()],
    bounding_box: None,
  });
  let state = store.snapshot();
  assert_eq!(state.collection_id, "sentinel-2-l1c");
  assert_eq!(state.cloud_cover, 20);
  assert_eq!(state.script, "");
  assert_eq!(state.scene_id, None);
  assert!(state.services.is_empty());

  let generation = store.snapshot().config_generation;
  store.clear();
  let state = store.snapshot();
  let fresh = SessionStore::in_memory().snapshot();
  assert_eq!(state.persisted(), fresh.persisted());
  assert!(state.services.is_empty());
  assert!(state.config_generation > generation);
}

#[test]
fn test_invalidation_bumps_config_generation() {
  let store = published();
  let start = store.snapshot().config_generation;

  store.set_selected_bands(vec!["B08".to_string()]);
  store.set_bounding_box(Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
  store.publish(vec![service("c")], Vec::new());
  assert_eq!(store.snapshot().config_generation, start);

  store.set_cloud_cover(10).unwrap();
  assert_eq!(store.snapshot().config_generation, start + 1);
  store.set_collection_id("sentinel-1-grd");
  store.set_temporal_range(TemporalRange::new("2025-02-01", "2025-02-02")).unwrap();
  assert_eq!(store.snapshot().config_generation, start + 3);
}

#[test]
fn test_publish_if_current() {
  let store = published();
  let generation = store.snapshot().config_generation;

  let replaced = store.publish_if_current(generation, vec![service("c")], Vec::new());
  let replaced: Vec<_> = replaced.unwrap().into_iter().map(|s| s.id).collect();
  assert_eq!(replaced, ["a", "b"]);

  store.set_cloud_cover(5).unwrap();
  store.set_script("changed");
  assert!(store.publish_if_current(generation, vec![service("d")], Vec::new()).is_none());
  let state = store.snapshot();
  assert!(state.services.is_empty());
  assert!(state.has_unapplied_changes);
}

#[test]
fn test_concurrent_updates_persist_latest_state() {
  let storage = Arc::new(MemoryStorage::new());
  let store = SessionStore::open(storage.clone(), "session");

  std::thread::scope(|scope| {
    scope.spawn(|| {
      for i in 0..200 {
        store.set_script(format!("x = {i}"));
      }
    });
    scope.spawn(|| {
      for i in 0..200u8 {
        store.set_cloud_cover(i % 101).unwrap();
      }
    });
  });

  let reopened = SessionStore::open(storage, "session");
  assert_eq!(reopened.snapshot().persisted(), store.snapshot().persisted());
}

#[test]
fn test_session_survives_reopen() {
  let storage = Arc::new(MemoryStorage::new());
  let store = SessionStore::open(storage.clone(), "openeo-editor-storage");
  store.set_script("rgb.to_json()");
  store.set_selected_bands(vec!["B04".to_string(), "B03".to_string()]);
  store.set_bounding_box(Some(BoundingBox::new(12.0, 44.0, 13.0, 45.0)));
  store.set_scene_id(Some("sentinel-2-true-color".to_string()));
  store.publish(vec![service("a")], Vec::new());

  let reopened = SessionStore::open(storage.clone(), "openeo-editor-storage");
  let state = reopened.snapshot();
  assert_eq!(state.script, "rgb.to_json()");
  assert_eq!(state.selected_bands, ["B04", "B03"]);
  assert_eq!(state.bounding_box, Some(BoundingBox::new(12.0, 44.0, 13.0, 45.0)));
  assert_eq!(state.scene_id.as_deref(), Some("sentinel-2-true-color"));
  // Services and the change flag are not persisted.
  assert!(state.services.is_empty());
  assert!(!state.has_unapplied_changes);

  let raw = storage.load("openeo-editor-storage").unwrap().unwrap();
  let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
  let mut keys: Vec<_> = json["state"].as_object().unwrap().keys().cloned().collect();
  keys.sort();
  assert_eq!(
    keys,
    [
      "boundingBox",
      "cloudCover",
      "code",
      "collectionId",
      "sceneId",
      "selectedBands",
      "temporalRange",
    ]
  );
}

#[test]
fn test_corrupt_session_is_ignored() {
  let storage = Arc::new(MemoryStorage::new());
  storage.save("session", "{ not json").unwrap();
  let store = SessionStore::open(storage, "session");
  assert_eq!(store.snapshot(), SessionStore::in_memory().snapshot());
}

#[test]
fn test_fs_storage_session() {
  let dir = tempfile::tempdir().unwrap();
  let storage = Arc::new(FsStorage::new(dir.path()));
  SessionStore::open(storage.clone(), "editor").set_cloud_cover(15).unwrap();

  let reopened = SessionStore::open(storage, "editor");
  assert_eq!(reopened.snapshot().cloud_cover, 15);
  assert!(dir.path().join("editor.json").exists());
}
