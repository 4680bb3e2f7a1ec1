use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::StoreError;

/// Key-value storage for the persisted session.
pub trait SessionStorage: Send + Sync {
  fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

  fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

  fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process storage. Lives as long as the value, like a browser session.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SessionStorage for MemoryStorage {
  fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(entries.get(key).cloned())
  }

  fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.remove(key);
    Ok(())
  }
}

/// Storage writing one `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
  root: PathBuf,
}

impl FsStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path(&self, key: &str) -> PathBuf {
    self.root.join(format!("{}.json", key))
  }
}

impl SessionStorage for FsStorage {
  fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(self.path(key)) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
    std::fs::create_dir_all(&self.root)?;
    // Never leave a truncated session file behind.
    let path = self.path(key);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    match std::fs::remove_file(self.path(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}
