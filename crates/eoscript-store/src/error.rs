use eoscript_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("invalid session value: {0}")]
  Invalid(#[from] ConfigError),

  #[error("storage error: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to serialize session: {0}")]
  Serialize(#[from] serde_json::Error),
}
