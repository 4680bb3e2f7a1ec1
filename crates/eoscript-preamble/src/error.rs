use eoscript_config::ConfigError;
use thiserror::Error;

/// Errors raised while composing a script.
#[derive(Debug, Error)]
pub enum PreambleError {
  #[error("no collection selected")]
  MissingCollection,

  #[error("invalid configuration: {0}")]
  InvalidConfig(#[from] ConfigError),

  #[error("band '{band}' is not available in the selected collection")]
  UnknownBand { band: String },

  #[error("failed to render loader preamble: {0}")]
  Render(#[from] minijinja::Error),
}
