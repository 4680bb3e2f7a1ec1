use thiserror::Error;

/// Errors raised by the script engine or its host.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The engine is not ready to run scripts.
  #[error("script engine is not available ({status})")]
  Unavailable { status: String },

  /// The script raised. `diagnostic` is the engine's own report, unmodified.
  #[error("{diagnostic}")]
  Execution { diagnostic: String },

  #[error("script engine failed to initialize: {message}")]
  Initialization { message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
