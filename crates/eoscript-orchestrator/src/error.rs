use thiserror::Error;

/// Why a run failed. Published state is untouched whenever one is returned.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("cannot run yet: {reason}")]
  NotReady { reason: String },

  #[error("script engine unavailable: {0}")]
  EngineUnavailable(String),

  #[error("script execution failed")]
  Execution { diagnostic: String },

  #[error("script produced an unusable result: {0}")]
  MalformedResult(String),

  #[error("could not prepare the script: {0}")]
  Composition(String),

  #[error("failed to publish '{graph}': {message}")]
  Submission { graph: String, message: String },

  #[error("network error: {0}")]
  Network(String),
}

impl RunError {
  /// One line for the error banner.
  pub fn summary(&self) -> String {
    self.to_string()
  }

  /// Full text for the expandable part of the error banner. For script
  /// failures this is the engine's diagnostic, unmodified.
  pub fn detail(&self) -> String {
    match self {
      RunError::Execution { diagnostic } => diagnostic.clone(),
      other => other.to_string(),
    }
  }
}
