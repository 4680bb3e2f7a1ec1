use thiserror::Error;

/// The engine output did not have a recognizable result-graph shape.
#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("malformed result: {message}")]
  Malformed { message: String },
}

impl ExtractError {
  pub(crate) fn malformed(message: impl Into<String>) -> Self {
    Self::Malformed {
      message: message.into(),
    }
  }
}
