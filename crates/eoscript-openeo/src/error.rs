use thiserror::Error;

/// Errors raised by the openEO client.
#[derive(Debug, Error)]
pub enum ClientError {
  /// Creating a service, or reading its details back, was rejected.
  #[error("failed to create service ({status}): {body}")]
  Submission { status: u16, body: String },

  #[error("no location returned for the created service")]
  MissingLocation,

  #[error("service details contain no tile url")]
  MissingTileUrl,

  /// Any other non-success response.
  #[error("{context} failed ({status}): {message}")]
  Status {
    context: &'static str,
    status: u16,
    message: String,
  },

  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("failed to decode response: {message}")]
  Decode { message: String },

  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },
}

impl ClientError {
  /// Transient failures worth another attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      ClientError::Network(_) => true,
      ClientError::Status { status, .. } => *status >= 500,
      _ => false,
    }
  }
}
