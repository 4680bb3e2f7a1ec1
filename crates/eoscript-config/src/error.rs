use thiserror::Error;

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid date '{value}': expected YYYY-MM-DD")]
  InvalidDate { value: String },

  #[error("temporal range start {start} is after end {end}")]
  InvertedRange { start: String, end: String },

  #[error("temporal range is not set")]
  MissingTemporalRange,

  #[error("cloud cover must be between 0 and 100, got {0}")]
  InvalidCloudCover(u8),

  #[error("failed to read settings: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse settings: {0}")]
  Parse(#[from] serde_json::Error),
}
