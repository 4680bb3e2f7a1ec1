//! eoscript Config
//!
//! Serializable types shared across the eoscript workspace:
//!
//! - [`ExecutionConfig`] describes what a single run loads (collection, bands,
//!   time window, area, cloud cover) and is rebuilt whenever the user edits
//!   the configuration.
//! - [`BandVariable`] describes one spectral band of the active collection.
//! - [`Scene`] is a named preset that seeds a session.
//! - [`Settings`] is the application configuration read from disk.

mod band;
mod error;
mod execution;
mod scene;
mod settings;

pub use band::BandVariable;
pub use error::ConfigError;
pub use execution::{BoundingBox, ExecutionConfig, TemporalRange, validate_cloud_cover};
pub use scene::{Scene, builtin_scenes, find_scene};
pub use settings::Settings;
