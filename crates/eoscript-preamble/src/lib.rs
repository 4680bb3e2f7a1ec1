//! eoscript Preamble
//!
//! Builds the single source unit handed to the script engine:
//!
//! ```text
//! loader preamble   (rendered from templates/loader.py.j2)
//! band bindings     (one per selected band, in selection order)
//! user script       (always last, so it can use or override the above)
//! ```
//!
//! Composition is a pure function of its inputs.

mod compose;
mod error;

pub use compose::{compose, resolve_selection};
pub use error::PreambleError;
