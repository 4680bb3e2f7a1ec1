//! eoscript Graph
//!
//! Types describing what a script run produces and what the remote API turns
//! it into:
//!
//! - [`GraphResult`]: one named process graph returned by a script.
//! - [`ServiceInfo`]: a graph that has been deployed as a tile service.
//! - [`SubmissionFailure`]: a graph whose deployment failed in an otherwise
//!   successful run.
//!
//! [`extract`] turns the raw value returned by the script engine into an
//! ordered list of graph results.

mod error;
mod extract;
mod types;

pub use error::ExtractError;
pub use extract::{DEFAULT_GRAPH_NAME, extract};
pub use types::{GraphResult, LayerSource, ServiceInfo, SubmissionFailure};
