//! eoscript Orchestrator
//!
//! Drives one run of the pipeline:
//!
//! ```text
//! Composing ─▶ Executing ─▶ Extracting ─▶ Submitting ─▶ Publishing
//!  preamble     engine        graphs       N services     store
//!                                          (concurrent)
//! ```
//!
//! Each run takes a sequence number when it starts. Only the most recently
//! started run may publish; an older run that settles later is reported as
//! [`RunOutcome::Superseded`] and its services are discarded.

mod error;
mod orchestrator;
mod report;

pub use error::RunError;
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use report::{RunOutcome, RunPhase, RunReport};
