use std::fmt;

use eoscript_graph::{ServiceInfo, SubmissionFailure};
use serde::Serialize;

/// Where a run currently is. `Idle` between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
  Idle,
  Composing,
  Executing,
  Extracting,
  Submitting,
  Publishing,
}

impl fmt::Display for RunPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RunPhase::Idle => "idle",
      RunPhase::Composing => "composing",
      RunPhase::Executing => "executing",
      RunPhase::Extracting => "extracting",
      RunPhase::Submitting => "submitting",
      RunPhase::Publishing => "publishing",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
  /// Services were written to the session.
  Published,
  /// A later run started first; nothing was written.
  Superseded,
}

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
  /// Sequence number of the run.
  pub run: u64,
  pub outcome: RunOutcome,
  /// Published services, in graph order. Empty when superseded.
  pub services: Vec<ServiceInfo>,
  pub failures: Vec<SubmissionFailure>,
}

impl RunReport {
  pub(crate) fn superseded(run: u64) -> Self {
    Self {
      run,
      outcome: RunOutcome::Superseded,
      services: Vec::new(),
      failures: Vec::new(),
    }
  }

  pub fn is_published(&self) -> bool {
    self.outcome == RunOutcome::Published
  }
}
