use std::fmt;

use serde::{Deserialize, Serialize};

/// One problem reported by `POST /validation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
}

impl fmt::Display for ValidationIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(code) = self.code.as_deref().filter(|c| !c.is_empty()) {
      write!(f, "{}: ", code)?;
    }
    let message = self
      .message
      .as_deref()
      .filter(|m| !m.is_empty())
      .unwrap_or("Validation error.");
    f.write_str(message)?;
    if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
      write!(f, " ({})", path)?;
    }
    Ok(())
  }
}

/// One line per issue.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
  if issues.is_empty() {
    return "Unknown validation error.".to_string();
  }
  issues
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}
