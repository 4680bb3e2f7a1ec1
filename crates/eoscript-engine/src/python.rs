use std::path::PathBuf;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::EngineError;
use crate::events::EngineLog;
use crate::host::ScriptEngine;

/// Reads the unit from stdin, sends user `print` output to stderr and writes
/// the result (`map_graphs` or the trailing expression) to stdout as JSON.
const HARNESS: &str = include_str!("harness.py");

/// Script engine backed by an external Python interpreter.
///
/// Every run starts a fresh interpreter, so runs never share state.
#[derive(Debug, Clone)]
pub struct PythonEngine {
  python: PathBuf,
  packages: Vec<String>,
  install_missing: bool,
}

impl PythonEngine {
  pub fn new(python: impl Into<PathBuf>) -> Self {
    Self {
      python: python.into(),
      packages: Vec::new(),
      install_missing: false,
    }
  }

  /// Packages that must be importable once initialization succeeds.
  pub fn with_packages<I, S>(mut self, packages: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.packages = packages.into_iter().map(Into::into).collect();
    self
  }

  /// Install missing packages with pip during initialization.
  pub fn install_missing(mut self, install: bool) -> Self {
    self.install_missing = install;
    self
  }

  async fn output(&self, args: &[&str]) -> Result<Output, EngineError> {
    Command::new(&self.python)
      .args(args)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|e| EngineError::Initialization {
        message: format!("failed to start {}: {}", self.python.display(), e),
      })
  }

  async fn has_package(&self, package: &str) -> Result<bool, EngineError> {
    let probe = format!("import {}", package);
    Ok(self.output(&["-c", &probe]).await?.status.success())
  }

  async fn install(&self, package: &str) -> Result<(), EngineError> {
    let output = self
      .output(&["-m", "pip", "install", "--quiet", package])
      .await?;
    if !output.status.success() {
      return Err(EngineError::Initialization {
        message: format!(
          "installing {} failed: {}",
          package,
          String::from_utf8_lossy(&output.stderr).trim()
        ),
      });
    }
    Ok(())
  }
}

#[async_trait]
impl ScriptEngine for PythonEngine {
  async fn initialize(&self, log: &EngineLog) -> Result<(), EngineError> {
    log.info("Locating Python runtime");
    let output = self.output(&["--version"]).await?;
    if !output.status.success() {
      return Err(EngineError::Initialization {
        message: format!("{} --version exited with {}", self.python.display(), output.status),
      });
    }
    // Older interpreters print the version on stderr.
    let version = if output.stdout.is_empty() {
      String::from_utf8_lossy(&output.stderr)
    } else {
      String::from_utf8_lossy(&output.stdout)
    };
    log.success(format!("Python runtime loaded ({})", version.trim()));

    for package in &self.packages {
      log.info(format!("Loading package {}", package));
      if self.has_package(package).await? {
        log.success(format!("Package {} available", package));
        continue;
      }
      if !self.install_missing {
        return Err(EngineError::Initialization {
          message: format!("package {} is not installed", package),
        });
      }
      log.info(format!("Installing package {}", package));
      self.install(package).await?;
      if !self.has_package(package).await? {
        return Err(EngineError::Initialization {
          message: format!("package {} is still not importable after install", package),
        });
      }
      log.success(format!("Package {} installed", package));
    }
    Ok(())
  }

  async fn run(&self, source: &str) -> Result<serde_json::Value, EngineError> {
    let mut child = Command::new(&self.python)
      .arg("-c")
      .arg(HARNESS)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()?;

    // The harness reads all of stdin before producing any output.
    if let Some(mut stdin) = child.stdin.take() {
      stdin.write_all(source.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
      return Err(EngineError::Execution {
        diagnostic: stderr.trim_end().to_string(),
      });
    }
    if !stderr.is_empty() {
      debug!(output = %stderr.trim_end(), "script output");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    Ok(
      serde_json::from_str(stdout)
        .unwrap_or_else(|_| serde_json::Value::String(stdout.to_string())),
    )
  }
}
