use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell, watch};
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::events::{EngineEvent, EngineLog, EngineNotifier, NoopNotifier};

/// A runtime able to execute composed scripts.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
  /// Prepare the runtime, reporting progress to `log`.
  async fn initialize(&self, log: &EngineLog) -> Result<(), EngineError>;

  /// Execute `source` and return its result value.
  async fn run(&self, source: &str) -> Result<serde_json::Value, EngineError>;
}

#[async_trait]
impl<E: ScriptEngine + ?Sized> ScriptEngine for Arc<E> {
  async fn initialize(&self, log: &EngineLog) -> Result<(), EngineError> {
    (**self).initialize(log).await
  }

  async fn run(&self, source: &str) -> Result<serde_json::Value, EngineError> {
    (**self).run(source).await
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
  Uninitialized,
  Initializing,
  Ready,
  Failed { message: String },
}

impl fmt::Display for EngineStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EngineStatus::Uninitialized => write!(f, "uninitialized"),
      EngineStatus::Initializing => write!(f, "initializing"),
      EngineStatus::Ready => write!(f, "ready"),
      EngineStatus::Failed { message } => write!(f, "failed: {}", message),
    }
  }
}

/// Owns one [`ScriptEngine`] for the lifetime of the process.
pub struct EngineHost<E> {
  engine: E,
  log: EngineLog,
  status: watch::Sender<EngineStatus>,
  init: OnceCell<Result<(), String>>,
  runs: Mutex<()>,
}

impl<E: ScriptEngine> EngineHost<E> {
  pub fn new(engine: E) -> Self {
    Self::with_notifier(engine, NoopNotifier)
  }

  pub fn with_notifier(engine: E, notifier: impl EngineNotifier + 'static) -> Self {
    let (status, _) = watch::channel(EngineStatus::Uninitialized);
    Self {
      engine,
      log: EngineLog::new(Arc::new(notifier)),
      status,
      init: OnceCell::new(),
      runs: Mutex::new(()),
    }
  }

  pub fn status(&self) -> EngineStatus {
    self.status.borrow().clone()
  }

  pub fn is_ready(&self) -> bool {
    matches!(*self.status.borrow(), EngineStatus::Ready)
  }

  /// Watch status transitions.
  pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
    self.status.subscribe()
  }

  /// Engine log so far, oldest first.
  pub fn log(&self) -> Vec<EngineEvent> {
    self.log.events()
  }

  /// Initialize the engine.
  ///
  /// Runs the engine's initialization at most once. Concurrent and later
  /// callers get the outcome of that single attempt; a failure is terminal.
  pub async fn initialize(&self) -> Result<(), EngineError> {
    let outcome = self
      .init
      .get_or_init(|| async {
        self.status.send_replace(EngineStatus::Initializing);
        self.log.info("Initializing script engine");

        match self.engine.initialize(&self.log).await {
          Ok(()) => {
            self.log.success("Script engine ready");
            self.status.send_replace(EngineStatus::Ready);
            Ok(())
          }
          Err(e) => {
            let message = e.to_string();
            self
              .log
              .error(format!("Script engine failed to initialize: {}", message));
            self.status.send_replace(EngineStatus::Failed {
              message: message.clone(),
            });
            Err(message)
          }
        }
      })
      .await;

    outcome
      .clone()
      .map_err(|message| EngineError::Initialization { message })
  }

  /// Run a composed script.
  ///
  /// Runs are serialized; concurrent callers queue in arrival order.
  #[instrument(name = "engine_run", skip(self, source), fields(source_len = source.len()))]
  pub async fn run(&self, source: &str) -> Result<serde_json::Value, EngineError> {
    let status = self.status();
    if status != EngineStatus::Ready {
      return Err(EngineError::Unavailable {
        status: status.to_string(),
      });
    }

    let _guard = self.runs.lock().await;
    let result = self.engine.run(source).await;
    if let Err(e) = &result {
      info!(error = %e, "script raised");
    }
    result
  }
}
