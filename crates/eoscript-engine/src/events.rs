//! Engine log events and notifiers.
//!
//! Every step of engine initialization produces an [`EngineEvent`]. Events are
//! kept in order by the [`EngineLog`], mirrored to `tracing` and handed to an
//! [`EngineNotifier`] so a view can show initialization progress.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Success,
  Error,
}

/// One engine log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
  pub level: LogLevel,
  pub message: String,
}

/// Trait for receiving engine log events.
pub trait EngineNotifier: Send + Sync {
  fn notify(&self, event: EngineEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl EngineNotifier for NoopNotifier {
  fn notify(&self, _event: EngineEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls initialization. Volume is a
  // handful of events per engine.
  sender: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<EngineEvent>) -> Self {
    Self { sender }
  }
}

impl EngineNotifier for ChannelNotifier {
  fn notify(&self, event: EngineEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// Ordered, append-only engine log.
pub struct EngineLog {
  events: Mutex<Vec<EngineEvent>>,
  notifier: Arc<dyn EngineNotifier>,
}

impl EngineLog {
  pub fn new(notifier: Arc<dyn EngineNotifier>) -> Self {
    Self {
      events: Mutex::new(Vec::new()),
      notifier,
    }
  }

  pub fn info(&self, message: impl Into<String>) {
    self.push(LogLevel::Info, message.into());
  }

  pub fn success(&self, message: impl Into<String>) {
    self.push(LogLevel::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.push(LogLevel::Error, message.into());
  }

  /// Snapshot of all events so far, oldest first.
  pub fn events(&self) -> Vec<EngineEvent> {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn push(&self, level: LogLevel, message: String) {
    match level {
      LogLevel::Error => error!(message = %message, "engine_log"),
      LogLevel::Info | LogLevel::Success => info!(level = ?level, message = %message, "engine_log"),
    }
    let event = EngineEvent { level, message };
    // Append and notify under the lock so observers see the same order.
    let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
    events.push(event.clone());
    self.notifier.notify(event);
  }
}

impl Default for EngineLog {
  fn default() -> Self {
    Self::new(Arc::new(NoopNotifier))
  }
}

impl std::fmt::Debug for EngineLog {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EngineLog")
      .field("events", &self.events())
      .finish_non_exhaustive()
  }
}
