//! Debounced commits of rapidly changing values.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::SessionStore;

enum Command<T> {
  Push(T),
  Flush(oneshot::Sender<()>),
}

/// Commits the latest pushed value once pushes stop for `interval`.
///
/// Must be created inside a tokio runtime. Dropping the debouncer stops the
/// worker after committing any pending value.
pub struct Debouncer<T> {
  commands: mpsc::UnboundedSender<Command<T>>,
  cancel: CancellationToken,
  worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
  pub fn new<F>(interval: Duration, commit: F) -> Self
  where
    F: Fn(T) + Send + 'static,
  {
    let (commands, receiver) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(run(interval, receiver, cancel.clone(), commit));
    Self {
      commands,
      cancel,
      worker: Some(worker),
    }
  }

  /// Replace the pending value and restart the quiet period.
  pub fn push(&self, value: T) {
    let _ = self.commands.send(Command::Push(value));
  }

  /// Commit the pending value now, if any.
  pub async fn flush(&self) {
    let (done, wait) = oneshot::channel();
    if self.commands.send(Command::Flush(done)).is_ok() {
      let _ = wait.await;
    }
  }

  /// Commit the pending value, if any, and stop the worker.
  pub async fn shutdown(mut self) {
    self.cancel.cancel();
    if let Some(worker) = self.worker.take() {
      let _ = worker.await;
    }
  }
}

impl<T> Drop for Debouncer<T> {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

async fn run<T, F>(
  interval: Duration,
  mut commands: mpsc::UnboundedReceiver<Command<T>>,
  cancel: CancellationToken,
  commit: F,
) where
  F: Fn(T),
{
  let mut pending: Option<T> = None;
  let deadline = tokio::time::sleep(interval);
  tokio::pin!(deadline);

  loop {
    tokio::select! {
      _ = cancel.cancelled() => {
        // Pick up pushes that raced the cancellation.
        while let Ok(command) = commands.try_recv() {
          match command {
            Command::Push(value) => pending = Some(value),
            Command::Flush(done) => {
              let _ = done.send(());
            }
          }
        }
        if let Some(value) = pending.take() {
          commit(value);
        }
        break;
      }
      command = commands.recv() => match command {
        Some(Command::Push(value)) => {
          pending = Some(value);
          deadline.as_mut().reset(Instant::now() + interval);
        }
        Some(Command::Flush(done)) => {
          if let Some(value) = pending.take() {
            commit(value);
          }
          let _ = done.send(());
        }
        None => {
          if let Some(value) = pending.take() {
            commit(value);
          }
          break;
        }
      },
      _ = &mut deadline, if pending.is_some() => {
        if let Some(value) = pending.take() {
          commit(value);
        }
      }
    }
  }
  debug!("debouncer stopped");
}

/// Feeds editor text into [`SessionStore::set_script`] after a quiet period.
pub struct EditorSync {
  debouncer: Debouncer<String>,
}

impl EditorSync {
  pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
    Self {
      debouncer: Debouncer::new(interval, move |script: String| store.set_script(script)),
    }
  }

  /// Current editor text.
  pub fn edit(&self, text: impl Into<String>) {
    self.debouncer.push(text.into());
  }

  pub async fn flush(&self) {
    self.debouncer.flush().await;
  }

  pub async fn shutdown(self) {
    self.debouncer.shutdown().await;
  }
}
