//! EngineHost lifecycle tests against an in-memory engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use eoscript_engine::{
  ChannelNotifier, EngineError, EngineHost, EngineLog, EngineStatus, LogLevel, ScriptEngine,
};
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeEngine {
  fail_init: bool,
  init_calls: AtomicUsize,
  active: AtomicUsize,
  max_active: AtomicUsize,
}

#[async_trait]
impl ScriptEngine for FakeEngine {
  async fn initialize(&self, log: &EngineLog) -> Result<(), EngineError> {
    self.init_calls.fetch_add(1, Ordering::SeqCst);
    log.info("Loading fake runtime");
    tokio::time::sleep(Duration::from_millis(20)).await;
    if self.fail_init {
      return Err(EngineError::Initialization {
        message: "runtime download failed".to_string(),
      });
    }
    log.success("Fake runtime loaded");
    Ok(())
  }

  async fn run(&self, source: &str) -> Result<serde_json::Value, EngineError> {
    let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_active.fetch_max(active, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(10)).await;
    self.active.fetch_sub(1, Ordering::SeqCst);

    if let Some(message) = source.strip_prefix("raise ") {
      return Err(EngineError::Execution {
        diagnostic: format!("Traceback (most recent call last):\n  ...\nValueError: {message}"),
      });
    }
    Ok(serde_json::json!({ "echo": source }))
  }
}

#[tokio::test]
async fn test_initialize_runs_once() {
  let host = Arc::new(EngineHost::new(FakeEngine::default()));
  assert_eq!(host.status(), EngineStatus::Uninitialized);

  let (a, b) = tokio::join!(host.initialize(), host.initialize());
  assert!(a.is_ok() && b.is_ok());
  host.initialize().await.unwrap();

  assert_eq!(host.status(), EngineStatus::Ready);
  assert!(host.is_ready());
}

#[tokio::test]
async fn test_initialize_calls_engine_once() {
  let engine = Arc::new(FakeEngine::default());
  let host = EngineHost::new(engine.clone());

  let _ = tokio::join!(host.initialize(), host.initialize(), host.initialize());
  assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_log_is_ordered_and_streamed() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let host = EngineHost::with_notifier(FakeEngine::default(), ChannelNotifier::new(tx));
  host.initialize().await.unwrap();

  let messages: Vec<_> = host.log().into_iter().map(|e| e.message).collect();
  assert_eq!(
    messages,
    [
      "Initializing script engine",
      "Loading fake runtime",
      "Fake runtime loaded",
      "Script engine ready",
    ]
  );

  let mut streamed = Vec::new();
  while let Ok(event) = rx.try_recv() {
    streamed.push(event.message);
  }
  assert_eq!(streamed, messages);
}

#[tokio::test]
async fn test_failed_initialization_is_terminal() {
  let engine = Arc::new(FakeEngine {
    fail_init: true,
    ..Default::default()
  });
  let host = EngineHost::new(engine.clone());

  let err = host.initialize().await.unwrap_err();
  assert!(err.to_string().contains("runtime download failed"));
  assert!(matches!(host.status(), EngineStatus::Failed { .. }));

  let last = host.log().pop().unwrap();
  assert_eq!(last.level, LogLevel::Error);

  assert!(host.initialize().await.is_err());
  assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);

  let err = host.run("1 + 1").await.unwrap_err();
  assert!(matches!(err, EngineError::Unavailable { .. }));
}

#[tokio::test]
async fn test_run_before_initialize_is_unavailable() {
  let host = EngineHost::new(FakeEngine::default());
  let err = host.run("1 + 1").await.unwrap_err();
  assert!(matches!(err, EngineError::Unavailable { status } if status == "uninitialized"));
}

#[tokio::test]
async fn test_runs_are_serialized() {
  let engine = Arc::new(FakeEngine::default());
  let host = Arc::new(EngineHost::new(engine.clone()));
  host.initialize().await.unwrap();

  let handles: Vec<_> = (0..5)
    .map(|i| {
      let host = host.clone();
      tokio::spawn(async move { host.run(&format!("run {i}")).await })
    })
    .collect();
  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execution_diagnostic_is_passed_through() {
  let host = EngineHost::new(FakeEngine::default());
  host.initialize().await.unwrap();

  let err = host.run("raise bad band B99").await.unwrap_err();
  match err {
    EngineError::Execution { diagnostic } => {
      assert!(diagnostic.starts_with("Traceback"));
      assert!(diagnostic.ends_with("ValueError: bad band B99"));
    }
    other => panic!("unexpected error: {other}"),
  }

  let value = host.run("ok").await.unwrap();
  assert_eq!(value["echo"], "ok");
}

#[tokio::test]
async fn test_status_is_observable() {
  let host = EngineHost::new(FakeEngine::default());
  let mut status = host.subscribe();
  host.initialize().await.unwrap();

  status.changed().await.unwrap();
  assert_eq!(*status.borrow_and_update(), EngineStatus::Ready);
}
