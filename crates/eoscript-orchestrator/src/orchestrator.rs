//! Run orchestration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use eoscript_config::{BandVariable, ExecutionConfig, Settings};
use eoscript_engine::{EngineError, EngineHost, ScriptEngine};
use eoscript_graph::{GraphResult, ServiceInfo, SubmissionFailure, extract};
use eoscript_openeo::{ClientError, Credential, CredentialSource, ServiceApi, format_issues};
use eoscript_preamble::{compose, resolve_selection};
use eoscript_store::SessionStore;
use tokio::sync::{Mutex, watch};
use tracing::{Span, error, info, instrument, warn};

use crate::error::RunError;
use crate::report::{RunOutcome, RunPhase, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
  /// Validate each graph with the API before creating its service.
  pub validate_graphs: bool,
  /// Delete replaced and superseded services remotely.
  pub cleanup_services: bool,
}

impl Default for OrchestratorOptions {
  fn default() -> Self {
    Self {
      validate_graphs: false,
      cleanup_services: true,
    }
  }
}

impl From<&Settings> for OrchestratorOptions {
  fn from(settings: &Settings) -> Self {
    Self {
      validate_graphs: settings.validate_graphs,
      cleanup_services: settings.cleanup_services,
    }
  }
}

/// A graph whose submission failed, with enough context to build a
/// [`RunError`] if none of its siblings succeeded.
struct Failed {
  graph: String,
  message: String,
  network: bool,
}

impl Failed {
  fn client(graph: &str, e: ClientError) -> Self {
    Self {
      graph: graph.to_string(),
      network: matches!(e, ClientError::Network(_)),
      message: e.to_string(),
    }
  }

  fn into_error(self) -> RunError {
    if self.network {
      RunError::Network(self.message)
    } else {
      RunError::Submission {
        graph: self.graph,
        message: self.message,
      }
    }
  }
}

/// Ties engine, API and session store together.
///
/// Shared as `Arc<Orchestrator<..>>`; `run` may be called concurrently.
pub struct Orchestrator<E, A> {
  engine: Arc<EngineHost<E>>,
  api: Arc<A>,
  store: Arc<SessionStore>,
  credentials: CredentialSource,
  options: OrchestratorOptions,
  bands: RwLock<Vec<BandVariable>>,
  latest: AtomicU64,
  publishing: Mutex<()>,
  phase: watch::Sender<RunPhase>,
}

impl<E, A> Orchestrator<E, A>
where
  E: ScriptEngine,
  A: ServiceApi + 'static,
{
  pub fn new(
    engine: Arc<EngineHost<E>>,
    api: Arc<A>,
    store: Arc<SessionStore>,
    credentials: CredentialSource,
    options: OrchestratorOptions,
  ) -> Self {
    let (phase, _) = watch::channel(RunPhase::Idle);
    Self {
      engine,
      api,
      store,
      credentials,
      options,
      bands: RwLock::new(Vec::new()),
      latest: AtomicU64::new(0),
      publishing: Mutex::new(()),
      phase,
    }
  }

  /// Band metadata of the active collection, used to resolve selections.
  pub fn set_available_bands(&self, bands: Vec<BandVariable>) {
    *self.bands.write().unwrap_or_else(PoisonError::into_inner) = bands;
  }

  /// True when the engine is ready and a credential is present.
  pub fn can_run(&self) -> bool {
    self.engine.is_ready() && self.credentials.is_present()
  }

  /// Phase of the most recently started run.
  pub fn phase(&self) -> watch::Receiver<RunPhase> {
    self.phase.subscribe()
  }

  /// Run the current session script and publish its services.
  ///
  /// The session snapshot and the credential are captured when the run
  /// starts; later edits or sign-out do not affect a run in flight. A run
  /// whose configuration was changed before it could publish is superseded.
  #[instrument(name = "orchestrator_run", skip(self), fields(run = tracing::field::Empty))]
  pub async fn run(&self) -> Result<RunReport, RunError> {
    if !self.engine.is_ready() {
      return Err(RunError::NotReady {
        reason: format!("script engine is {}", self.engine.status()),
      });
    }
    let credential = self.credentials.current().ok_or_else(|| RunError::NotReady {
      reason: "not signed in".to_string(),
    })?;

    let run = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
    Span::current().record("run", run);
    let snapshot = self.store.snapshot();
    let config = snapshot.execution_config();
    info!(
      run,
      collection = %config.collection_id,
      bands = ?config.selected_bands,
      "run_started"
    );

    let result = self
      .execute(run, &snapshot.script, &config, snapshot.config_generation, &credential)
      .await;
    self.set_phase(run, RunPhase::Idle);

    match result {
      Ok(report) => {
        info!(
          run,
          outcome = ?report.outcome,
          services = report.services.len(),
          failures = report.failures.len(),
          "run_completed"
        );
        Ok(report)
      }
      Err(e) if !self.is_latest(run) => {
        warn!(run, error = %e, "superseded run failed");
        Ok(RunReport::superseded(run))
      }
      Err(e) => {
        error!(run, error = %e, "run_failed");
        Err(e)
      }
    }
  }

  async fn execute(
    &self,
    run: u64,
    script: &str,
    config: &ExecutionConfig,
    config_generation: u64,
    credential: &Credential,
  ) -> Result<RunReport, RunError> {
    self.set_phase(run, RunPhase::Composing);
    let source = {
      let available = self.bands.read().unwrap_or_else(PoisonError::into_inner);
      let bands = resolve_selection(&available, &config.selected_bands)
        .map_err(|e| RunError::Composition(e.to_string()))?;
      compose(script, config, &bands).map_err(|e| RunError::Composition(e.to_string()))?
    };

    self.set_phase(run, RunPhase::Executing);
    let raw = self.engine.run(&source).await.map_err(|e| match e {
      EngineError::Execution { diagnostic } => RunError::Execution { diagnostic },
      EngineError::Io(e) => RunError::Execution {
        diagnostic: e.to_string(),
      },
      other => RunError::EngineUnavailable(other.to_string()),
    })?;

    self.set_phase(run, RunPhase::Extracting);
    let graphs = extract(&raw).map_err(|e| RunError::MalformedResult(e.to_string()))?;
    info!(run, graphs = graphs.len(), "graphs_extracted");

    self.set_phase(run, RunPhase::Submitting);
    let (services, mut failed) = self.submit_all(graphs, credential).await;
    if services.is_empty() && !failed.is_empty() {
      return Err(failed.swap_remove(0).into_error());
    }
    let failures: Vec<_> = failed
      .into_iter()
      .map(|f| SubmissionFailure {
        graph_name: f.graph,
        error: f.message,
      })
      .collect();

    self.set_phase(run, RunPhase::Publishing);
    let replaced = {
      let _guard = self.publishing.lock().await;
      if !self.is_latest(run) {
        None
      } else {
        let replaced =
          self
            .store
            .publish_if_current(config_generation, services.clone(), failures.clone());
        if replaced.is_none() {
          info!(run, "configuration changed during run");
        }
        replaced
      }
    };

    match replaced {
      Some(replaced) => {
        self.cleanup(&replaced, credential).await;
        Ok(RunReport {
          run,
          outcome: RunOutcome::Published,
          services,
          failures,
        })
      }
      None => {
        info!(run, latest = self.latest.load(Ordering::SeqCst), "run_superseded");
        self.cleanup(&services, credential).await;
        Ok(RunReport::superseded(run))
      }
    }
  }

  /// Submit every graph concurrently and wait for all of them.
  ///
  /// Successes keep graph order.
  async fn submit_all(
    &self,
    graphs: Vec<GraphResult>,
    credential: &Credential,
  ) -> (Vec<ServiceInfo>, Vec<Failed>) {
    let names: Vec<_> = graphs.iter().map(|g| g.name.clone()).collect();
    let handles: Vec<_> = graphs
      .into_iter()
      .map(|graph| {
        let api = self.api.clone();
        let credential = credential.clone();
        let validate = self.options.validate_graphs;
        tokio::spawn(async move { submit_one(api.as_ref(), graph, &credential, validate).await })
      })
      .collect();

    let mut services = Vec::new();
    let mut failed = Vec::new();
    for (name, joined) in names.into_iter().zip(futures::future::join_all(handles).await) {
      match joined {
        Ok(Ok(service)) => services.push(service),
        Ok(Err(f)) => {
          warn!(graph = %f.graph, error = %f.message, "submission_failed");
          failed.push(f);
        }
        // A panicked task has no `Failed` to report, so fall back to the
        // name taken before spawning.
        Err(e) => {
          warn!(graph = %name, error = %e, "submission task failed");
          failed.push(Failed {
            graph: name,
            message: format!("submission task failed: {}", e),
            network: false,
          });
        }
      }
    }
    (services, failed)
  }

  /// Best-effort remote deletion.
  async fn cleanup(&self, services: &[ServiceInfo], credential: &Credential) {
    if !self.options.cleanup_services || services.is_empty() {
      return;
    }
    let deletions = services.iter().map(|service| async move {
      if let Err(e) = self.api.delete(&service.location, credential).await {
        warn!(location = %service.location, error = %e, "service cleanup failed");
      }
    });
    futures::future::join_all(deletions).await;
  }

  fn is_latest(&self, run: u64) -> bool {
    self.latest.load(Ordering::SeqCst) == run
  }

  fn set_phase(&self, run: u64, phase: RunPhase) {
    if self.is_latest(run) {
      self.phase.send_replace(phase);
    }
  }
}

async fn submit_one<A: ServiceApi + ?Sized>(
  api: &A,
  graph: GraphResult,
  credential: &Credential,
  validate: bool,
) -> Result<ServiceInfo, Failed> {
  if validate {
    let issues = api
      .validate(&graph, credential)
      .await
      .map_err(|e| Failed::client(&graph.name, e))?;
    if !issues.is_empty() {
      return Err(Failed {
        graph: graph.name.clone(),
        message: format_issues(&issues),
        network: false,
      });
    }
  }
  api
    .submit(&graph, credential)
    .await
    .map_err(|e| Failed::client(&graph.name, e))
}
