mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::warn;

use eoscript_config::{BandVariable, BoundingBox, Settings, TemporalRange, builtin_scenes, find_scene};
use eoscript_engine::{ChannelNotifier, EngineEvent, EngineHost, LogLevel, PythonEngine};
use eoscript_openeo::{Credential, CredentialSource, OpenEoClient, extract_bands, group_bands};
use eoscript_orchestrator::{Orchestrator, OrchestratorOptions};
use eoscript_preamble::{compose, resolve_selection};
use eoscript_store::{EditorSync, FsStorage, ResetDefaults, SessionStore};

/// eoscript - run satellite imagery scripts as openEO tile services
#[derive(Parser)]
#[command(name = "eoscript")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.eoscript)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// openEO API base url (overrides settings.json)
  #[arg(long, global = true, env = "EOSCRIPT_API_URL")]
  api_url: Option<String>,

  /// Access token for the openEO API
  #[arg(long, global = true, env = "EOSCRIPT_TOKEN", hide_env_values = true)]
  token: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the collections offered by the API
  Collections,

  /// Show the spectral bands of a collection
  Bands {
    /// Collection id (default: the session's collection)
    collection_id: Option<String>,
  },

  /// List the built-in scenes
  Scenes,

  /// Inspect or edit the saved session
  Session {
    #[command(subcommand)]
    action: SessionAction,
  },

  /// Print the script exactly as it is handed to the engine
  Compose {
    /// Script file to use instead of the session script
    #[arg(long)]
    script: Option<PathBuf>,
  },

  /// Run the session script and publish its tile services
  Run {
    /// Script file to load into the session before running
    #[arg(long)]
    script: Option<PathBuf>,
  },
}

#[derive(Subcommand)]
enum SessionAction {
  /// Print the session as JSON
  Show,

  /// Reset the session to its defaults
  Reset,

  /// Load a built-in scene into the session
  Scene { scene_id: String },

  /// Change configuration values
  Set {
    #[arg(long)]
    collection: Option<String>,

    /// Start date, YYYY-MM-DD
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// End date, YYYY-MM-DD
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Maximum cloud cover, 0-100
    #[arg(long)]
    cloud_cover: Option<u8>,

    /// Comma-separated band ids, in the order the script reads them
    #[arg(long, value_delimiter = ',')]
    bands: Option<Vec<String>>,

    /// Bounding box as west,south,east,north
    #[arg(long, value_delimiter = ',', num_args = 4, allow_negative_numbers = true)]
    bbox: Option<Vec<f64>>,

    /// Remove the bounding box
    #[arg(long, conflicts_with = "bbox")]
    clear_bbox: bool,
  },
}

struct App {
  data_dir: PathBuf,
  settings: Settings,
  credentials: CredentialSource,
}

impl App {
  fn load(cli: &Cli) -> Result<Self> {
    let data_dir = match &cli.data_dir {
      Some(dir) => dir.clone(),
      None => dirs::home_dir()
        .context("could not determine home directory")?
        .join(".eoscript"),
    };

    let settings_path = data_dir.join("settings.json");
    let mut settings = Settings::load(&settings_path)
      .with_context(|| format!("failed to load settings: {}", settings_path.display()))?;
    if let Some(api_url) = &cli.api_url {
      settings.api_url = api_url.clone();
    }

    let credentials = CredentialSource::new(cli.token.clone().map(Credential::new));
    Ok(Self {
      data_dir,
      settings,
      credentials,
    })
  }

  fn store(&self) -> Arc<SessionStore> {
    let storage = Arc::new(FsStorage::new(self.data_dir.join("session")));
    Arc::new(SessionStore::open(storage, &self.settings.storage_namespace))
  }

  fn client(&self) -> Result<OpenEoClient> {
    OpenEoClient::from_settings(&self.settings).context("failed to create openEO client")
  }

  /// Band metadata for `collection_id`, or none if it cannot be fetched.
  async fn bands(&self, collection_id: &str) -> Vec<BandVariable> {
    let credential = self.credentials.current();
    let client = match self.client() {
      Ok(client) => client,
      Err(e) => {
        warn!(error = %e, "band metadata unavailable");
        return Vec::new();
      }
    };
    match client.get_collection(collection_id, credential.as_ref()).await {
      Ok(collection) => extract_bands(&collection),
      Err(e) => {
        warn!(collection = %collection_id, error = %e, "band metadata unavailable");
        Vec::new()
      }
    }
  }
}

fn main() -> Result<()> {
  logging::init();
  let cli = Cli::parse();
  let app = App::load(&cli)?;

  let Some(command) = cli.command else {
    println!("eoscript - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Collections => list_collections(&app).await,
      Commands::Bands { collection_id } => show_bands(&app, collection_id).await,
      Commands::Scenes => {
        list_scenes();
        Ok(())
      }
      Commands::Session { action } => session(&app, action),
      Commands::Compose { script } => compose_script(&app, script.as_deref()).await,
      Commands::Run { script } => run(&app, script.as_deref()).await,
    }
  })
}

async fn list_collections(app: &App) -> Result<()> {
  let credential = app.credentials.current();
  let list = app
    .client()?
    .list_collections(credential.as_ref())
    .await
    .context("failed to list collections")?;

  for collection in &list.collections {
    println!("{:<32} {}", collection.id, collection.display_title());
  }
  Ok(())
}

async fn show_bands(app: &App, collection_id: Option<String>) -> Result<()> {
  let collection_id = collection_id.unwrap_or_else(|| app.store().snapshot().collection_id);
  let credential = app.credentials.current();
  let collection = app
    .client()?
    .get_collection(&collection_id, credential.as_ref())
    .await
    .with_context(|| format!("failed to fetch collection {}", collection_id))?;

  let groups = group_bands(&extract_bands(&collection));
  for (title, bands) in [("Reflectance", &groups.reflectance), ("Other", &groups.other)] {
    if bands.is_empty() {
      continue;
    }
    println!("{}:", title);
    for band in bands.iter() {
      println!(
        "  {:<6} {:<20} {:<6} {:<8} {}",
        band.variable,
        band.label,
        band.resolution.as_deref().unwrap_or("-"),
        band.wavelength.as_deref().unwrap_or("-"),
        band.path
      );
    }
  }
  Ok(())
}

fn list_scenes() {
  for scene in builtin_scenes() {
    println!("{:<28} {}", scene.id, scene.name);
    println!("{:<28} {}", "", scene.description);
  }
}

fn session(app: &App, action: SessionAction) -> Result<()> {
  let store = app.store();
  match action {
    SessionAction::Show => {
      println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    }
    SessionAction::Reset => {
      store.reset_to_defaults(ResetDefaults::default());
      eprintln!("Session reset");
    }
    SessionAction::Scene { scene_id } => {
      let scene = find_scene(&scene_id).with_context(|| format!("unknown scene '{}'", scene_id))?;
      store.hydrate_from_scene(&scene);
      eprintln!("Loaded scene: {}", scene.name);
    }
    SessionAction::Set {
      collection,
      start,
      end,
      cloud_cover,
      bands,
      bbox,
      clear_bbox,
    } => {
      if let Some(collection) = collection {
        store.set_collection_id(collection);
      }
      if let (Some(start), Some(end)) = (start, end) {
        store.set_temporal_range(TemporalRange::new(start, end))?;
      }
      if let Some(cloud_cover) = cloud_cover {
        store.set_cloud_cover(cloud_cover)?;
      }
      if let Some(bands) = bands {
        store.set_selected_bands(bands);
      }
      if let Some(bbox) = bbox {
        let [west, south, east, north] = bbox[..] else {
          bail!("--bbox needs exactly four values");
        };
        store.set_bounding_box(Some(BoundingBox::new(west, south, east, north)));
      }
      if clear_bbox {
        store.set_bounding_box(None);
      }
      println!("{}", serde_json::to_string_pretty(&store.snapshot().execution_config())?);
    }
  }
  Ok(())
}

async fn compose_script(app: &App, script: Option<&Path>) -> Result<()> {
  let state = app.store().snapshot();
  let script = match script {
    Some(path) => read_script(path).await?,
    None => state.script.clone(),
  };
  let config = state.execution_config();

  let available = app.bands(&config.collection_id).await;
  let bands = resolve_selection(&available, &config.selected_bands)?;
  print!("{}", compose(&script, &config, &bands)?);
  Ok(())
}

async fn run(app: &App, script: Option<&Path>) -> Result<()> {
  let store = app.store();
  if let Some(path) = script {
    // Same path as editor input: the debounced sync commits on shutdown.
    let sync = EditorSync::new(
      store.clone(),
      Duration::from_millis(app.settings.editor_debounce_ms),
    );
    sync.edit(read_script(path).await?);
    sync.shutdown().await;
  }
  if !app.credentials.is_present() {
    bail!("no access token: pass --token or set EOSCRIPT_TOKEN");
  }

  let (events, mut received) = mpsc::unbounded_channel::<EngineEvent>();
  let printer = tokio::spawn(async move {
    while let Some(event) = received.recv().await {
      let marker = match event.level {
        LogLevel::Info => "..",
        LogLevel::Success => "ok",
        LogLevel::Error => "!!",
      };
      eprintln!("[{}] {}", marker, event.message);
    }
  });

  let engine = PythonEngine::new(&app.settings.python)
    .with_packages(app.settings.python_packages.iter().cloned())
    .install_missing(app.settings.install_packages);
  let engine = Arc::new(EngineHost::with_notifier(engine, ChannelNotifier::new(events)));
  let result = async {
    engine
      .initialize()
      .await
      .context("script engine failed to start")?;

    let collection_id = store.snapshot().collection_id;
    let orchestrator = Orchestrator::new(
      engine.clone(),
      Arc::new(app.client()?),
      store.clone(),
      app.credentials.clone(),
      OrchestratorOptions::from(&app.settings),
    );
    orchestrator.set_available_bands(app.bands(&collection_id).await);
    Ok::<_, anyhow::Error>(orchestrator.run().await)
  }
  .await;

  // The printer ends once the last notifier handle is gone.
  drop(engine);
  let _ = printer.await;

  match result? {
    Ok(report) => {
      for service in &report.services {
        let source = service.layer_source();
        println!("{}\t{}", service.graph_result.name, source.tiles.join(" "));
      }
      for failure in &report.failures {
        eprintln!("failed: {}: {}", failure.graph_name, failure.error);
      }
      Ok(())
    }
    Err(e) => {
      eprintln!("{}", e.summary());
      let detail = e.detail();
      if detail != e.summary() {
        eprintln!("\n{}", detail);
      }
      bail!("run failed")
    }
  }
}

async fn read_script(path: &Path) -> Result<String> {
  tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read script: {}", path.display()))
}
