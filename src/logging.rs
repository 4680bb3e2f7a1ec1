use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EOSCRIPT_LOG";

/// Install the global subscriber, writing to stderr.
///
/// `EOSCRIPT_LOG` takes precedence over `RUST_LOG`; without either the level
/// is `info`.
pub fn init() {
  let filter = match std::env::var(LOG_ENV) {
    Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|e| {
      eprintln!("invalid {} directive ({}); using info", LOG_ENV, e);
      EnvFilter::new("info")
    }),
    Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
  };

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}
