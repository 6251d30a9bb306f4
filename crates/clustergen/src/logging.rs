use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// The environment variable which configures the log filter, e.g.
/// `CLUSTERGEN_LOG=clustergen_apimodel=debug`.
pub const LOG_ENV_VAR: &str = "CLUSTERGEN_LOG";

/// Initializes `tracing` logging with the filter read from the environment
/// variable `env`. If the variable is not set, the maximum log level is INFO.
///
/// Logs are written to stderr.
pub fn initialize_logging(env: &str) {
    let filter = env_filter(env);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt).init();
}

fn env_filter(env: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env)
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}
