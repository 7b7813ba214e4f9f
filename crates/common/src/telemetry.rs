//! Tracing setup shared by the gateway and the CLI

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Build the log filter: `RUST_LOG` wins, then the configured level
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to stderr. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = env_filter(config);

    let result = if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
