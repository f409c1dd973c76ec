//! Structured logging setup.
//!
//! Every lifecycle and protocol event (connect, accept error, malformed
//! packet, read/write error, disconnect) is emitted through `tracing`,
//! tagged with the connection id and peer address. This module only wires
//! the subscriber; the events themselves live with the code that raises
//! them.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber from configuration.
///
/// An explicit `RUST_LOG` environment filter takes precedence over the
/// configured level. Must be called at most once per process.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
