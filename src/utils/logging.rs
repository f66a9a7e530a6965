//! Logging initialization for hosts embedding the module manager
//!
//! The library itself only emits `tracing` events (through
//! [`TracingSink`](crate::module::TracingSink)); installing a subscriber is the
//! host's call. These helpers do it the usual way:
//! - `RUST_LOG` takes precedence over any configured filter
//! - falls back to the config filter, then to `"info"`
//! - `NO_COLOR` disables ANSI colors
//!
//! # Usage
//! ```rust
//! use bllvm_modules::utils::init_logging;
//!
//! let _ = init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info";

/// RUST_LOG, else the configured filter, else "info"
fn env_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER))
}

/// Install a human-readable subscriber on stderr
///
/// Fails if a global subscriber is already installed.
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g. "info", "bllvm_modules=debug").
///   Ignored when RUST_LOG is set.
///
/// # Example
/// ```rust
/// use bllvm_modules::utils::init_logging;
///
/// // Override with config filter (RUST_LOG still takes precedence)
/// init_logging(Some("bllvm_modules=debug")).ok();
/// ```
pub fn init_logging(filter: Option<&str>) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .try_init()
}

/// Install a JSON-lines subscriber (for log aggregation)
///
/// Diagnostics carry their fields in the message; hosts that want the raw
/// structured events should use a custom [`DiagnosticSink`](crate::module::DiagnosticSink)
/// and serialize [`Diagnostic`](crate::module::Diagnostic) directly.
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .try_init()
}

/// Initialize logging from the `[logging]` section of a [`ManagerConfig`](crate::config::ManagerConfig)
///
/// `json_format = true` without the `json-logging` feature falls back to
/// human-readable output.
///
/// # Example
/// ```rust
/// use bllvm_modules::config::ManagerConfig;
/// use bllvm_modules::utils::init_logging_from_config;
///
/// let config = ManagerConfig::default();
/// init_logging_from_config(config.logging.as_ref()).ok();
/// ```
pub fn init_logging_from_config(config: Option<&LoggingConfig>) -> Result<(), TryInitError> {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            return init_json_logging(filter);
        }
    }
    init_logging(filter)
}
