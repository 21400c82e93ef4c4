//! Tracing subscriber initialisation
//!
//! Embedders call [`init_tracing`] once at startup. Library code only emits
//! `tracing` events and never installs a subscriber itself.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use varview_core::{ConfigError, VarviewResult};

/// Env var selecting the log format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "VARVIEW_LOG_FORMAT";
/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "varview_queue=debug,info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var(ENV_LOG_FORMAT) {
            Ok(s) if s.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Install the global subscriber: an `EnvFilter` (from `RUST_LOG`, falling
/// back to `default_filter`) plus a JSON or pretty fmt layer.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> VarviewResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter).map_err(|e| {
            ConfigError::Telemetry {
                reason: format!("invalid log filter: {}", e),
            }
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    installed.map_err(|e| ConfigError::Telemetry {
        reason: format!("failed to init subscriber: {}", e),
    })?;

    tracing::info!(format = ?config.format, "Tracing initialized");
    Ok(())
}
