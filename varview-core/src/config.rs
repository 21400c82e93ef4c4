//! Configuration types

use crate::constants::*;
use crate::{ConfigError, VarviewError, VarviewResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the operation queue drain worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Yield to the scheduler after each operation so readers can observe
    /// the settled state between passes (default: true)
    pub yield_between_operations: bool,

    /// How many recent drain records to keep (default: 64, 0 disables)
    pub history_capacity: usize,

    /// Log every applied operation at debug level (default: true)
    pub log_operations: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            yield_between_operations: DEFAULT_QUEUE_YIELD_BETWEEN_OPERATIONS,
            history_capacity: DEFAULT_QUEUE_HISTORY_CAPACITY,
            log_operations: DEFAULT_QUEUE_LOG_OPERATIONS,
        }
    }
}

impl QueueConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `VARVIEW_QUEUE_YIELD`: Yield between operations (default: true)
    /// - `VARVIEW_QUEUE_HISTORY_CAPACITY`: Drain history size (default: 64)
    /// - `VARVIEW_QUEUE_LOG_OPERATIONS`: Log each operation (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            yield_between_operations: std::env::var(ENV_QUEUE_YIELD)
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.yield_between_operations),
            history_capacity: std::env::var(ENV_QUEUE_HISTORY_CAPACITY)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.history_capacity),
            log_operations: std::env::var(ENV_QUEUE_LOG_OPERATIONS)
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.log_operations),
        }
    }

    /// Parse from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(contents: &str) -> VarviewResult<Self> {
        let config: QueueConfig = toml::from_str(contents).map_err(|e| {
            VarviewError::Config(ConfigError::Parse {
                reason: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_path(path: &Path) -> VarviewResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VarviewError::Config(ConfigError::Io {
                reason: format!("{}: {}", path.display(), e),
            })
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> VarviewResult<()> {
        if self.history_capacity > MAX_QUEUE_HISTORY_CAPACITY {
            return Err(VarviewError::Config(ConfigError::InvalidValue {
                field: "history_capacity".to_string(),
                value: self.history_capacity.to_string(),
                reason: format!("history_capacity must be at most {}", MAX_QUEUE_HISTORY_CAPACITY),
            }));
        }
        Ok(())
    }
}

fn parse_flag(s: &str) -> bool {
    !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off")
}

// =============================================================================
// TESTS
// =============================================================================
