//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the data-flow
//! service as an `Arc<DataFlowConfig>`. Request handling never reads environment variables;
//! the binary does that and hands the raw values to the parsers below.

use crate::constants::{
    BYTES_PER_MB, DEFAULT_DATABASE_PATH, DEFAULT_DATA_LINK_TTL_IN_MINUTES,
    DEFAULT_DATA_SIZE_LIMIT_IN_MBS,
};
use crate::error::{ConfigError, ConfigResult};
use chrono::Duration;
use std::path::PathBuf;

/// Limits governing how health information is handed out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFlowConfig {
    data_size_limit_in_mbs: u32,
    data_link_ttl_in_minutes: u32,
}

impl DataFlowConfig {
    /// Create a new `DataFlowConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] if either value is zero. A zero TTL would expire
    /// every link on creation and a zero size limit would turn every payload into a link.
    pub fn new(data_size_limit_in_mbs: u32, data_link_ttl_in_minutes: u32) -> ConfigResult<Self> {
        if data_size_limit_in_mbs == 0 {
            return Err(ConfigError::InvalidInput(
                "data_size_limit_in_mbs must be greater than zero".into(),
            ));
        }
        if data_link_ttl_in_minutes == 0 {
            return Err(ConfigError::InvalidInput(
                "data_link_ttl_in_minutes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_size_limit_in_mbs,
            data_link_ttl_in_minutes,
        })
    }

    pub fn data_size_limit_in_mbs(&self) -> u32 {
        self.data_size_limit_in_mbs
    }

    pub fn data_link_ttl_in_minutes(&self) -> u32 {
        self.data_link_ttl_in_minutes
    }

    /// The inline size limit in bytes.
    pub fn data_size_limit_in_bytes(&self) -> u64 {
        u64::from(self.data_size_limit_in_mbs) * BYTES_PER_MB
    }

    /// How long a link stays resolvable after it is created.
    pub fn data_link_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.data_link_ttl_in_minutes))
    }
}

impl Default for DataFlowConfig {
    fn default() -> Self {
        Self {
            data_size_limit_in_mbs: DEFAULT_DATA_SIZE_LIMIT_IN_MBS,
            data_link_ttl_in_minutes: DEFAULT_DATA_LINK_TTL_IN_MINUTES,
        }
    }
}

/// Parse a `u32` setting from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInput`] naming `name` if the value is not a valid `u32`.
pub fn u32_from_env_value(name: &str, value: Option<String>, default: u32) -> ConfigResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        Some(v) => v
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidInput(format!("{name}='{v}': {e}"))),
        None => Ok(default),
    }
}

/// Resolve the database path from an optional string value.
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}
