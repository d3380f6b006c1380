//! Emulator configuration.

use std::env;

/// Service-level configuration for the emulator.
#[derive(Debug, Clone)]
pub struct BaddbConfig {
    /// Region used when synthesizing table ARNs.
    pub default_region: String,
    /// Default staleness window, in seconds, applied to new tables.
    pub default_table_delay_seconds: i64,
    /// Default GSI staleness window, in seconds, applied to new tables.
    pub default_gsi_delay_seconds: i64,
}

impl BaddbConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            default_region: env::var("DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_owned()),
            default_table_delay_seconds: env_i64("BADDB_TABLE_DELAY_SECONDS", 0),
            default_gsi_delay_seconds: env_i64("BADDB_GSI_DELAY_SECONDS", 0),
        }
    }
}

impl Default for BaddbConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_owned(),
            default_table_delay_seconds: 0,
            default_gsi_delay_seconds: 0,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
