//! Service configuration
//!
//! Everything comes from the environment (with `.env` support via dotenvy).
//! Cache timing is deliberately required: a cache with an accidental default
//! TTL is worse than a refusal to start.

use std::time::Duration;

use crate::error::BoxError;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP API port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Time-to-live for cache entries, measured from last write
    pub cache_ttl: Duration,
    /// Period of the eviction sweep
    pub cache_cleanup_interval: Duration,
    /// Ceiling for the startup warm-load
    pub cache_warm_limit: i64,
    /// Capacity of the inbound order feed channel
    pub stream_buffer: usize,
    /// Number of emulated feed messages on startup (0 disables the emulator)
    pub emulator_messages: usize,
    /// Delay between emulated messages
    pub emulator_delay: Duration,
}

impl Config {
    /// A duration env var that must be set and strictly positive.
    fn require_secs(name: &str) -> Result<Duration, BoxError> {
        let raw = std::env::var(name).map_err(|_| format!("{name} must be set"))?;
        let secs: u64 = raw
            .parse()
            .map_err(|_| format!("{name} must be a number of seconds, got {raw:?}"))?;
        if secs == 0 {
            return Err(format!("{name} must be greater than zero").into());
        }
        Ok(Duration::from_secs(secs))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            cache_ttl: Self::require_secs("CACHE_TTL_SECS")?,
            cache_cleanup_interval: Self::require_secs("CACHE_CLEANUP_INTERVAL_SECS")?,
            cache_warm_limit: std::env::var("CACHE_WARM_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(1000),
            stream_buffer: std::env::var("STREAM_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
            emulator_messages: std::env::var("EMULATOR_MESSAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            emulator_delay: std::env::var("EMULATOR_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(100)),
        })
    }
}
