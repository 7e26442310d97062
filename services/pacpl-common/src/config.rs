//! Configuration management for the PACPL screener.
//!
//! The service reads a single configuration file at `~/.pacpl/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (PACPL_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PACPL_HOST` → server.host
//! - `PACPL_PORT` → server.port
//! - `PACPL_LOG_LEVEL` → observability.log_level
//! - `PACPL_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".pacpl"),
        |dirs| dirs.home_dir().join(".pacpl"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the screener service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Signal and scan parameters
    #[serde(default)]
    pub screener: ScreenerConfig,

    /// Market data provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PACPL_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("PACPL_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(level) = std::env::var("PACPL_LOG_LEVEL") {
            if !level.is_empty() {
                self.observability.log_level = level;
            }
        }
        if let Ok(format) = std::env::var("PACPL_LOG_FORMAT") {
            if !format.is_empty() {
                self.observability.log_format = format;
            }
        }
    }

    /// Reject parameter combinations the scanner cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        self.screener.validate()
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the static dashboard
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_static_dir() -> String {
    "static".to_string()
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Screener Configuration
// ============================================================================

/// Signal detection and scan orchestration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Gap (%) at or beyond which the day counts as a large gap
    #[serde(default = "default_large_gap_pct")]
    pub large_gap_pct: f64,

    /// Small gap threshold (%). Informational: a small gap is anything
    /// that is not large.
    #[serde(default = "default_small_gap_pct")]
    pub small_gap_pct: f64,

    /// Minutes the session must run before Follow/Reversal may fire
    #[serde(default = "default_sustain_minutes")]
    pub sustain_minutes: u32,

    /// Opening range length in minutes
    #[serde(default = "default_orb_minutes")]
    pub orb_minutes: u32,

    /// PDH/PDL retest tolerance band in percent
    #[serde(default = "default_retest_tolerance_pct")]
    pub retest_tolerance_pct: f64,

    /// PDH/PDL retest lookback in bars. Not consulted by the retest rules.
    #[serde(default = "default_retest_lookback_bars")]
    pub retest_lookback_bars: usize,

    /// Minutes since midnight before which no signal is emitted (9:18 = 558)
    #[serde(default = "default_session_cutoff_minutes")]
    pub session_cutoff_minutes: u32,

    /// Bar length assumed when it cannot be inferred from the series
    #[serde(default = "default_interval_minutes")]
    pub default_interval_minutes: u32,

    /// Bar intervals scanned per symbol, in priority order
    #[serde(default = "default_intervals")]
    pub intervals: Vec<String>,

    /// History window in days for intervals coarser than one minute
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Worker pool size for batch scans
    #[serde(default = "default_batch_workers")]
    pub batch_workers: usize,

    /// Worker pool size for streaming scans
    #[serde(default = "default_stream_workers")]
    pub stream_workers: usize,

    /// Per-symbol wait budget for streaming scans, in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Maximum watchlist size accepted through the API
    #[serde(default = "default_max_symbols")]
    pub max_symbols: usize,

    /// Initial watchlist
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Suggested dashboard refresh interval in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            large_gap_pct: default_large_gap_pct(),
            small_gap_pct: default_small_gap_pct(),
            sustain_minutes: default_sustain_minutes(),
            orb_minutes: default_orb_minutes(),
            retest_tolerance_pct: default_retest_tolerance_pct(),
            retest_lookback_bars: default_retest_lookback_bars(),
            session_cutoff_minutes: default_session_cutoff_minutes(),
            default_interval_minutes: default_interval_minutes(),
            intervals: default_intervals(),
            lookback_days: default_lookback_days(),
            batch_workers: default_batch_workers(),
            stream_workers: default_stream_workers(),
            task_timeout_secs: default_task_timeout_secs(),
            max_symbols: default_max_symbols(),
            symbols: default_symbols(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl ScreenerConfig {
    /// Check thresholds and pool sizes.
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.large_gap_pct > 0.0) {
            return Err(Error::Config(format!(
                "screener.large_gap_pct must be positive, got {}",
                self.large_gap_pct
            )));
        }
        if self.retest_tolerance_pct < 0.0 {
            return Err(Error::Config(format!(
                "screener.retest_tolerance_pct must not be negative, got {}",
                self.retest_tolerance_pct
            )));
        }
        if self.batch_workers == 0 || self.stream_workers == 0 {
            return Err(Error::Config(
                "screener worker pools must have at least one worker".into(),
            ));
        }
        if self.intervals.is_empty() {
            return Err(Error::Config("screener.intervals must not be empty".into()));
        }
        if self.default_interval_minutes == 0 {
            return Err(Error::Config(
                "screener.default_interval_minutes must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_large_gap_pct() -> f64 {
    0.5
}

fn default_small_gap_pct() -> f64 {
    0.25
}

fn default_sustain_minutes() -> u32 {
    10
}

fn default_orb_minutes() -> u32 {
    15
}

fn default_retest_tolerance_pct() -> f64 {
    0.05
}

fn default_retest_lookback_bars() -> usize {
    12
}

fn default_session_cutoff_minutes() -> u32 {
    9 * 60 + 18
}

fn default_interval_minutes() -> u32 {
    5
}

fn default_intervals() -> Vec<String> {
    vec!["1m".to_string(), "2m".to_string()]
}

fn default_lookback_days() -> u32 {
    5
}

fn default_batch_workers() -> usize {
    20
}

fn default_stream_workers() -> usize {
    30
}

fn default_task_timeout_secs() -> u64 {
    10
}

fn default_max_symbols() -> usize {
    30
}

fn default_symbols() -> Vec<String> {
    [
        "RELIANCE.NS",
        "TCS.NS",
        "INFY.NS",
        "HDFCBANK.NS",
        "ICICIBANK.NS",
        "SBIN.NS",
        "AXISBANK.NS",
        "TATAMOTORS.NS",
        "WIPRO.NS",
        "MARUTI.NS",
        "BAJFINANCE.NS",
        "LT.NS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_refresh_interval_secs() -> u64 {
    600
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Market data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chart API base URL
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Request budget per minute
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            timeout_secs: default_provider_timeout_secs(),
            rate_limit_rpm: default_rate_limit_rpm(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_rate_limit_rpm() -> u32 {
    600
}
