//! PACPL Screener - intraday gap / opening-range / prior-day-level scanner.
//!
//! Serves batch and streaming scans of a symbol watchlist over HTTP.

use anyhow::Result;
use pacpl_common::config::Config;
use pacpl_common::logging::init_logging;
use pacpl_screener::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("PACPL Screener v{}", env!("CARGO_PKG_VERSION"));

    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
