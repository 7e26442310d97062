//! PACPL Screener Library
//!
//! Scans a watchlist of market symbols across several bar intervals and
//! reports rule-based intraday signals built from the opening gap, the
//! opening range (ORB) and the previous day's close/high/low.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    pacpl-screener (Rust Service)                     │
//! │                           :5000                                      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Market Data    │  │  Levels +       │  │  Scan           │     │
//! │  │  Source         │─▶│  Signal Engine  │─▶│  Orchestrator / │     │
//! │  │  (blacklist)    │  │                 │  │  Streamer       │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Gap**: today's open versus the previous close, large or small
//! - **ORB**: high/low of the first minutes of the session
//! - **PDH/PDL**: previous day's high/low, watched for break-and-retest
//! - **Session gate**: nothing fires before 09:18 exchange time

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod levels;
pub mod routes;
pub mod scan;
pub mod signal;

use anyhow::{Context, Result};
use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use pacpl_common::config::Config;

use crate::data::{BarProvider, Interval, MarketDataSource, YahooChartProvider};
use crate::scan::{ScanOrchestrator, ScanSettings, ScanStreamer};

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Intervals scanned when a request does not name any
    pub intervals: Vec<Interval>,
    /// Batch scanner
    pub orchestrator: ScanOrchestrator,
    /// Streaming scanner
    pub streamer: ScanStreamer,
    watchlist: RwLock<Vec<String>>,
}

impl ScreenerState {
    /// Create state backed by the Yahoo chart API.
    pub fn new(config: Config) -> Result<Self> {
        let provider = Arc::new(YahooChartProvider::new(&config.provider));
        Self::with_provider(config, provider)
    }

    /// Create state backed by an arbitrary bar provider.
    pub fn with_provider(config: Config, provider: Arc<dyn BarProvider>) -> Result<Self> {
        let intervals = config
            .screener
            .intervals
            .iter()
            .map(|tag| tag.parse::<Interval>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid screener.intervals")?;

        let source = Arc::new(MarketDataSource::new(
            provider,
            config.screener.lookback_days,
        ));
        let orchestrator = ScanOrchestrator::new(source, ScanSettings::from(&config.screener));
        let streamer = ScanStreamer::new(orchestrator.clone());
        let watchlist = RwLock::new(config.screener.symbols.clone());

        Ok(Self {
            config,
            intervals,
            orchestrator,
            streamer,
            watchlist,
        })
    }

    /// Data source shared by every scan.
    pub fn source(&self) -> &Arc<MarketDataSource> {
        self.orchestrator.source()
    }

    /// Snapshot of the watchlist.
    pub async fn watchlist(&self) -> Vec<String> {
        self.watchlist.read().await.clone()
    }

    /// Replace the watchlist, returning the new contents.
    pub async fn replace_watchlist(&self, symbols: Vec<String>) -> Vec<String> {
        let mut watchlist = self.watchlist.write().await;
        *watchlist = symbols;
        watchlist.clone()
    }
}

/// Build the HTTP router for a state.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/scan", get(routes::scan))
        .route("/api/scan/stream", get(routes::scan_stream))
        .route("/api/stocks", get(routes::get_stocks).post(routes::update_stocks))
        .route("/api/config", get(routes::get_config))
        .fallback_service(static_files)
        .layer(cors)
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    /// Start the screener service
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .bind_address()
            .parse()
            .context("Invalid server address")?;

        let app = build_router(Arc::clone(&self.state));

        tracing::info!(
            address = %addr,
            symbols = self.state.watchlist().await.len(),
            intervals = ?self.state.intervals,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
