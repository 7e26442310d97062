//! HTTP routes for the screener service.

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pacpl_common::{Error, ResultExt};

use crate::data::Interval;
use crate::scan::ScanRecord;
use crate::ScreenerState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    /// Comma separated interval tags overriding the configured list
    #[serde(default)]
    pub intervals: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub timestamp: String,
    pub total_stocks: usize,
    pub signals_found: usize,
    pub signals: Vec<ScanRecord>,
}

#[derive(Debug, Serialize)]
pub struct StocksResponse {
    pub success: bool,
    pub stocks: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStocksRequest {
    #[serde(default)]
    pub stocks: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ScreenerParameters {
    pub large_gap: f64,
    pub small_gap: f64,
    pub sustain_mins: u32,
    pub orb_mins: u32,
    pub tol_pct: f64,
    pub timeframes: Vec<Interval>,
    pub refresh_interval: u64,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: ScreenerParameters,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Error returned by handlers, rendered as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn resolve_intervals(state: &ScreenerState, query: &ScanQuery) -> Result<Vec<Interval>, ApiError> {
    match query.intervals.as_deref().map(str::trim) {
        Some(list) if !list.is_empty() => {
            let intervals = Interval::parse_list(list)
                .map_err(Error::InvalidInput)
                .context("intervals")?;
            if intervals.is_empty() {
                return Err(Error::InvalidInput("No intervals requested".into()).into());
            }
            Ok(intervals)
        }
        _ => Ok(state.intervals.clone()),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "pacpl-screener".to_string(),
    })
}

/// Batch scan of the current watchlist
pub async fn scan(
    State(state): State<Arc<ScreenerState>>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<ScanResponse>, ApiError> {
    let intervals = resolve_intervals(&state, &query)?;
    let symbols = state.watchlist().await;

    let signals = state.orchestrator.scan_all(&symbols, &intervals).await;

    Ok(Json(ScanResponse {
        success: true,
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_stocks: symbols.len(),
        signals_found: signals.len(),
        signals,
    }))
}

/// Streaming scan of the current watchlist as server-sent events
pub async fn scan_stream(
    State(state): State<Arc<ScreenerState>>,
    Query(query): Query<ScanQuery>,
) -> Result<Response, ApiError> {
    let intervals = resolve_intervals(&state, &query)?;
    let symbols = state.watchlist().await;

    let events = state
        .streamer
        .stream(symbols, intervals)
        .map(|event| Event::default().json_data(event));

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    )
        .into_response())
}

/// Current watchlist
pub async fn get_stocks(State(state): State<Arc<ScreenerState>>) -> Json<StocksResponse> {
    Json(StocksResponse {
        success: true,
        stocks: state.watchlist().await,
    })
}

/// Replace the watchlist
pub async fn update_stocks(
    State(state): State<Arc<ScreenerState>>,
    Json(request): Json<UpdateStocksRequest>,
) -> Result<Json<StocksResponse>, ApiError> {
    let Some(stocks) = request.stocks else {
        return Err(Error::InvalidInput("Missing stocks array".into()).into());
    };

    let max = state.config.screener.max_symbols;
    if stocks.len() > max {
        return Err(Error::InvalidInput(format!("Maximum {} stocks allowed", max)).into());
    }

    let stocks = state.replace_watchlist(stocks).await;
    tracing::info!(count = stocks.len(), "Watchlist updated");

    Ok(Json(StocksResponse {
        success: true,
        stocks,
    }))
}

/// Active screener parameters
pub async fn get_config(State(state): State<Arc<ScreenerState>>) -> Json<ConfigResponse> {
    let screener = &state.config.screener;

    Json(ConfigResponse {
        success: true,
        config: ScreenerParameters {
            large_gap: screener.large_gap_pct,
            small_gap: screener.small_gap_pct,
            sustain_mins: screener.sustain_minutes,
            orb_mins: screener.orb_minutes,
            tol_pct: screener.retest_tolerance_pct,
            timeframes: state.intervals.clone(),
            refresh_interval: screener.refresh_interval_secs,
        },
    })
}
