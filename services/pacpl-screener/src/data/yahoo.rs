//! Yahoo Finance chart API adapter.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?range=5d&interval=1m`
//!
//! # Constraints
//! - One-minute bars are only served for the last few days, so the caller
//!   requests a 5 day window for that interval.
//! - Unknown or delisted symbols answer with `chart.error.description`
//!   such as "No data found, symbol may be delisted".

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use pacpl_common::config::ProviderConfig;

use super::provider::{BarProvider, ProviderError};
use super::rate_limiter::{RateLimiter, SharedRateLimiter};
use super::{Bar, Interval, LookbackWindow};

const CHART_ENDPOINT: &str = "/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; pacpl-screener)";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Parse a chart response body into bars in exchange-local time.
///
/// Rows with any missing price are skipped; a missing volume counts as zero.
fn parse_chart(body: &str) -> Result<Vec<Bar>, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))?;

    if let Some(error) = envelope.chart.error {
        let message = error
            .description
            .or(error.code)
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ProviderError::classify(message));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = FixedOffset::east_opt(result.meta.gmtoffset)
        .ok_or_else(|| ProviderError::Internal(format!("Invalid offset: {}", result.meta.gmtoffset)))?;

    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let field = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();

        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };

        let timestamp = offset
            .timestamp_opt(*ts, 0)
            .single()
            .ok_or_else(|| ProviderError::Internal(format!("Invalid timestamp: {}", ts)))?;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: field(&quote.volume).unwrap_or(0.0),
        });
    }

    Ok(bars)
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Bar provider backed by the Yahoo Finance chart API.
pub struct YahooChartProvider {
    base_url: String,
    client: reqwest::Client,
    rate_limiter: SharedRateLimiter,
}

impl YahooChartProvider {
    /// Create a provider from config.
    pub fn new(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            rate_limiter: Arc::new(RateLimiter::new("yahoo", config.rate_limit_rpm)),
        }
    }
}

#[async_trait]
impl BarProvider for YahooChartProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: LookbackWindow,
    ) -> Result<Vec<Bar>, ProviderError> {
        if symbol.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("Empty symbol".into()));
        }

        let url = format!("{}{}/{}", self.base_url, CHART_ENDPOINT, symbol);

        self.rate_limiter.acquire().await;

        debug!(url = %url, symbol, interval = %interval, range = %window.range(), "Fetching chart");

        let response = self
            .client
            .get(&url)
            .query(&[("range", window.range().as_str()), ("interval", interval.tag())])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            // Error bodies still carry chart.error with the real reason
            return match parse_chart(&body) {
                Err(e) => Err(e),
                Ok(_) => Err(ProviderError::Internal(format!("HTTP {}", status))),
            };
        }

        parse_chart(&body)
    }
}
