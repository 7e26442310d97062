//! Data provider abstraction for intraday bars.
//!
//! Defines the `BarProvider` trait that market data sources implement, and
//! the error taxonomy the scanner uses to tell permanent "no data" failures
//! from transient ones.

use async_trait::async_trait;
use thiserror::Error;

use super::{Bar, Interval, LookbackWindow};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors reported by a data provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded
    #[error("Rate limited")]
    RateLimited,

    /// Provider has no data for the symbol
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Symbol is delisted
    #[error("Symbol delisted: {0}")]
    Delisted(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal provider error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Whether the symbol should never be requested again in this process.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DataNotAvailable(_) | Self::Delisted(_))
    }

    /// Map a free-text provider message onto the taxonomy.
    ///
    /// "delisted" and "no data" (case-insensitive) are permanent; anything
    /// else is treated as an internal, transient failure.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("delisted") {
            Self::Delisted(message)
        } else if lower.contains("no data") {
            Self::DataNotAvailable(message)
        } else {
            Self::Internal(message)
        }
    }
}

// ============================================================================
// Bar Provider Trait
// ============================================================================

/// Trait for intraday bar providers.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Provider name for logging (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch bars for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - Ticker (e.g., "RELIANCE.NS")
    /// * `interval` - Bar interval
    /// * `window` - History window to request
    ///
    /// An empty vector is a valid response and means the provider has no
    /// rows for the request.
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: LookbackWindow,
    ) -> Result<Vec<Bar>, ProviderError>;
}
