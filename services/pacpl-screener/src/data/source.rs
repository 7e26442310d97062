//! Blacklist-aware market data access.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::{BarProvider, BarSeries, Interval, LookbackWindow};

// ============================================================================
// Bad Symbol Set
// ============================================================================

/// Symbols the provider reported as delisted or without data.
///
/// Shared by every scanning worker for the life of the process; entries are
/// never evicted. Inserts are idempotent.
#[derive(Debug, Default)]
pub struct BadSymbolSet {
    symbols: RwLock<HashSet<String>>,
}

impl BadSymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.symbols.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.symbols.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.read().contains(symbol)
    }

    /// Add a symbol. Returns `true` if it was not already present.
    pub fn insert(&self, symbol: &str) -> bool {
        self.write().insert(symbol.to_string())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every entry. Only meant for tests and operator resets.
    pub fn reset(&self) {
        self.write().clear();
    }
}

// ============================================================================
// Market Data Source
// ============================================================================

/// Fetches bar series through a provider, skipping blacklisted symbols.
pub struct MarketDataSource {
    provider: Arc<dyn BarProvider>,
    bad_symbols: Arc<BadSymbolSet>,
    lookback_days: u32,
}

impl MarketDataSource {
    /// Create a data source with its own, empty blacklist.
    pub fn new(provider: Arc<dyn BarProvider>, lookback_days: u32) -> Self {
        Self::with_bad_symbols(provider, Arc::new(BadSymbolSet::new()), lookback_days)
    }

    /// Create a data source sharing an existing blacklist.
    pub fn with_bad_symbols(
        provider: Arc<dyn BarProvider>,
        bad_symbols: Arc<BadSymbolSet>,
        lookback_days: u32,
    ) -> Self {
        Self {
            provider,
            bad_symbols,
            lookback_days,
        }
    }

    pub fn bad_symbols(&self) -> &Arc<BadSymbolSet> {
        &self.bad_symbols
    }

    /// Fetch bars for a symbol/interval pair.
    ///
    /// Returns `None` when the symbol is blacklisted, the provider returned
    /// nothing, or the provider failed. Empty results and permanent errors
    /// blacklist the symbol; other errors do not.
    pub async fn fetch(&self, symbol: &str, interval: Interval) -> Option<BarSeries> {
        if self.bad_symbols.contains(symbol) {
            debug!(symbol, "Skipping blacklisted symbol");
            return None;
        }

        let window = LookbackWindow::for_interval(interval, self.lookback_days);

        match self.provider.fetch_bars(symbol, interval, window).await {
            Ok(bars) if bars.is_empty() => {
                self.blacklist(symbol, "empty response");
                None
            }
            Ok(bars) => Some(BarSeries::new(bars)),
            Err(e) if e.is_permanent() => {
                warn!(
                    symbol,
                    interval = %interval,
                    provider = self.provider.name(),
                    error = %e,
                    "Provider reports no data"
                );
                self.blacklist(symbol, "no data");
                None
            }
            Err(e) => {
                warn!(
                    symbol,
                    interval = %interval,
                    provider = self.provider.name(),
                    error = %e,
                    "Failed to fetch bars"
                );
                None
            }
        }
    }

    fn blacklist(&self, symbol: &str, reason: &str) {
        if self.bad_symbols.insert(symbol) {
            info!(
                symbol,
                reason,
                blacklisted = self.bad_symbols.len(),
                "Symbol added to bad symbol set"
            );
        }
    }
}
