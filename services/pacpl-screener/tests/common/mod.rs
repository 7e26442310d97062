//! Shared fixtures for screener integration tests.
//!
//! Provides a scripted bar provider and two canned sessions: one that fires
//! a Follow/Long signal on the last bar and one that stays inside its
//! opening range.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};

use pacpl_screener::data::{
    Bar, BarProvider, Interval, LookbackWindow, MarketDataSource, ProviderError,
};
use pacpl_screener::scan::{ScanOrchestrator, ScanSettings};

// ============================================================================
// Bar Fixtures
// ============================================================================

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
    ist.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

pub fn bar(timestamp: DateTime<FixedOffset>, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume: 5000.0,
    }
}

/// Close of 100, high 105, low 95.
fn previous_day() -> Vec<Bar> {
    vec![
        bar(at(4, 15, 27), 100.0, 100.0, 100.0, 100.0),
        bar(at(4, 15, 28), 100.0, 105.0, 95.0, 100.0),
        bar(at(4, 15, 29), 100.0, 100.0, 100.0, 100.0),
    ]
}

/// Opens 0.6% up, builds a 15 bar range topping at 100.9, then closes at
/// 101.5 at 09:30.
pub fn signal_bars() -> Vec<Bar> {
    let mut bars = previous_day();
    for i in 0..15 {
        bars.push(bar(at(5, 9, 15 + i), 100.6, 100.9, 100.5, 100.7));
    }
    bars.push(bar(at(5, 9, 30), 100.7, 101.6, 100.6, 101.5));
    bars
}

/// Opens 0.1% up and never leaves its opening range.
pub fn quiet_bars() -> Vec<Bar> {
    let mut bars = previous_day();
    for i in 0..16 {
        bars.push(bar(at(5, 9, 15 + i), 100.1, 100.4, 99.8, 100.0));
    }
    bars
}

// ============================================================================
// Mock Provider
// ============================================================================

/// How the mock answers for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    Signal,
    Quiet,
    /// Empty response
    Empty,
    Delisted,
    /// Network failure
    Transient,
    Panic,
}

/// Provider answering from a per-symbol script. Unknown symbols are quiet.
#[derive(Default)]
pub struct MockProvider {
    behaviours: HashMap<String, Behaviour>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(symbol.to_string(), behaviour);
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BarProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        _window: LookbackWindow,
    ) -> Result<Vec<Bar>, ProviderError> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }

        match self.behaviours.get(symbol).copied().unwrap_or(Behaviour::Quiet) {
            Behaviour::Signal => Ok(signal_bars()),
            Behaviour::Quiet => Ok(quiet_bars()),
            Behaviour::Empty => Ok(Vec::new()),
            Behaviour::Delisted => Err(ProviderError::Delisted(symbol.to_string())),
            Behaviour::Transient => Err(ProviderError::Network("connection reset".into())),
            Behaviour::Panic => panic!("mock provider exploded on {}", symbol),
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn orchestrator(provider: Arc<MockProvider>, settings: ScanSettings) -> ScanOrchestrator {
    let source = Arc::new(MarketDataSource::new(provider, 5));
    ScanOrchestrator::new(source, settings)
}
