//! Batch scanning over a bounded worker pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::{PerIntervalRecord, ScanRecord, ScanSettings, INSUFFICIENT_DATA, NO_DAILY_LEVELS};
use crate::data::{Interval, MarketDataSource};
use crate::levels::{daily_levels, opening_range};
use crate::signal::{classify_gap, evaluate, round2};

/// Scans symbols through a shared [`MarketDataSource`].
///
/// Cheap to clone; clones share the data source and its blacklist.
#[derive(Clone)]
pub struct ScanOrchestrator {
    source: Arc<MarketDataSource>,
    settings: Arc<ScanSettings>,
}

impl ScanOrchestrator {
    pub fn new(source: Arc<MarketDataSource>, settings: ScanSettings) -> Self {
        Self {
            source,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn source(&self) -> &Arc<MarketDataSource> {
        &self.source
    }

    /// Scan one interval: fetch, compute levels, evaluate.
    async fn scan_interval(&self, symbol: &str, interval: Interval) -> PerIntervalRecord {
        let series = match self.source.fetch(symbol, interval).await {
            Some(series) if series.len() >= 2 => series,
            _ => return PerIntervalRecord::failed(interval, INSUFFICIENT_DATA),
        };

        let Some(daily) = daily_levels(&series) else {
            debug!(symbol, interval = %interval, bars = series.len(), "Series spans a single date");
            return PerIntervalRecord::failed(interval, NO_DAILY_LEVELS);
        };

        let settings = &self.settings;
        let orb = opening_range(
            &series,
            settings.orb_minutes,
            settings.default_interval_minutes,
        );
        let result = evaluate(&series, &daily, orb.as_ref(), &settings.signal);

        let gap_pct = series.today().first().map(|first| {
            round2(classify_gap(first.open, Some(daily.previous_close), settings.signal.large_gap_pct).gap_pct)
        });

        PerIntervalRecord {
            interval,
            price: series.last().map(|b| round2(b.close)),
            has_signal: result.is_signal(),
            gap_pct,
            signal: result.signal().copied(),
            daily: Some(daily),
            level_high: orb.map(|o| o.high),
            level_low: orb.map(|o| o.low),
            error: None,
        }
    }

    /// Scan a symbol on each interval in order, one interval at a time.
    pub async fn scan_symbol(&self, symbol: &str, intervals: &[Interval]) -> ScanRecord {
        let mut records = Vec::with_capacity(intervals.len());
        for interval in intervals {
            records.push(self.scan_interval(symbol, *interval).await);
        }

        let record = ScanRecord::from_intervals(symbol, records);
        if let Some(signal) = &record.signal {
            info!(
                symbol,
                signal = ?signal.kind,
                direction = ?signal.direction,
                entry = signal.risk.entry,
                "Signal found"
            );
        }
        record
    }

    /// Scan every symbol and return the records that carry a signal.
    ///
    /// Records arrive in completion order. A task that panics is logged and
    /// left out; the rest of the batch is unaffected.
    pub async fn scan_all(&self, symbols: &[String], intervals: &[Interval]) -> Vec<ScanRecord> {
        let started = Instant::now();
        let workers = self.settings.batch_workers.max(1);
        let tags: Vec<&str> = intervals.iter().map(|i| i.tag()).collect();

        info!(
            symbols = symbols.len(),
            intervals = ?tags,
            workers,
            "Starting batch scan"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let intervals: Arc<[Interval]> = intervals.into();
        let mut tasks: JoinSet<Option<ScanRecord>> = JoinSet::new();
        let mut pending = HashMap::with_capacity(symbols.len());

        for symbol in symbols {
            let orchestrator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let intervals = Arc::clone(&intervals);
            let task_symbol = symbol.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(orchestrator.scan_symbol(&task_symbol, &intervals).await)
            });
            pending.insert(handle.id(), symbol.clone());
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, record)) => {
                    pending.remove(&id);
                    if let Some(record) = record.filter(|r| r.has_any_signal) {
                        records.push(record);
                    }
                }
                Err(e) => {
                    let symbol = pending.remove(&e.id()).unwrap_or_default();
                    error!(symbol = %symbol, error = %e, "Scan task failed");
                }
            }
        }

        info!(
            symbols = symbols.len(),
            signals = records.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch scan complete"
        );

        records
    }
}
