//! Incremental scan sessions.
//!
//! A session emits `start`, then one `progress` per completed symbol
//! (followed by a `signal` when that symbol has one), then `done`. Symbols
//! finish in whatever order their fetches complete.
//!
//! Each symbol gets a wait budget once a worker picks it up. A symbol that
//! overruns it is dropped from the session's events, but its scan is left
//! running in the background and keeps its worker slot until it finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{ScanOrchestrator, ScanRecord};
use crate::data::Interval;

/// Buffered events per session before the producer waits on the consumer.
const EVENT_BUFFER: usize = 64;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// One event of a streaming scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanEvent {
    Start {
        total: usize,
    },
    Progress {
        scanned: usize,
        total: usize,
        symbol: String,
    },
    Signal {
        data: ScanRecord,
    },
    Done,
}

enum Outcome {
    Completed(String, ScanRecord),
    TimedOut(String),
    Failed(String, String),
}

/// Runs streaming scan sessions on top of a [`ScanOrchestrator`].
#[derive(Clone)]
pub struct ScanStreamer {
    orchestrator: ScanOrchestrator,
}

impl ScanStreamer {
    pub fn new(orchestrator: ScanOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Start a session and return its event stream.
    ///
    /// The session runs on its own task; dropping the stream stops event
    /// delivery but not scans already in flight.
    pub fn stream(
        &self,
        symbols: Vec<String>,
        intervals: Vec<Interval>,
    ) -> impl Stream<Item = ScanEvent> + Send + 'static {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(run_session(orchestrator, symbols, intervals, tx));

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}

async fn run_session(
    orchestrator: ScanOrchestrator,
    symbols: Vec<String>,
    intervals: Vec<Interval>,
    tx: mpsc::Sender<ScanEvent>,
) {
    let session = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let total = symbols.len();
    let settings = orchestrator.settings().clone();
    let budget = settings.task_timeout;

    info!(session, total, workers = settings.stream_workers, "Starting scan stream");

    if tx.send(ScanEvent::Start { total }).await.is_err() {
        debug!(session, "Stream consumer gone before start");
        return;
    }

    let semaphore = Arc::new(Semaphore::new(settings.stream_workers.max(1)));
    let intervals: Arc<[Interval]> = intervals.into();
    let mut waits: JoinSet<Outcome> = JoinSet::new();

    for symbol in symbols {
        let orchestrator = orchestrator.clone();
        let semaphore = Arc::clone(&semaphore);
        let intervals = Arc::clone(&intervals);

        waits.spawn(async move {
            let Ok(permit) = semaphore.acquire_owned().await else {
                return Outcome::Failed(symbol, "worker pool closed".into());
            };

            // The scan owns the permit, so an abandoned scan keeps its slot
            let scan_symbol = symbol.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                orchestrator.scan_symbol(&scan_symbol, &intervals).await
            });

            match tokio::time::timeout(budget, handle).await {
                Ok(Ok(record)) => Outcome::Completed(symbol, record),
                Ok(Err(e)) => Outcome::Failed(symbol, e.to_string()),
                Err(_) => Outcome::TimedOut(symbol),
            }
        });
    }

    let mut completed = 0usize;
    let mut signals = 0usize;

    while let Some(joined) = waits.join_next().await {
        let (symbol, record) = match joined {
            Ok(Outcome::Completed(symbol, record)) => (symbol, record),
            Ok(Outcome::TimedOut(symbol)) => {
                warn!(session, symbol = %symbol, budget_secs = budget.as_secs(), "Scan exceeded wait budget, skipping");
                continue;
            }
            Ok(Outcome::Failed(symbol, reason)) => {
                error!(session, symbol = %symbol, error = %reason, "Scan task failed");
                continue;
            }
            Err(e) => {
                error!(session, error = %e, "Scan wait task failed");
                continue;
            }
        };

        completed += 1;
        let has_signal = record.has_any_signal;

        let progress = ScanEvent::Progress {
            scanned: completed,
            total,
            symbol,
        };
        if tx.send(progress).await.is_err() {
            info!(session, completed, total, "Stream consumer disconnected");
            return;
        }

        if has_signal {
            signals += 1;
            if tx.send(ScanEvent::Signal { data: record }).await.is_err() {
                info!(session, completed, total, "Stream consumer disconnected");
                return;
            }
        }
    }

    if tx.send(ScanEvent::Done).await.is_err() {
        debug!(session, "Stream consumer gone before done");
    }

    info!(
        session,
        total,
        completed,
        signals,
        duration_ms = started.elapsed().as_millis() as u64,
        "Scan stream complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payloads() {
        assert_eq!(
            serde_json::to_string(&ScanEvent::Start { total: 3 }).unwrap(),
            "{\"type\":\"start\",\"total\":3}"
        );
        assert_eq!(
            serde_json::to_string(&ScanEvent::Done).unwrap(),
            "{\"type\":\"done\"}"
        );

        let progress = ScanEvent::Progress {
            scanned: 2,
            total: 5,
            symbol: "TCS.NS".into(),
        };
        let json: serde_json::Value =
            serde_json::to_value(&progress).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["scanned"], 2);
        assert_eq!(json["total"], 5);
        assert_eq!(json["symbol"], "TCS.NS");
    }

    #[test]
    fn test_signal_event_wraps_record() {
        let record = ScanRecord::from_intervals("ITC.NS", Vec::new());
        let json = serde_json::to_value(ScanEvent::Signal { data: record }).unwrap();
        assert_eq!(json["type"], "signal");
        assert_eq!(json["data"]["symbol"], "ITC.NS");
        assert_eq!(json["data"]["name"], "ITC");
    }
}
