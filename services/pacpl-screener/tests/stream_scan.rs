//! Integration tests for streaming scan sessions.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;

use common::{orchestrator, symbols, Behaviour, MockProvider};
use pacpl_screener::data::Interval;
use pacpl_screener::scan::{ScanEvent, ScanSettings, ScanStreamer};

async fn collect(streamer: &ScanStreamer, names: Vec<String>) -> Vec<ScanEvent> {
    streamer
        .stream(names, vec![Interval::M1, Interval::M2])
        .collect()
        .await
}

fn progress_counts(events: &[ScanEvent]) -> Vec<usize> {
    let mut counts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress { scanned, .. } => Some(*scanned),
            _ => None,
        })
        .collect();
    counts.sort_unstable();
    counts
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_five_symbols_one_signal() {
    let provider = Arc::new(MockProvider::new().with("SIG.NS", Behaviour::Signal));
    let streamer = ScanStreamer::new(orchestrator(provider, ScanSettings::default()));
    let names = symbols(&["A.NS", "B.NS", "SIG.NS", "C.NS", "D.NS"]);

    let events = collect(&streamer, names).await;

    assert_eq!(events.len(), 8);
    assert_eq!(events.first(), Some(&ScanEvent::Start { total: 5 }));
    assert_eq!(events.last(), Some(&ScanEvent::Done));
    assert_eq!(progress_counts(&events), vec![1, 2, 3, 4, 5]);

    let signals: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, ScanEvent::Signal { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(signals.len(), 1);

    // The signal directly follows the progress event for the same symbol
    let at = signals[0];
    match (&events[at - 1], &events[at]) {
        (ScanEvent::Progress { symbol, total, .. }, ScanEvent::Signal { data }) => {
            assert_eq!(symbol, "SIG.NS");
            assert_eq!(*total, 5);
            assert_eq!(data.symbol, "SIG.NS");
            assert!(data.has_any_signal);
        }
        other => panic!("unexpected event pair: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timed_out_symbol_is_skipped() {
    let provider = Arc::new(
        MockProvider::new()
            .with("SIG.NS", Behaviour::Signal)
            .with_delay("SLOW.NS", Duration::from_secs(5)),
    );
    let settings = ScanSettings {
        task_timeout: Duration::from_millis(200),
        ..ScanSettings::default()
    };
    let streamer = ScanStreamer::new(orchestrator(Arc::clone(&provider), settings));

    let started = Instant::now();
    let events = collect(&streamer, symbols(&["SLOW.NS", "SIG.NS", "QUIET.NS"])).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(events.first(), Some(&ScanEvent::Start { total: 3 }));
    assert_eq!(events.last(), Some(&ScanEvent::Done));
    assert_eq!(events.len(), 5);
    assert_eq!(progress_counts(&events), vec![1, 2]);

    let slow_seen = events.iter().any(|e| match e {
        ScanEvent::Progress { symbol, .. } => symbol == "SLOW.NS",
        ScanEvent::Signal { data } => data.symbol == "SLOW.NS",
        _ => false,
    });
    assert!(!slow_seen);

    // The abandoned scan was started, not cancelled before its fetch
    assert_eq!(provider.calls_for("SLOW.NS"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timed_out_scan_keeps_running() {
    let provider = Arc::new(
        MockProvider::new()
            .with("LATE.NS", Behaviour::Empty)
            .with_delay("LATE.NS", Duration::from_millis(600)),
    );
    let settings = ScanSettings {
        task_timeout: Duration::from_millis(100),
        ..ScanSettings::default()
    };
    let orchestrator = orchestrator(Arc::clone(&provider), settings);
    let streamer = ScanStreamer::new(orchestrator.clone());

    let events = collect(&streamer, symbols(&["LATE.NS", "QUIET.NS"])).await;
    assert_eq!(events.last(), Some(&ScanEvent::Done));
    assert_eq!(progress_counts(&events), vec![1]);

    // Session is over but the abandoned fetch has not returned yet
    let bad_symbols = orchestrator.source().bad_symbols();
    assert!(!bad_symbols.contains("LATE.NS"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(bad_symbols.contains("LATE.NS"));
    assert_eq!(provider.calls_for("LATE.NS"), 1);
}

#[tokio::test]
async fn test_empty_watchlist() {
    let provider = Arc::new(MockProvider::new());
    let streamer = ScanStreamer::new(orchestrator(Arc::clone(&provider), ScanSettings::default()));

    let events = collect(&streamer, Vec::new()).await;

    assert_eq!(events, vec![ScanEvent::Start { total: 0 }, ScanEvent::Done]);
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_signal_session_payloads() {
    let provider = Arc::new(MockProvider::new().with("SIG.NS", Behaviour::Signal));
    let streamer = ScanStreamer::new(orchestrator(provider, ScanSettings::default()));

    let events = collect(&streamer, symbols(&["SIG.NS"])).await;
    let payloads: Vec<serde_json::Value> = events
        .iter()
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();

    let types: Vec<&str> = payloads.iter().map(|p| p["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["start", "progress", "signal", "done"]);

    let signal = &payloads[2];
    assert_eq!(signal["data"]["signal_type"], "Follow");
    assert_eq!(signal["data"]["signal_dir"], "LONG");
    assert_eq!(signal["data"]["timeframes"]["1m"]["has_signal"], true);
}
