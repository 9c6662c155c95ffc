//! Event ingestion benchmark suite.
//!
//! Benchmarks the synchronous event path at different scales:
//! - Network: full request lifecycles (sent, response, finished)
//! - Sources: script-parsed notifications spread over nested paths
//! - Body fetches: cached vs. single-flight through a null bridge
//!
//! Run with: cargo bench --bench event_ingest
//! Results saved to: target/criterion/

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use devtools_panel::{
    Command, CommandBridge, Event, NetworkModel, Panel, PanelOptions, RequestId, Result,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const REQUEST_COUNTS: &[usize] = &[100, 1_000, 10_000];
const SCRIPT_COUNTS: &[usize] = &[100, 1_000];

// ============================================================================
// Null Bridge
// ============================================================================

/// Answers every command immediately with a fixed body.
struct NullBridge;

#[async_trait]
impl CommandBridge for NullBridge {
    async fn send(&self, _command: Command) -> Result<Value> {
        Ok(json!({ "body": "{}", "base64Encoded": false }))
    }
}

fn lifecycle(i: usize) -> [Event; 3] {
    let id = i.to_string();
    [
        Event::new(
            "Network.requestWillBeSent",
            json!({
                "requestId": id,
                "request": { "url": format!("https://x/api/items/{i}"), "method": "GET" },
                "timestamp": 1.0
            }),
        ),
        Event::new(
            "Network.responseReceived",
            json!({
                "requestId": id,
                "response": { "status": 200, "mimeType": "application/json" }
            }),
        ),
        Event::new(
            "Network.loadingFinished",
            json!({ "requestId": id, "encodedDataLength": 512, "timestamp": 1.5 }),
        ),
    ]
}

// ============================================================================
// Benchmark: Network Lifecycles
// ============================================================================

fn bench_network_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_ingest");

    for &count in REQUEST_COUNTS {
        let events: Vec<Event> = (0..count).flat_map(lifecycle).collect();
        group.throughput(Throughput::Elements(events.len() as u64));

        group.bench_with_input(BenchmarkId::new("lifecycles", count), &events, |b, events| {
            b.iter(|| {
                let panel = Panel::new(Arc::new(NullBridge), PanelOptions::new())
                    .expect("valid options");
                for event in events {
                    panel.dispatch(event.clone());
                }
                panel.network().len()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Source Tree Construction
// ============================================================================

fn bench_sources_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("sources_ingest");

    for &count in SCRIPT_COUNTS {
        let events: Vec<Event> = (0..count)
            .map(|i| {
                Event::new(
                    "Debugger.scriptParsed",
                    json!({
                        "scriptId": i.to_string(),
                        "url": format!("https://cdn{}.x/lib/{}/mod{i}.js", i % 4, i % 16)
                    }),
                )
            })
            .collect();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("scripts", count), &events, |b, events| {
            b.iter(|| {
                let panel = Panel::new(Arc::new(NullBridge), PanelOptions::new())
                    .expect("valid options");
                for event in events {
                    panel.dispatch(event.clone());
                }
                panel.sources().len()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Body Fetches
// ============================================================================

fn bench_body_fetch(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("body_fetch");

    let network = NetworkModel::new(Arc::new(NullBridge), false);
    for event in lifecycle(0) {
        network.handle_event(&event);
    }
    let id = RequestId::from("0");

    group.bench_function("first_fetch", |b| {
        b.to_async(&rt).iter(|| async {
            network.handle_event(&lifecycle(0)[0]);
            network.get_body(&id).await.expect("body")
        });
    });

    group.bench_function("cached", |b| {
        b.to_async(&rt).iter(|| async { network.get_body(&id).await.expect("body") });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_network_ingest,
    bench_sources_ingest,
    bench_body_fetch
);
criterion_main!(benches);
