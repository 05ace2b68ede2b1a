//! Dispatch benchmark suite.
//!
//! Measures the per-operation hot paths:
//! - Document classification (single, named multi-operation, subscription)
//! - `graphql-ws` frame parsing
//! - Registry lookup at different subscription counts
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;

use graphqurl::protocol::ServerMessage;
use graphqurl::transport::{SubscriptionCallbacks, SubscriptionRegistry};
use graphqurl::{GraphQLResponse, classify, route};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const SUBSCRIPTION_COUNTS: &[usize] = &[1, 100, 1_000];

const SINGLE_QUERY: &str = "query ($id: Int!) { user(id: $id) { id name posts { title } } }";

const MULTI_OPERATION: &str = r"
    fragment UserFields on User { id name }
    query Users { users { ...UserFields } }
    mutation Rename($id: Int!, $name: String!) { rename(id: $id, name: $name) { ...UserFields } }
    subscription Watch { users { ...UserFields } }
";

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    group.bench_function("single_query", |b| {
        b.iter(|| {
            let operation = classify(black_box(SINGLE_QUERY), None).ok();
            route(operation.and_then(|op| op.kind()))
        });
    });

    group.bench_function("named_multi_operation", |b| {
        b.iter(|| classify(black_box(MULTI_OPERATION), Some(black_box("Watch"))).ok());
    });

    group.bench_function("reduce_to_query_string", |b| {
        let operation = classify(MULTI_OPERATION, Some("Rename")).ok();
        b.iter(|| operation.as_ref().map(|op| op.to_query_string()));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Frame Parsing
// ============================================================================

fn bench_parse_frames(c: &mut Criterion) {
    let data = json!({
        "type": "data",
        "id": "42",
        "payload": { "data": { "users": [{ "id": 1, "name": "a" }, { "id": 2, "name": "b" }] } }
    })
    .to_string();
    let keep_alive = json!({ "type": "ka" }).to_string();

    let mut group = c.benchmark_group("parse_frame");
    group.bench_function("data", |b| b.iter(|| ServerMessage::parse(black_box(&data)).ok()));
    group.bench_function("keep_alive", |b| {
        b.iter(|| ServerMessage::parse(black_box(&keep_alive)).ok());
    });
    group.finish();
}

// ============================================================================
// Benchmark: Registry Dispatch
// ============================================================================

fn bench_registry_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_dispatch");

    for &count in SUBSCRIPTION_COUNTS {
        let mut registry = SubscriptionRegistry::new();
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = registry.next_id();
            registry.register(id.clone(), SubscriptionCallbacks::new().on_data(|_| {}));
            ids.push(id);
        }

        group.bench_with_input(BenchmarkId::new("lookup", count), &ids, |b, ids| {
            let mut next = 0;
            b.iter(|| {
                let id = &ids[next % ids.len()];
                next += 1;
                registry.lookup(black_box(id)).is_some()
            });
        });

        group.bench_with_input(BenchmarkId::new("parse_and_lookup", count), &ids, |b, ids| {
            let frames: Vec<String> = ids
                .iter()
                .map(|id| json!({ "type": "data", "id": id, "payload": { "data": {} } }).to_string())
                .collect();
            let mut next = 0;
            b.iter(|| {
                let frame = &frames[next % frames.len()];
                next += 1;
                match ServerMessage::parse(black_box(frame)) {
                    Ok(ServerMessage::Data { id, payload }) => registry
                        .lookup(&id)
                        .map(|_| payload.data.is_some())
                        .unwrap_or(false),
                    _ => false,
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Response Decoding
// ============================================================================

fn bench_decode_response(c: &mut Criterion) {
    let body = json!({
        "data": null,
        "errors": [{ "message": "boom", "locations": [{ "line": 1, "column": 2 }], "path": ["a"] }]
    })
    .to_string();

    c.bench_function("decode_error_response", |b| {
        b.iter(|| serde_json::from_str::<GraphQLResponse>(black_box(&body)).ok());
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_parse_frames,
    bench_registry_dispatch,
    bench_decode_response
);
criterion_main!(benches);
