//! Option normalization and payload encoding benchmarks.
//!
//! Run with: cargo bench --bench normalize
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use wsbus::{ClientOptions, JsonSerializer, Payload, RawOptions, ServerOptions};

// ============================================================================
// Benchmark: Client Options
// ============================================================================

fn bench_client_options(c: &mut Criterion) {
    let mut group = c.benchmark_group("client_options");

    let inputs = [
        ("parts", RawOptions::new().host("example.com").port(8001).path("feed")),
        ("url", RawOptions::new().url("wss://example.com:8443/feed?x=1")),
        (
            "full",
            RawOptions::new()
                .port(8001)
                .ssl(true)
                .auto_reconnect(true)
                .reconnect_interval(500)
                .protocol(["chat", "superchat"]),
        ),
    ];

    for (name, raw) in &inputs {
        group.bench_with_input(BenchmarkId::new("normalize", name), raw, |b, raw| {
            b.iter(|| ClientOptions::normalize(black_box(raw)));
        });
    }

    let options = ClientOptions::normalize(&inputs[2].1).expect("valid options");
    group.bench_function("to_raw", |b| b.iter(|| black_box(&options).to_raw()));

    group.finish();
}

// ============================================================================
// Benchmark: Server Options
// ============================================================================

fn bench_server_options(c: &mut Criterion) {
    let raw = RawOptions::new().host("0.0.0.0").port(8001);
    c.bench_function("server_options/normalize", |b| {
        b.iter(|| ServerOptions::normalize(black_box(&raw)));
    });
}

// ============================================================================
// Benchmark: Payload Encoding
// ============================================================================

fn bench_payload(c: &mut Criterion) {
    let serializer = JsonSerializer;
    let payload = Payload::from(json!({
        "type": "update",
        "seq": 42,
        "items": [1, 2, 3, 4, 5],
    }));

    c.bench_function("payload/encode", |b| {
        b.iter(|| black_box(&payload).encode(&serializer));
    });
}

criterion_group!(
    benches,
    bench_client_options,
    bench_server_options,
    bench_payload
);
criterion_main!(benches);
