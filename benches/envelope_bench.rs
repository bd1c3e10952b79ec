use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use envelope_protocol::core::envelope::Envelope;
use envelope_protocol::service::Orchestrator;
use envelope_protocol::{json, Value};

fn record(rows: usize) -> Value {
    json!({
        "source": "bench",
        "rows": (0..rows)
            .map(|i| json!({"id": i, "name": format!("row-{i}"), "score": i as f64 * 0.5}))
            .collect::<Vec<_>>()
    })
}

#[allow(clippy::unwrap_used)]
fn bench_envelope_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_encode_decode");

    for &rows in &[1usize, 16, 256, 4096] {
        let value = record(rows);
        let wire_len = Envelope::encode(&value, 1, false).unwrap().to_bytes().unwrap().len();
        group.throughput(Throughput::Bytes(wire_len as u64));

        for compress in [false, true] {
            let label = if compress { "zstd" } else { "plain" };
            group.bench_function(format!("encode_{label}_{rows}rows"), |b| {
                b.iter(|| Envelope::encode(&value, 1, compress).unwrap())
            });

            let bytes = Envelope::encode(&value, 1, compress).unwrap().to_bytes().unwrap();
            group.bench_function(format!("parse_decode_{label}_{rows}rows"), |b| {
                b.iter(|| {
                    let envelope = Envelope::from_bytes(&bytes).unwrap();
                    envelope.decode().unwrap()
                })
            });
        }
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_orchestrator_sealed(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator_sealed");
    let orchestrator = Orchestrator::builder()
        .schema(json!({"type": "object", "required": ["source", "rows"]}))
        .encrypt(true)
        .build()
        .unwrap();

    for &rows in &[16usize, 1024] {
        let value = record(rows);
        group.bench_function(format!("encode_{rows}rows"), |b| {
            b.iter(|| orchestrator.encode(&value).unwrap())
        });
        group.bench_function(format!("decode_{rows}rows"), |b| {
            b.iter_batched(
                || orchestrator.encode(&value).unwrap(),
                |envelope| orchestrator.decode(&envelope, true).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_envelope_encode_decode, bench_orchestrator_sealed);
criterion_main!(benches);
