//! Performance benchmarks for SafePlate Risk Ledger.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use safeplate_ledger::crypto::{decode_words, encode_words, OracleSigningKey};
use safeplate_ledger::domain::{LocationCode, ReportSubmission, RequestId};
use safeplate_ledger::infra::{InMemoryCiphertextStore, LocalDecryptionOracle, NotificationLog};
use safeplate_ledger::metrics::MetricsRegistry;
use safeplate_ledger::risk::{assess, InspectionScores};
use safeplate_ledger::RiskLedgerService;

/// Benchmark the pure risk engine
fn bench_risk_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_engine");

    let scores: Vec<InspectionScores> = (0..=100u32)
        .step_by(10)
        .map(|s| InspectionScores::new(s, 100 - s, (s * 7) % 101).unwrap())
        .collect();

    group.throughput(Throughput::Elements(scores.len() as u64));
    group.bench_function("assess", |b| {
        b.iter(|| {
            for s in &scores {
                black_box(assess(black_box(s)));
            }
        });
    });

    group.finish();
}

/// Benchmark payload encode/decode
fn bench_payload_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_codec");

    for arity in [2usize, 4].iter() {
        let values: Vec<u32> = (0..*arity as u32).map(|i| i * 37).collect();
        let payload = encode_words(&values);

        group.bench_with_input(BenchmarkId::new("encode", arity), &values, |b, values| {
            b.iter(|| black_box(encode_words(black_box(values))));
        });
        group.bench_with_input(BenchmarkId::new("decode", arity), &payload, |b, payload| {
            b.iter(|| black_box(decode_words(black_box(payload), *arity).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark oracle proof signing and verification
fn bench_proofs(c: &mut Criterion) {
    let mut group = c.benchmark_group("proofs");

    let key = OracleSigningKey::generate();
    let verifying = key.verifying_key();
    let request_id = RequestId::new();
    let payload = encode_words(&[90, 85, 80, 94107]);
    let proof = key.sign_decryption(&request_id, &payload);

    group.bench_function("sign", |b| {
        b.iter(|| black_box(key.sign_decryption(&request_id, black_box(&payload))));
    });
    group.bench_function("verify", |b| {
        b.iter(|| {
            verifying
                .verify_decryption(&request_id, black_box(&payload), &proof)
                .unwrap()
        });
    });

    group.finish();
}

/// Benchmark a full submit, dispatch and resolve cycle
fn bench_pipeline(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ciphertexts = Arc::new(InMemoryCiphertextStore::new());
    let oracle = Arc::new(LocalDecryptionOracle::new(
        ciphertexts.clone(),
        OracleSigningKey::generate(),
    ));
    let service = RiskLedgerService::new(
        ciphertexts.clone(),
        oracle.clone(),
        Arc::new(NotificationLog::new()),
        Arc::new(MetricsRegistry::new()),
    );

    c.bench_function("pipeline/risk_calculation", |b| {
        b.to_async(&runtime).iter(|| async {
            let submission = ReportSubmission {
                restaurant_id: ciphertexts.seal(1),
                hygiene: ciphertexts.seal(70),
                food_safety: ciphertexts.seal(40),
                facility: ciphertexts.seal(40),
                location: LocationCode::new(94107),
            };
            let report = service.submit_report(&submission).await.unwrap();
            let request_id = service.request_risk_calculation(report.id).await.unwrap();
            let callback = oracle.fulfill(&request_id).unwrap();
            black_box(service.resolve(&callback).await.unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_risk_engine,
    bench_payload_codec,
    bench_proofs,
    bench_pipeline
);
criterion_main!(benches);
