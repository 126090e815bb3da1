//! Benchmarks for the log evaluation pipeline

use chbench_metrics::{Evaluation, EvaluationOptions, TimingLog};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_log(rows: usize) -> String {
    let mut csv = String::from("type,start,latency,worker,phase\n");
    for i in 0..rows {
        // every tenth row is an analytical query, the rest NewOrder/Payment
        let transaction_type = match i % 10 {
            0 => 7 + (i / 10) % 22,
            1 | 3 | 5 | 7 => 2,
            _ => 3,
        };
        let latency = if transaction_type >= 7 { 2_000_000 + (i % 97) * 1_000 } else { 5_000 };
        csv.push_str(&format!("{},{},{},{},0\n", transaction_type, 1_000 + i / 50, latency, i % 8));
    }
    csv
}

fn load_and_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    for rows in [1_000usize, 10_000, 100_000].iter() {
        let raw = synthetic_log(*rows);

        group.bench_with_input(BenchmarkId::new("load", rows), &raw, |b, raw| {
            b.iter(|| {
                let log = TimingLog::from_reader(raw.as_bytes()).unwrap();
                black_box(log.len());
            });
        });

        let log = TimingLog::from_reader(raw.as_bytes()).unwrap();
        let options = EvaluationOptions::default();
        group.bench_with_input(BenchmarkId::new("evaluate", rows), &log, |b, log| {
            b.iter(|| {
                let evaluation = Evaluation::from_log(log.clone(), &options).unwrap();
                black_box(evaluation.metrics().query_set_time);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, load_and_evaluate);
criterion_main!(benches);
