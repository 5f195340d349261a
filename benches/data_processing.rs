//! Benchmarks for line decoding and attendance forecasting
//!
//! Run with: cargo bench

use attendance_rs::analysis::{forecast_next, TrendAccumulator};
use attendance_rs::config::ClassroomConfig;
use attendance_rs::protocol::decode_line;
use attendance_rs::session::SessionMachine;
use chrono::Local;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SAMPLE_LINES: [&str; 6] = [
    "Student ID: PROF1234",
    "Student ID: 4A 1B 7C 22",
    "Temp: 25.3 C Humid: 41.7 %",
    "!!!!!!DHT Error!!!!!!",
    "rc522: antenna gain 48dB",
    "Temp: abc C Humid: 40.0 %",
];

fn bench_decode_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_line");
    let at = Local::now();

    for line in SAMPLE_LINES {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(line), line, |b, line| {
            b.iter(|| decode_line(black_box(line), at));
        });
    }

    group.finish();
}

fn bench_session_scans(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_scans");

    for students in [30usize, 300] {
        let uids: Vec<String> = (0..students).map(|i| format!("S{:05}", i)).collect();
        group.throughput(Throughput::Elements((students * 2 + 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(students), &uids, |b, uids| {
            b.iter(|| {
                let mut machine = SessionMachine::new(ClassroomConfig::default());
                let at = Local::now();
                machine.handle_scan("PROF1234", at);
                for uid in uids.iter().chain(uids.iter()) {
                    black_box(machine.handle_scan(uid, at));
                }
                machine.handle_scan("PROF1234", at)
            });
        });
    }

    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast");

    for sessions in [10usize, 100, 1_000] {
        let counts: Vec<u32> = (0..sessions).map(|i| 20 + (i % 7) as u32).collect();
        group.throughput(Throughput::Elements(sessions as u64));

        group.bench_with_input(BenchmarkId::new("batch", sessions), &counts, |b, counts| {
            b.iter(|| forecast_next(black_box(counts)));
        });

        let accumulator = TrendAccumulator::from_counts(counts.iter().copied());
        group.bench_with_input(
            BenchmarkId::new("incremental", sessions),
            &accumulator,
            |b, accumulator| {
                b.iter(|| {
                    let mut acc = *accumulator;
                    acc.push(black_box(21));
                    acc.forecast()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_line, bench_session_scans, bench_forecast);
criterion_main!(benches);
