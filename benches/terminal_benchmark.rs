//! Terminal stream processing benchmarks for WebTerm
//!
//! This benchmark suite measures:
//! - Parsing speed for plain and SGR-heavy text
//! - Control sequence extraction
//! - Line buffer appends including eviction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use webterm::terminal::{parse, LineBuffer, LineKind, StyleState};

/// Benchmark parsing plain text
fn bench_parse_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_plain_text");

    for size in [100, 1000, 10000].iter() {
        let text = "a".repeat(*size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| parse(black_box(text), StyleState::default()));
        });
    }

    group.finish();
}

/// Benchmark parsing colored `ls`-style output
fn bench_parse_sgr(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_sgr");

    let line = "\x1b[01;34mdir\x1b[0m  \x1b[01;32mexec\x1b[0m  \x1b[38;5;208mfile\x1b[0m\r\n";
    for lines in [10, 100, 1000].iter() {
        let text = line.repeat(*lines);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &text, |b, text| {
            b.iter(|| parse(black_box(text), StyleState::default()));
        });
    }

    group.finish();
}

/// Benchmark cursor and clear sequences
fn bench_parse_controls(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_controls");

    let sequences = vec![
        ("cursor_position", "\x1b[10;20H".repeat(100)),
        ("cursor_relative", "\x1b[A\x1b[3B\x1b[C\x1b[2D".repeat(100)),
        ("clear", "text\x1b[2J".repeat(100)),
    ];

    for (name, sequence) in sequences {
        group.bench_function(name, |b| {
            b.iter(|| parse(black_box(&sequence), StyleState::default()));
        });
    }

    group.finish();
}

/// Benchmark appending into a full scrollback
fn bench_buffer_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_append");

    let chunk = "\x1b[32mok\x1b[0m test::case ... passed\n".repeat(50);
    group.bench_function("append_with_eviction", |b| {
        let mut buffer = LineBuffer::with_limits(1000, 10.0);
        b.iter(|| buffer.append_output(black_box(&chunk), LineKind::Output));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_plain_text,
    bench_parse_sgr,
    bench_parse_controls,
    bench_buffer_append
);
criterion_main!(benches);
