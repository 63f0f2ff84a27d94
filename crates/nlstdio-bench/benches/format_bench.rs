//! Writer hot-path benchmarks: `snprintf` into a fixed buffer, `asprintf`
//! into a growable one, and the integer-only variant.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nlstdio_bench::{BenchStats, FORMATS};
use nlstdio_core::stdio::{self, FormatArg};

fn args_for(name: &str) -> Vec<FormatArg<'static>> {
    match name {
        "integers" => vec![
            FormatArg::Int(-123_456),
            FormatArg::Uint(42),
            FormatArg::Uint(0xdead_beef),
            FormatArg::Uint(0o755),
            FormatArg::Int(9_876_543_210),
        ],
        "strings" => vec![
            FormatArg::Str(Some(&b"alpha"[..])),
            FormatArg::Str(Some(&b"truncated-here"[..])),
            FormatArg::Str(Some(&b"right"[..])),
        ],
        "floats" => vec![
            FormatArg::Float(3.141_592_653_589_793),
            FormatArg::Float(6.022e23),
            FormatArg::Float(0.000_123_45),
            FormatArg::Float(1.0 / 3.0),
        ],
        _ => Vec::new(),
    }
}

fn bench_snprintf(c: &mut Criterion) {
    let mut group = c.benchmark_group("snprintf");
    group.throughput(Throughput::Elements(1));
    for &(name, fmt) in FORMATS {
        let args = args_for(name);
        let stats = RefCell::new(BenchStats::default());
        let mut buf = [0u8; 256];
        group.bench_function(BenchmarkId::new("fixed", name), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    let n = stdio::snprintf(&mut buf, black_box(fmt), black_box(&args));
                    black_box(n.ok());
                }
                let dur = start.elapsed().max(Duration::from_nanos(1));
                stats.borrow_mut().record(iters, dur);
                dur
            });
        });
        stats.borrow().report("FORMAT_BENCH", &format!("snprintf/{name}"));
    }
    group.finish();
}

fn bench_truncation(c: &mut Criterion) {
    let long = vec![b'x'; 4096];
    let args = [FormatArg::Str(Some(long.as_slice()))];
    let mut group = c.benchmark_group("snprintf_truncating");
    group.throughput(Throughput::Bytes(long.len() as u64));
    for capacity in [0usize, 16, 1024] {
        let mut buf = vec![0u8; capacity];
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| black_box(stdio::snprintf(&mut buf, b"%s", &args).ok()));
        });
    }
    group.finish();
}

fn bench_asprintf(c: &mut Criterion) {
    let mut group = c.benchmark_group("asprintf");
    for &(name, fmt) in FORMATS {
        let args = args_for(name);
        group.bench_function(BenchmarkId::new("full", name), |b| {
            b.iter(|| black_box(stdio::asprintf(black_box(fmt), &args).ok()));
        });
        group.bench_function(BenchmarkId::new("integer_only", name), |b| {
            b.iter(|| black_box(stdio::asiprintf(black_box(fmt), &args).ok()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snprintf, bench_truncation, bench_asprintf);
criterion_main!(benches);
