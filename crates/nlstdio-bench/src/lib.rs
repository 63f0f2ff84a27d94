//! Shared workloads and sample statistics for the nlstdio benchmarks.

use std::time::Duration;

use nlstdio_core::locale::Encoding;
use nlstdio_core::multibyte;

/// Per-sample timings collected through `iter_custom`, summarised as
/// percentiles after the group finishes.
#[derive(Debug, Default)]
pub struct BenchStats {
    samples_ns_per_op: Vec<f64>,
    total_iters: u64,
    total_ns: u128,
}

impl BenchStats {
    pub fn record(&mut self, iters: u64, dur: Duration) {
        let ns = dur.as_nanos();
        self.total_iters = self.total_iters.saturating_add(iters);
        self.total_ns = self.total_ns.saturating_add(ns);
        self.samples_ns_per_op.push(ns as f64 / iters.max(1) as f64);
    }

    /// One `tag bench=... p50_ns_op=...` line, or `None` before any sample.
    #[must_use]
    pub fn summary_line(&self, tag: &str, bench_label: &str) -> Option<String> {
        if self.samples_ns_per_op.is_empty() {
            return None;
        }
        let mut samples = self.samples_ns_per_op.clone();
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let throughput_ops_s = if self.total_ns == 0 {
            0.0
        } else {
            self.total_iters as f64 / (self.total_ns as f64 / 1e9)
        };
        Some(format!(
            "{tag} bench={bench_label} samples={} p50_ns_op={:.3} p95_ns_op={:.3} p99_ns_op={:.3} mean_ns_op={:.3} throughput_ops_s={:.3}",
            samples.len(),
            percentile_sorted(&samples, 0.50),
            percentile_sorted(&samples, 0.95),
            percentile_sorted(&samples, 0.99),
            mean,
            throughput_ops_s
        ))
    }

    pub fn report(&self, tag: &str, bench_label: &str) {
        if let Some(line) = self.summary_line(tag, bench_label) {
            println!("{line}");
        }
    }
}

#[must_use]
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p));
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Representative format strings for the writer benchmarks.
pub const FORMATS: &[(&str, &[u8])] = &[
    ("literal", b"the quick brown fox jumps over the lazy dog"),
    ("integers", b"%d %5u %-8x %#o %08lld"),
    ("strings", b"[%s] [%-12.4s] [%20s]"),
    ("floats", b"%f %.3e %g %a"),
];

/// A wide string of `len` code points cycling through `sample`.
#[must_use]
pub fn wide_text(sample: &str, len: usize) -> Vec<u32> {
    sample.chars().map(u32::from).cycle().take(len).collect()
}

/// `len` characters of text in `encoding`, NUL-terminated, built by
/// encoding a repeating sample representable in that encoding.
#[must_use]
pub fn encoded_text(encoding: Encoding, len: usize) -> Vec<u8> {
    let mut wide = wide_text(sample_for(encoding), len);
    wide.push(0);
    let mut out = vec![0u8; wide.len() * encoding.mb_cur_max()];
    match multibyte::wcstombs(encoding, &mut out, &wide) {
        Ok(n) => out.truncate(n + 1),
        Err(_) => out.clear(),
    }
    out
}

fn sample_for(encoding: Encoding) -> &'static str {
    match encoding {
        Encoding::Ascii => "plain ascii text, ",
        Encoding::Latin1 => "caf\u{e9} cr\u{e8}me br\u{fb}l\u{e9}e ",
        Encoding::Utf8 => "na\u{ef}ve \u{20ac}100 \u{65e5}\u{672c} ",
        // Wide values of the Japanese encodings are their own byte pairs.
        Encoding::EucJp => "\u{b0a1}\u{b0a2}ab\u{c6fc}",
        Encoding::ShiftJis => "\u{93fa}\u{967b}ab\u{b1}",
        Encoding::Jis => "\u{467c}\u{4b5c}ab\u{3021}",
    }
}
