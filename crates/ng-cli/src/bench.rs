use std::cmp::Ordering;
use std::time::Instant;

use ng_core::{DecideOptions, PolicySnapshot};

use crate::load::{load_policy, read_url_list, PolicySource};

pub struct BenchOptions {
    pub source: PolicySource,
    pub urls_path: Option<String>,
    pub iterations: usize,
    pub warmup_ops: usize,
    pub sample_batch_ops: usize,
    pub trace: bool,
}

struct BenchResult {
    name: String,
    op_count: usize,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    ops_per_sec: u64,
    blocked_pct: f64,
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    println!("========================================================================");
    println!("NavGate decide() Benchmark");
    println!("========================================================================");

    let (compiled, stats) = load_policy(&opts.source, true)?;
    let snapshot = compiled.snapshot;
    println!(
        "Policy: {} allow, {} deny rules ({} invalid, {} deduped), mode {}, compiled in {:.1}ms",
        stats.allow_rules,
        stats.deny_rules,
        compiled.stats.invalid,
        compiled.stats.deduped,
        snapshot.mode.as_str(),
        stats.total_ms
    );

    let urls = match &opts.urls_path {
        Some(path) => read_url_list(path)?,
        None => default_urls(),
    };
    println!("Dataset size: {} URLs", urls.len());
    println!("Iterations: {}", opts.iterations);
    println!();

    println!("Warming up...");
    warmup(&snapshot, &urls, opts.warmup_ops);
    println!("Warmup done.");
    println!();

    let options = DecideOptions { trace: opts.trace };
    let never = |_: &str| false;
    let name = if opts.trace { "decide (traced)" } else { "decide" };
    let result = run_bench_batched(name, &urls, opts.iterations, opts.sample_batch_ops.max(1), |url| {
        snapshot.decide(url, &never, options).blocked
    });
    println!("{}", format_result(&result));
    println!();

    println!("Notes:");
    println!("- p50/p95/p99 computed from per-batch wall-time samples divided by batch size.");

    Ok(())
}

fn warmup(snapshot: &PolicySnapshot, urls: &[String], warmup_ops: usize) {
    let never = |_: &str| false;
    let loops = if urls.is_empty() { 0 } else { warmup_ops / urls.len() + 1 };
    for _ in 0..loops {
        for url in urls {
            let _ = snapshot.decide(url, &never, DecideOptions::default());
        }
    }
}

fn run_bench_batched(
    name: &str,
    urls: &[String],
    iterations: usize,
    sample_batch_ops: usize,
    mut f: impl FnMut(&str) -> bool,
) -> BenchResult {
    let mut samples_us = Vec::new();
    let mut blocked = 0usize;
    let total_ops = urls.len() * iterations.max(1);

    let mut batch_ops = 0usize;
    let mut batch_start = Instant::now();
    let start = Instant::now();

    for _ in 0..iterations.max(1) {
        for url in urls {
            if f(url) {
                blocked += 1;
            }
            batch_ops += 1;
            if batch_ops == sample_batch_ops {
                let dt = batch_start.elapsed();
                samples_us.push(dt.as_secs_f64() * 1_000_000.0 / sample_batch_ops as f64);
                batch_ops = 0;
                batch_start = Instant::now();
            }
        }
    }

    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    samples_us.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let avg_us = if total_ops == 0 { 0.0 } else { total_ms * 1000.0 / total_ops as f64 };

    BenchResult {
        name: name.to_string(),
        op_count: total_ops,
        total_ms,
        avg_us,
        p50_us: percentile(&samples_us, 0.50),
        p95_us: percentile(&samples_us, 0.95),
        p99_us: percentile(&samples_us, 0.99),
        ops_per_sec: if total_ms > 0.0 { (total_ops as f64 / (total_ms / 1000.0)) as u64 } else { 0 },
        blocked_pct: if total_ops > 0 { (blocked as f64 / total_ops as f64) * 100.0 } else { 0.0 },
    }
}

fn format_result(result: &BenchResult) -> String {
    format!(
        "{}:\n  Ops: {}\n  Total: {:.2} ms\n  Avg: {:.2} us\n  P50: {:.2} us\n  P95: {:.2} us\n  P99: {:.2} us\n  Throughput: {} ops/sec\n  Blocked: {:.1}%",
        result.name,
        result.op_count,
        result.total_ms,
        result.avg_us,
        result.p50_us,
        result.p95_us,
        result.p99_us,
        result.ops_per_sec,
        result.blocked_pct,
    )
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn default_urls() -> Vec<String> {
    [
        "https://www.reddit.com/r/askscience/comments/abc/why_is_the_sky_blue/",
        "https://www.reddit.com/r/funny/",
        "https://mail.google.com/mail/u/0/#inbox",
        "https://docs.google.com/document/d/1x/edit",
        "https://www.youtube.com/shorts/xyz",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        "https://news.ycombinator.com/item?id=1",
        "chrome://settings/",
        "http://example.com:8080/a/b/c?d=e",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_picks_nearest_rank() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.50), 2.0);
        assert_eq!(percentile(&values, 0.99), 4.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn batched_run_counts_blocked() {
        let urls = vec!["a".to_string(), "b".to_string()];
        let result = run_bench_batched("t", &urls, 3, 2, |url| url == "a");
        assert_eq!(result.op_count, 6);
        assert!((result.blocked_pct - 50.0).abs() < f64::EPSILON);
    }
}
