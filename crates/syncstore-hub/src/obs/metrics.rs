//! Minimal metrics registry for the hub.
//!
//! Labels are flattened into sorted `(key, value)` vectors so rendering is
//! deterministic per series. Histogram buckets are fixed in microseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| {
            let v = v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
            format!("{k}=\"{v}\"")
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let _ = writeln!(out, "{name}{{{}}} {}", render_labels(r.key()), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }
    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge\n{name} {}", self.get());
    }
}

// 50us .. 1s
const BUCKETS_MICROS: [u64; 8] = [50, 100, 500, 1_000, 5_000, 50_000, 250_000, 1_000_000];

#[derive(Default)]
struct Histogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, Histogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], d: Duration) {
        let micros = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        let h = self.map.entry(label_key(labels)).or_default();
        h.count.fetch_add(1, Ordering::Relaxed);
        h.sum.fetch_add(micros, Ordering::Relaxed);
        for (bucket, le) in h.buckets.iter().zip(BUCKETS_MICROS) {
            if micros <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let labels = render_labels(r.key());
            let prefix = if labels.is_empty() { String::new() } else { format!("{labels},") };
            let h = r.value();
            for (bucket, le) in h.buckets.iter().zip(BUCKETS_MICROS) {
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {}", bucket.load(Ordering::Relaxed));
            }
            let count = h.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum{{{labels}}} {}", h.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
        }
    }
}

/// Hub counters. Traffic that is not ours is never counted.
#[derive(Default)]
pub struct HubMetrics {
    /// `operation`, `decision` (permit/deny).
    pub requests: CounterVec,
    /// `operation`.
    pub operation_failures: CounterVec,
    /// `kind` (poll/ready).
    pub handshakes: CounterVec,
    /// `operation`, microseconds.
    pub dispatch_duration: HistogramVec,
    pub peers_connected: Gauge,
}

impl HubMetrics {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests.render("syncstore_requests_total", &mut out);
        self.operation_failures.render("syncstore_operation_failures_total", &mut out);
        self.handshakes.render("syncstore_handshakes_total", &mut out);
        self.dispatch_duration.render("syncstore_dispatch_duration_micros", &mut out);
        self.peers_connected.render("syncstore_peers_connected", &mut out);
        out
    }
}
