//! Metrics for SafePlate Risk Ledger
//!
//! Counters, gauges and latency histograms, exported as JSON or Prometheus
//! text. Metric names are dotted; Prometheus export rewrites them with the
//! `safeplate_` prefix and underscores.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Prefix applied to every exported Prometheus series
const PROMETHEUS_PREFIX: &str = "safeplate";

pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<HashMap<String, Arc<Histogram>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    pub async fn add_counter(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.read().await.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }

        let mut counters = self.counters.write().await;
        counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Increment `<name>.<label>`, e.g. `callbacks.rejected.invalid_proof`
    pub async fn inc_labelled(&self, name: &str, label: &str) {
        self.inc_counter(&format!("{name}.{label}")).await;
    }

    pub async fn set_gauge(&self, name: &str, value: u64) {
        if let Some(gauge) = self.gauges.read().await.get(name) {
            gauge.store(value, Ordering::Relaxed);
            return;
        }

        let mut gauges = self.gauges.write().await;
        gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .store(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .await
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn get_gauge(&self, name: &str) -> u64 {
        self.gauges
            .read()
            .await
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn observe_histogram(&self, name: &str, value: f64) {
        if let Some(histogram) = self.histograms.read().await.get(name) {
            histogram.observe(value);
            return;
        }

        let mut histograms = self.histograms.write().await;
        histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()))
            .observe(value);
    }

    /// Observation count of a histogram, 0 if it was never observed
    pub async fn histogram_count(&self, name: &str) -> u64 {
        self.histograms
            .read()
            .await
            .get(name)
            .map(|h| h.count())
            .unwrap_or(0)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn to_json(&self) -> serde_json::Value {
        let counters: BTreeMap<String, u64> = self
            .counters
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();

        let gauges: BTreeMap<String, u64> = self
            .gauges
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();

        let histograms: BTreeMap<String, serde_json::Value> = self
            .histograms
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
        })
    }

    /// Prometheus text exposition, series sorted by name
    pub async fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let uptime = prometheus_name("uptime_seconds");
        output.push_str(&format!("# HELP {uptime} Time since service start\n"));
        output.push_str(&format!("# TYPE {uptime} gauge\n"));
        output.push_str(&format!("{uptime} {}\n", self.uptime_seconds()));

        let counters: BTreeMap<String, u64> = self
            .counters
            .read()
            .await
            .iter()
            .map(|(k, v)| (prometheus_name(k), v.load(Ordering::Relaxed)))
            .collect();
        for (name, value) in counters {
            output.push_str(&format!("# TYPE {name} counter\n{name} {value}\n"));
        }

        let gauges: BTreeMap<String, u64> = self
            .gauges
            .read()
            .await
            .iter()
            .map(|(k, v)| (prometheus_name(k), v.load(Ordering::Relaxed)))
            .collect();
        for (name, value) in gauges {
            output.push_str(&format!("# TYPE {name} gauge\n{name} {value}\n"));
        }

        let histograms = self.histograms.read().await;
        let mut names: Vec<&String> = histograms.keys().collect();
        names.sort();
        for name in names {
            output.push_str(&histograms[name].to_prometheus(&prometheus_name(name)));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    format!("{PROMETHEUS_PREFIX}_{}", name.replace(['.', '-'], "_"))
}

/// Fixed-bucket histogram. The sum is kept in microseconds.
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        self.sum_micros
            .fetch_add((value.max(0.0) * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bucket| value <= *bucket) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    pub fn to_json(&self) -> serde_json::Value {
        let counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();

        serde_json::json!({
            "buckets": self.buckets,
            "counts": counts,
            "sum": self.sum(),
            "count": self.count(),
        })
    }

    pub fn to_prometheus(&self, name: &str) -> String {
        let mut output = format!("# TYPE {name} histogram\n");

        let mut cumulative = 0u64;
        for (bucket, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            output.push_str(&format!("{name}_bucket{{le=\"{bucket}\"}} {cumulative}\n"));
        }

        output.push_str(&format!("{name}_bucket{{le=\"+Inf\"}} {}\n", self.count()));
        output.push_str(&format!("{name}_sum {}\n", self.sum()));
        output.push_str(&format!("{name}_count {}\n", self.count()));
        output
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Callback latency spans relay delays of milliseconds to minutes
        Self::new(vec![
            0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0,
        ])
    }
}

/// Predefined metric names
pub mod metric_names {
    pub const REPORTS_SUBMITTED: &str = "reports.submitted";

    pub const DECRYPT_DISPATCHED: &str = "decrypt.dispatched";
    pub const DECRYPT_DISPATCH_FAILED: &str = "decrypt.dispatch_failed";

    pub const CALLBACKS_RESOLVED: &str = "callbacks.resolved";
    /// Labelled by `LedgerError::metric_label`
    pub const CALLBACKS_REJECTED: &str = "callbacks.rejected";

    pub const PENDING_REQUESTS: &str = "pending.requests";

    /// Dispatch-to-resolution time
    pub const CALLBACK_LATENCY: &str = "callback.latency_seconds";
}
