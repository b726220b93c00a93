use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Latency observations kept per method. Older ones are evicted first.
const LATENCY_WINDOW: usize = 1024;

/// In-memory counter. Monotonically increasing.
struct Counter {
    value: AtomicU64,
}

impl Counter {
    fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Sliding window of latency observations for percentile computation.
struct Histogram {
    observations: Mutex<VecDeque<f64>>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            observations: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
        }
    }

    fn observe(&self, value: f64) {
        let mut obs = self.observations.lock();
        if obs.len() == LATENCY_WINDOW {
            obs.pop_front();
        }
        obs.push_back(value);
    }

    fn summary(&self) -> HistogramSummary {
        let mut sorted: Vec<f64> = self.observations.lock().iter().copied().collect();
        if sorted.is_empty() {
            return HistogramSummary::default();
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = sorted.len();
        let p50 = sorted[count / 2];
        let p95 = sorted[((count as f64 * 0.95) as usize).min(count - 1)];
        let max = sorted[count - 1];
        HistogramSummary {
            count: count as u64,
            p50,
            p95,
            max,
        }
    }
}

/// Summary statistics over the latency window, in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

struct MethodStats {
    total: Counter,
    ok: Counter,
    errors: RwLock<HashMap<String, Counter>>,
    latency: Histogram,
}

impl MethodStats {
    fn new() -> Self {
        Self {
            total: Counter::new(),
            ok: Counter::new(),
            errors: RwLock::new(HashMap::new()),
            latency: Histogram::new(),
        }
    }

    fn record_error(&self, code: &str) {
        let errors = self.errors.read();
        if let Some(c) = errors.get(code) {
            c.increment();
            return;
        }
        drop(errors);
        self.errors
            .write()
            .entry(code.to_string())
            .or_insert_with(Counter::new)
            .increment();
    }
}

/// Point-in-time view of one method's counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSnapshot {
    pub total: u64,
    pub ok: u64,
    pub errors: BTreeMap<String, u64>,
    pub latency_ms: HistogramSummary,
}

/// Thread-safe per-method request metrics.
///
/// Outcomes are keyed by the RPC error code string so the snapshot lines up
/// with what callers saw on the wire.
pub struct RequestMetrics {
    methods: RwLock<HashMap<String, MethodStats>>,
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Record one completed request. `error_code` is `None` on success.
    pub fn record(&self, method: &str, error_code: Option<&str>, elapsed: Duration) {
        let methods = self.methods.read();
        if let Some(stats) = methods.get(method) {
            apply(stats, error_code, elapsed);
            return;
        }
        drop(methods);
        let mut methods = self.methods.write();
        let stats = methods.entry(method.to_string()).or_insert_with(MethodStats::new);
        apply(stats, error_code, elapsed);
    }

    /// Snapshot of every method seen so far, sorted by method name.
    pub fn snapshot(&self) -> BTreeMap<String, MethodSnapshot> {
        self.methods
            .read()
            .iter()
            .map(|(name, stats)| {
                let errors = stats
                    .errors
                    .read()
                    .iter()
                    .map(|(code, c)| (code.clone(), c.get()))
                    .collect();
                let snap = MethodSnapshot {
                    total: stats.total.get(),
                    ok: stats.ok.get(),
                    errors,
                    latency_ms: stats.latency.summary(),
                };
                (name.clone(), snap)
            })
            .collect()
    }

    pub fn total_requests(&self) -> u64 {
        self.methods.read().values().map(|s| s.total.get()).sum()
    }
}

fn apply(stats: &MethodStats, error_code: Option<&str>, elapsed: Duration) {
    stats.total.increment();
    match error_code {
        None => stats.ok.increment(),
        Some(code) => stats.record_error(code),
    }
    stats.latency.observe(elapsed.as_secs_f64() * 1000.0);
}
