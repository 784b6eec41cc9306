//! Retrieval metrics with rolling averages.
//!
//! Lightweight in-memory collector fed at the pipeline's observability
//! checkpoints: segmentation, embedding (batch and query), strategy selection
//! and search completion. Samples are kept per metric and averaged over a
//! rolling window.
//!
//! ## Architecture
//!
//! The collector is a global singleton (`global_metrics()`); every component
//! records to the same instance.

use crate::embedding::StrategyKind;
use instant::Instant;
use once_cell::sync::Lazy;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Default window size for rolling averages (60 seconds).
const DEFAULT_WINDOW_SECS: u64 = 60;

/// Window size for search metrics (5 minutes).
/// Searches are less frequent than ingestion work.
const SEARCH_WINDOW_SECS: u64 = 300;

/// Maximum samples to keep per metric (prevents unbounded growth).
const MAX_SAMPLES: usize = 1000;

/// A single timing sample with timestamp.
#[derive(Clone, Debug)]
struct TimingSample {
    timestamp: Instant,
    duration_ms: f64,
}

/// Rolling statistics for a single metric.
#[derive(Debug, Default)]
struct MetricData {
    samples: VecDeque<TimingSample>,
    /// Total count since startup.
    total_count: u64,
}

impl MetricData {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            total_count: 0,
        }
    }

    fn record(&mut self, duration_ms: f64) {
        self.total_count += 1;
        self.samples.push_back(TimingSample {
            timestamp: Instant::now(),
            duration_ms,
        });
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }

    /// Drop samples older than the window.
    fn prune(&mut self, window: Duration) {
        let cutoff = match Instant::now().checked_sub(window) {
            Some(t) => t,
            None => return,
        };
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn in_window(&self, window: Duration) -> impl Iterator<Item = &TimingSample> {
        let cutoff = Instant::now().checked_sub(window);
        self.samples
            .iter()
            .filter(move |s| cutoff.map_or(true, |c| s.timestamp >= c))
    }

    fn rolling_avg(&self, window: Duration) -> Option<f64> {
        let (sum, count) = self
            .in_window(window)
            .fold((0.0, 0usize), |(sum, count), s| (sum + s.duration_ms, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    fn rolling_count(&self, window: Duration) -> usize {
        self.in_window(window).count()
    }
}

/// Information about the last search (point-in-time, not rolling).
#[derive(Clone, Debug, Default)]
struct LastSearchInfo {
    hit_count: usize,
    top_score: Option<f32>,
}

/// Collected metrics snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub segmentation_avg_ms: Option<f64>,
    pub segmentation_count: usize,

    pub embedding_avg_ms: Option<f64>,
    pub embedding_count: usize,

    pub search_avg_ms: Option<f64>,
    pub search_count: usize,
    pub last_hit_count: Option<usize>,
    pub last_top_score: Option<f32>,

    /// Lifetime count of successful embeddings per strategy.
    pub strategy_selections: HashMap<StrategyKind, u64>,
    /// Lifetime count of candidates scored in degraded mode.
    pub degraded_matches: u64,

    pub total_documents_segmented: u64,
    pub total_searches: u64,
}

struct MetricsInner {
    segmentation: MetricData,
    embedding: MetricData,
    search: MetricData,
    last_search: Option<LastSearchInfo>,
    strategy_selections: HashMap<StrategyKind, u64>,
    degraded_matches: u64,
}

impl Default for MetricsInner {
    fn default() -> Self {
        Self {
            segmentation: MetricData::new(),
            embedding: MetricData::new(),
            search: MetricData::new(),
            last_search: None,
            strategy_selections: HashMap::new(),
            degraded_matches: 0,
        }
    }
}

/// Performance metrics collector.
///
/// Thread-safe; `record_*` methods never fail (a poisoned lock drops the
/// sample).
#[derive(Clone)]
pub struct PerformanceMetrics {
    inner: Arc<RwLock<MetricsInner>>,
    window: Duration,
    search_window: Duration,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            search_window: Duration::from_secs(SEARCH_WINDOW_SECS),
        }
    }

    /// Create a collector where every metric uses the same window (for testing).
    pub fn with_window(window_secs: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            window: Duration::from_secs(window_secs),
            search_window: Duration::from_secs(window_secs),
        }
    }

    pub fn record_segmentation(&self, duration_ms: f64) {
        if let Ok(mut inner) = self.inner.write() {
            inner.segmentation.record(duration_ms);
        }
    }

    pub fn record_embedding(&self, duration_ms: f64) {
        if let Ok(mut inner) = self.inner.write() {
            inner.embedding.record(duration_ms);
        }
    }

    pub fn record_strategy(&self, strategy: StrategyKind) {
        if let Ok(mut inner) = self.inner.write() {
            *inner.strategy_selections.entry(strategy).or_insert(0) += 1;
        }
    }

    pub fn record_degraded(&self, count: usize) {
        if let Ok(mut inner) = self.inner.write() {
            inner.degraded_matches += count as u64;
        }
    }

    pub fn record_search(&self, duration_ms: f64, hit_count: usize, top_score: Option<f32>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.search.record(duration_ms);
            inner.last_search = Some(LastSearchInfo {
                hit_count,
                top_score,
            });
        }
    }

    /// Prune old samples outside the windows.
    pub fn prune(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.segmentation.prune(self.window);
            inner.embedding.prune(self.window);
            inner.search.prune(self.search_window);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = match self.inner.read() {
            Ok(inner) => inner,
            Err(_) => return MetricsSnapshot::default(),
        };
        let last_search = inner.last_search.as_ref();

        MetricsSnapshot {
            segmentation_avg_ms: inner.segmentation.rolling_avg(self.window),
            segmentation_count: inner.segmentation.rolling_count(self.window),

            embedding_avg_ms: inner.embedding.rolling_avg(self.window),
            embedding_count: inner.embedding.rolling_count(self.window),

            search_avg_ms: inner.search.rolling_avg(self.search_window),
            search_count: inner.search.rolling_count(self.search_window),
            last_hit_count: last_search.map(|s| s.hit_count),
            last_top_score: last_search.and_then(|s| s.top_score),

            strategy_selections: inner.strategy_selections.clone(),
            degraded_matches: inner.degraded_matches,

            total_documents_segmented: inner.segmentation.total_count,
            total_searches: inner.search.total_count,
        }
    }

    /// Resets all counters and samples.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = MetricsInner::default();
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_METRICS: Lazy<PerformanceMetrics> = Lazy::new(PerformanceMetrics::new);

/// Get the global metrics collector.
pub fn global_metrics() -> &'static PerformanceMetrics {
    &GLOBAL_METRICS
}
