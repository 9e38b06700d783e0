//! Per-process counters for optimization runs

use crate::api::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Aggregate counts across optimization runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    /// Number of optimizations attempted
    pub request_count: u64,
    /// Number that returned text
    pub success_count: u64,
    /// Failures keyed by classification
    pub failures: BTreeMap<ErrorKind, u64>,
    /// Estimated tokens of the raw inputs of successful runs
    pub tokens_before: u64,
    /// Estimated tokens of the optimized outputs
    pub tokens_after: u64,
    /// Wall time spent waiting on providers
    #[serde(skip)]
    pub total_latency: Duration,
}

impl OptimizationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, tokens_before: usize, tokens_after: usize, elapsed: Duration) {
        self.request_count += 1;
        self.success_count += 1;
        self.tokens_before += tokens_before as u64;
        self.tokens_after += tokens_after as u64;
        self.total_latency += elapsed;
    }

    pub fn record_failure(&mut self, kind: ErrorKind, elapsed: Duration) {
        self.request_count += 1;
        *self.failures.entry(kind).or_insert(0) += 1;
        self.total_latency += elapsed;
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Output tokens minus input tokens; negative means the prompts grew
    pub fn net_change(&self) -> i64 {
        self.tokens_after as i64 - self.tokens_before as i64
    }

    pub fn average_latency(&self) -> Duration {
        if self.request_count == 0 {
            return Duration::ZERO;
        }
        self.total_latency / self.request_count as u32
    }
}

/// Thread-safe metrics tracker
#[derive(Clone)]
pub struct MetricsTracker {
    inner: Arc<Mutex<OptimizationMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(OptimizationMetrics::new())),
        }
    }

    pub fn record_success(&self, tokens_before: usize, tokens_after: usize, elapsed: Duration) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.record_success(tokens_before, tokens_after, elapsed);
        }
    }

    pub fn record_failure(&self, kind: ErrorKind, elapsed: Duration) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.record_failure(kind, elapsed);
        }
    }

    pub fn get_metrics(&self) -> OptimizationMetrics {
        self.inner
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> MetricsSummary {
        let metrics = self.get_metrics();
        MetricsSummary {
            request_count: metrics.request_count,
            success_count: metrics.success_count,
            failure_count: metrics.failure_count(),
            failures: metrics.failures.clone(),
            tokens_before: metrics.tokens_before,
            tokens_after: metrics.tokens_after,
            net_change: metrics.net_change(),
            avg_latency_ms: metrics.average_latency().as_millis() as u64,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub failures: BTreeMap<ErrorKind, u64>,
    pub tokens_before: u64,
    pub tokens_after: u64,
    pub net_change: i64,
    pub avg_latency_ms: u64,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Optimization Summary ===")?;
        writeln!(
            f,
            "Requests: {} ({} ok, {} failed)",
            self.request_count, self.success_count, self.failure_count
        )?;
        for (kind, count) in &self.failures {
            writeln!(f, "  {:?}: {}", kind, count)?;
        }
        writeln!(f, "Tokens before: {}", self.tokens_before)?;
        writeln!(f, "Tokens after: {}", self.tokens_after)?;
        writeln!(f, "Net change: {:+}", self.net_change)?;
        writeln!(f, "Avg latency: {}ms", self.avg_latency_ms)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut metrics = OptimizationMetrics::new();
        metrics.record_success(10, 25, Duration::from_millis(300));
        metrics.record_failure(ErrorKind::RateLimited, Duration::from_millis(100));
        metrics.record_failure(ErrorKind::RateLimited, Duration::from_millis(200));

        assert_eq!(metrics.request_count, 3);
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.failure_count(), 2);
        assert_eq!(metrics.failures[&ErrorKind::RateLimited], 2);
        assert_eq!(metrics.net_change(), 15);
        assert_eq!(metrics.average_latency(), Duration::from_millis(200));
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(OptimizationMetrics::new().average_latency(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_tracker_shared_across_tasks() {
        let tracker = MetricsTracker::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        tracker.record_success(4, 8, Duration::from_millis(10));
                    } else {
                        tracker.record_failure(ErrorKind::NetworkError, Duration::from_millis(10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let summary = tracker.summary();
        assert_eq!(summary.request_count, 8);
        assert_eq!(summary.success_count, 4);
        assert_eq!(summary.failures[&ErrorKind::NetworkError], 4);
        assert_eq!(summary.net_change, 16);
        assert!(summary.to_string().contains("Requests: 8 (4 ok, 4 failed)"));
    }
}
