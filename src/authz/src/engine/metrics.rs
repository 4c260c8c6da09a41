//! Prometheus metrics collection for policy engine observability

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Engine counters and latency summary
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Requests the filter evaluated against the registry
    pub total_requests: u64,

    /// Permit verdicts
    pub permitted: u64,

    /// Deny verdicts
    pub denied: u64,

    /// Requests skipped because their operation is not governed
    pub ungoverned: u64,

    /// Requests lacking a user, realm or calling client
    pub not_applicable: u64,

    /// Gate checks that failed on configuration
    pub misconfigured: u64,

    /// Gate checks that were satisfied / not satisfied
    pub gate_satisfied: u64,
    pub gate_unsatisfied: u64,

    /// Latency percentiles (p50, p90, p95, p99, p99.9)
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_p999_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,

    /// Collaborator failures
    pub error_count: u64,
}

impl EngineMetrics {
    /// Share of evaluated requests that were denied
    pub fn deny_rate(&self) -> f64 {
        let total = self.permitted + self.denied;
        if total == 0 {
            0.0
        } else {
            self.denied as f64 / total as f64
        }
    }
}

/// Metrics collector with Prometheus-compatible storage
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,

    /// Latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record a registry verdict
    pub async fn record_verdict(&self, permitted: bool) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;

        if permitted {
            metrics.permitted += 1;
        } else {
            metrics.denied += 1;
        }
    }

    pub async fn record_ungoverned(&self) {
        self.metrics.write().await.ungoverned += 1;
    }

    pub async fn record_not_applicable(&self) {
        self.metrics.write().await.not_applicable += 1;
    }

    pub async fn record_misconfigured(&self) {
        self.metrics.write().await.misconfigured += 1;
    }

    /// Record a require-role gate outcome
    pub async fn record_gate(&self, satisfied: bool) {
        let mut metrics = self.metrics.write().await;
        if satisfied {
            metrics.gate_satisfied += 1;
        } else {
            metrics.gate_unsatisfied += 1;
        }
    }

    /// Record request latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }
    }

    pub async fn record_error(&self) {
        self.metrics.write().await.error_count += 1;
    }

    /// Current metrics snapshot
    ///
    /// Latency figures are summarized here from the retained samples, so the
    /// record path stays O(1).
    pub async fn get_metrics(&self) -> EngineMetrics {
        let mut snapshot = self.metrics.read().await.clone();

        let mut sorted = self.latency_samples.read().await.clone();
        if sorted.is_empty() {
            return snapshot;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        snapshot.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        snapshot.latency_p50_ms = Self::percentile(&sorted, 0.50);
        snapshot.latency_p90_ms = Self::percentile(&sorted, 0.90);
        snapshot.latency_p95_ms = Self::percentile(&sorted, 0.95);
        snapshot.latency_p99_ms = Self::percentile(&sorted, 0.99);
        snapshot.latency_p999_ms = Self::percentile(&sorted, 0.999);
        snapshot
    }

    pub async fn reset(&self) {
        // samples before metrics
        let mut samples = self.latency_samples.write().await;
        samples.clear();

        let mut metrics = self.metrics.write().await;
        *metrics = EngineMetrics::default();
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics().await;

        format!(
            r#"# HELP admingate_requests_total Requests evaluated against the policy registry
# TYPE admingate_requests_total counter
admingate_requests_total {}

# HELP admingate_permitted_total Permit verdicts
# TYPE admingate_permitted_total counter
admingate_permitted_total {}

# HELP admingate_denied_total Deny verdicts
# TYPE admingate_denied_total counter
admingate_denied_total {}

# HELP admingate_ungoverned_total Requests for operations no controlling role governs
# TYPE admingate_ungoverned_total counter
admingate_ungoverned_total {}

# HELP admingate_not_applicable_total Requests without user, realm or client
# TYPE admingate_not_applicable_total counter
admingate_not_applicable_total {}

# HELP admingate_misconfigured_total Gate checks failing on configuration
# TYPE admingate_misconfigured_total counter
admingate_misconfigured_total {}

# HELP admingate_gate_checks_total Require-role gate outcomes
# TYPE admingate_gate_checks_total counter
admingate_gate_checks_total{{outcome="satisfied"}} {}
admingate_gate_checks_total{{outcome="unsatisfied"}} {}

# HELP admingate_latency_seconds Request latency percentiles
# TYPE admingate_latency_seconds summary
admingate_latency_seconds{{quantile="0.5"}} {}
admingate_latency_seconds{{quantile="0.9"}} {}
admingate_latency_seconds{{quantile="0.95"}} {}
admingate_latency_seconds{{quantile="0.99"}} {}
admingate_latency_seconds{{quantile="0.999"}} {}

# HELP admingate_errors_total Collaborator failures
# TYPE admingate_errors_total counter
admingate_errors_total {}
"#,
            metrics.total_requests,
            metrics.permitted,
            metrics.denied,
            metrics.ungoverned,
            metrics.not_applicable,
            metrics.misconfigured,
            metrics.gate_satisfied,
            metrics.gate_unsatisfied,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p95_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
            metrics.latency_p999_ms / 1000.0,
            metrics.error_count,
        )
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_creation() {
        let collector = MetricsCollector::new();
        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.deny_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_record_verdict() {
        let collector = MetricsCollector::new();

        collector.record_verdict(true).await;
        collector.record_verdict(false).await;
        collector.record_verdict(true).await;
        collector.record_verdict(true).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.permitted, 3);
        assert_eq!(metrics.denied, 1);
        assert!((metrics.deny_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_skip_and_gate_counters() {
        let collector = MetricsCollector::new();

        collector.record_ungoverned().await;
        collector.record_not_applicable().await;
        collector.record_misconfigured().await;
        collector.record_gate(true).await;
        collector.record_gate(false).await;
        collector.record_gate(false).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.ungoverned, 1);
        assert_eq!(metrics.not_applicable, 1);
        assert_eq!(metrics.misconfigured, 1);
        assert_eq!(metrics.gate_satisfied, 1);
        assert_eq!(metrics.gate_unsatisfied, 2);
        assert_eq!(metrics.total_requests, 0);
    }

    #[tokio::test]
    async fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5)).await;
        collector.record_latency(Duration::from_millis(10)).await;
        collector.record_latency(Duration::from_millis(15)).await;

        let metrics = collector.get_metrics().await;
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms > 0.0);
    }

    #[tokio::test]
    async fn test_record_latency_leaves_counters_unlocked() {
        let collector = MetricsCollector::new();

        // a held counter lock must not stall the record path
        let _guard = collector.metrics.write().await;
        let recorded = tokio::time::timeout(
            Duration::from_secs(1),
            collector.record_latency(Duration::from_millis(3)),
        )
        .await;
        assert!(recorded.is_ok());
        assert_eq!(collector.latency_samples.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();

        for ms in 0..10_001u64 {
            collector.record_latency(Duration::from_micros(ms)).await;
        }

        assert_eq!(collector.latency_samples.read().await.len(), 9_001);
        let metrics = collector.get_metrics().await;
        // the oldest thousand samples were dropped
        assert!(metrics.latency_p50_ms > 5.0);
        assert!(metrics.latency_p999_ms <= 10.0);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let collector = MetricsCollector::new();

        collector.record_verdict(false).await;
        collector.record_gate(true).await;
        collector.record_latency(Duration::from_millis(5)).await;

        let prometheus = collector.export_prometheus().await;
        assert!(prometheus.contains("admingate_requests_total 1"));
        assert!(prometheus.contains("admingate_denied_total 1"));
        assert!(prometheus.contains("admingate_gate_checks_total{outcome=\"satisfied\"} 1"));
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();

        collector.record_verdict(true).await;
        collector.record_ungoverned().await;

        collector.reset().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.ungoverned, 0);
    }
}
