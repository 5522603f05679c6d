//! Prometheus metrics for a check run.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use statuscheck::RunResult;
use std::path::Path;
use tracing::info;

/// Labels for probe result metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// Which pass produced the outcome (first, retry)
    pub pass: String,
    /// Result (success, failure)
    pub result: String,
}

/// Labels for notification metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct NotificationLabels {
    /// Notification kind (callback, alert)
    pub kind: String,
    /// Result (success, failure)
    pub result: String,
}

/// Metrics registry with all run metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Probe outcomes by pass
    probes_total: Family<ProbeLabels, Counter>,
    /// Successful probe durations
    probe_duration_seconds: Histogram,
    /// Registered targets
    targets: Gauge,
    /// Targets failed after reconciliation
    failed_targets: Gauge,
    /// Targets that recovered on retry
    recovered_targets: Gauge,
    /// Whole-run wall time in milliseconds
    run_duration_milliseconds: Gauge,
    /// Callback and alert deliveries
    notifications_total: Family<NotificationLabels, Counter>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "statuscheck_probes",
            "Total probes performed",
            probes_total.clone(),
        );

        // Exponential buckets from 1ms to ~16s
        let probe_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 15));
        registry.register(
            "statuscheck_probe_duration_seconds",
            "Duration of successful probes in seconds",
            probe_duration_seconds.clone(),
        );

        let targets = Gauge::default();
        registry.register("statuscheck_targets", "Number of registered targets", targets.clone());

        let failed_targets = Gauge::default();
        registry.register(
            "statuscheck_failed_targets",
            "Targets that failed both the first check and the retry",
            failed_targets.clone(),
        );

        let recovered_targets = Gauge::default();
        registry.register(
            "statuscheck_recovered_targets",
            "Targets that failed the first check but passed the retry",
            recovered_targets.clone(),
        );

        let run_duration_milliseconds = Gauge::default();
        registry.register(
            "statuscheck_run_duration_milliseconds",
            "Wall-clock duration of the last run",
            run_duration_milliseconds.clone(),
        );

        let notifications_total = Family::<NotificationLabels, Counter>::default();
        registry.register(
            "statuscheck_notifications",
            "Callback and alert deliveries",
            notifications_total.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            targets,
            failed_targets,
            recovered_targets,
            run_duration_milliseconds,
            notifications_total,
        }
    }

    /// Record the final state of a run
    pub fn record_run(&self, result: &RunResult, target_count: usize) {
        self.targets.set(target_count as i64);

        let retried = result.reconcile.retried.len() as u64;
        let first_pass_total = result.store.len() as u64;
        self.probe_counter("first", "failure").inc_by(result.first_pass_failures as u64);
        self.probe_counter("first", "success")
            .inc_by(first_pass_total.saturating_sub(result.first_pass_failures as u64));
        self.probe_counter("retry", "success")
            .inc_by(result.reconcile.recovered.len() as u64);
        self.probe_counter("retry", "failure")
            .inc_by(retried.saturating_sub(result.reconcile.recovered.len() as u64));

        for outcome in result.succeeded().values() {
            if let statuscheck::CheckOutcome::Success { duration_ms } = outcome {
                self.probe_duration_seconds.observe(*duration_ms as f64 / 1000.0);
            }
        }

        self.failed_targets.set(result.failed().len() as i64);
        self.recovered_targets
            .set(result.reconcile.recovered.len() as i64);
        self.run_duration_milliseconds
            .set(result.timing.duration_ms() as i64);
    }

    /// Record a callback or alert delivery
    pub fn record_notification(&self, kind: &str, result: &str) {
        self.notifications_total
            .get_or_create(&NotificationLabels {
                kind: kind.to_string(),
                result: result.to_string(),
            })
            .inc();
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    /// Write metrics for a node-exporter textfile collector.
    ///
    /// Writes to a temporary sibling and renames, so scrapers never see a
    /// half-written file.
    pub fn write_textfile(&self, path: &Path) -> common::Result<()> {
        let body = self.encode().map_err(common::Error::other)?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        info!(path = %path.display(), "Metrics written");
        Ok(())
    }

    fn probe_counter(&self, pass: &str, result: &str) -> Counter {
        self.probes_total
            .get_or_create(&ProbeLabels {
                pass: pass.to_string(),
                result: result.to_string(),
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuscheck::{CheckOutcome, ReconcileSummary, ResultStore, RunTiming};
    use std::time::Duration;

    fn run_result() -> RunResult {
        let store = ResultStore::new();
        store.record("a", CheckOutcome::success(Duration::from_millis(40)));
        store.record("b", CheckOutcome::success(Duration::from_millis(90)));
        store.record("c", CheckOutcome::status_mismatch(500));

        RunResult {
            store,
            timing: RunTiming {
                start_ms: 1_000,
                end_ms: 6_500,
            },
            first_pass_failures: 2,
            reconcile: ReconcileSummary {
                retried: vec!["b".into(), "c".into()],
                recovered: vec!["b".into()],
                still_failing: vec!["c".into()],
            },
        }
    }

    #[test]
    fn test_record_run_encodes() {
        let metrics = MetricsRegistry::new();
        metrics.record_run(&run_result(), 3);
        metrics.record_notification("callback", "failure");

        let text = metrics.encode().unwrap();
        assert!(text.contains("statuscheck_targets 3"));
        assert!(text.contains("statuscheck_failed_targets 1"));
        assert!(text.contains("statuscheck_recovered_targets 1"));
        assert!(text.contains("statuscheck_run_duration_milliseconds 5500"));
        assert!(text.contains(r#"statuscheck_probes_total{pass="first",result="failure"} 2"#));
        assert!(text.contains(r#"statuscheck_probes_total{pass="retry",result="success"} 1"#));
        assert!(text.contains(r#"statuscheck_notifications_total{kind="callback",result="failure"} 1"#));
    }

    #[test]
    fn test_write_textfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statuscheck.prom");

        let metrics = MetricsRegistry::new();
        metrics.record_run(&run_result(), 3);
        metrics.write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("statuscheck_targets"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}
