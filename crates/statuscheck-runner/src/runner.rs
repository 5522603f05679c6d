//! End-to-end run: probe, reconcile, report, notify.

use crate::config::Config;
use crate::metrics::MetricsRegistry;
use crate::notifier::{AlertSummary, Notifier, WebhookSink};
use crate::report::StatusReport;
use statuscheck::{Engine, HttpTransport, RunResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What a finished run reports back to the caller.
#[derive(Debug)]
pub struct RunSummary {
    pub result: RunResult,
    pub report: StatusReport,
    pub alerts: AlertSummary,
}

impl RunSummary {
    pub fn failed_count(&self) -> usize {
        self.report.failed.len()
    }
}

/// A configured run. Construction builds every HTTP client, so setup errors
/// surface before any target is probed.
pub struct StatusRunner {
    title: String,
    report_path: PathBuf,
    print_summary: bool,
    metrics_path: Option<PathBuf>,
    engine: Engine,
    notifier: Notifier,
    metrics: Arc<MetricsRegistry>,
}

impl StatusRunner {
    /// Create a runner backed by reqwest for probes and notifications.
    pub fn new(config: &Config) -> common::Result<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = Engine::with_reqwest(config.to_engine_config(), config.to_registry())?;
        let notifier = Notifier::with_reqwest(config.to_notifier_config(), Some(metrics.clone()))?;
        Ok(Self::assemble(config, engine, notifier, metrics))
    }

    /// Create a runner over caller-supplied transports.
    pub fn with_transports(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn WebhookSink>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = Engine::new(config.to_engine_config(), config.to_registry(), transport);
        let notifier = Notifier::new(config.to_notifier_config(), sink, Some(metrics.clone()));
        Self::assemble(config, engine, notifier, metrics)
    }

    fn assemble(
        config: &Config,
        engine: Engine,
        notifier: Notifier,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            title: config.title.clone(),
            report_path: config.report.path.clone(),
            print_summary: config.report.print_summary,
            metrics_path: config.metrics.textfile_path.clone(),
            engine,
            notifier,
            metrics,
        }
    }

    /// Override where the HTML report is written.
    pub fn set_report_path(&mut self, path: PathBuf) {
        self.report_path = path;
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Run once and produce the report. Per-target failures are part of the
    /// summary, not errors; only report I/O can fail here.
    pub async fn run(&self) -> common::Result<RunSummary> {
        info!(title = %self.title, "Statuscheck run starting");

        let result = self.engine.run().await;
        let registry = self.engine.registry();

        let report = StatusReport::build(&self.title, &result.store, registry, result.timing);
        let failed = result.failed();

        // Report and notifications both read the final state; neither waits on the other
        let (written, pending) = tokio::join!(
            async {
                let written = report.write_html(&self.report_path);
                if self.print_summary {
                    print!("{}", report.render_text());
                }
                written
            },
            self.notifier.notify(&failed, registry)
        );
        let alerts = pending.drain().await;

        self.metrics.record_run(&result, registry.len());
        if let Some(ref path) = self.metrics_path {
            if let Err(e) = self.metrics.write_textfile(path) {
                warn!(path = %path.display(), error = %e, "Failed to write metrics");
            }
        }

        written.map_err(|e| common::Error::report(format!("{}: {}", self.report_path.display(), e)))?;

        info!(
            failed = report.failed.len(),
            passed = report.passed.len(),
            duration_ms = report.run_duration_ms,
            "Statuscheck run finished"
        );

        Ok(RunSummary {
            result,
            report,
            alerts,
        })
    }
}
