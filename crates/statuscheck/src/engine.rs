//! One full check run: first pass, reconciliation, final state.

use crate::dispatcher::Dispatcher;
use crate::probe::{HttpTransport, Prober, ReqwestTransport};
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::registry::Registry;
use crate::store::ResultStore;
use crate::types::{CheckOutcome, EngineConfig, RunTiming, now_ms};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Final state of a run. The store is no longer written to once this exists.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub store: ResultStore,
    pub timing: RunTiming,
    /// Failures seen by the first pass, before reconciliation
    pub first_pass_failures: usize,
    pub reconcile: ReconcileSummary,
}

impl RunResult {
    /// Final failed outcomes in name order.
    pub fn failed(&self) -> BTreeMap<String, CheckOutcome> {
        self.store
            .snapshot()
            .into_iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .collect()
    }

    /// Final successful outcomes in name order.
    pub fn succeeded(&self) -> BTreeMap<String, CheckOutcome> {
        self.store
            .snapshot()
            .into_iter()
            .filter(|(_, outcome)| outcome.is_success())
            .collect()
    }
}

/// Drives a run against a registry with a fixed configuration.
pub struct Engine {
    config: EngineConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
}

impl Engine {
    /// Create an engine over any transport.
    pub fn new(config: EngineConfig, registry: Registry, transport: Arc<dyn HttpTransport>) -> Self {
        let prober = Arc::new(Prober::new(transport, config.timeout));
        let dispatcher = Dispatcher::new(prober, config.max_in_flight);
        let reconciler = Reconciler::new(config.retry_delay);

        Self {
            config,
            registry: Arc::new(registry),
            dispatcher,
            reconciler,
        }
    }

    /// Create an engine backed by reqwest. Fails before any probing if the
    /// HTTP client cannot be built.
    pub fn with_reqwest(config: EngineConfig, registry: Registry) -> common::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(config, registry, transport))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Name of the HTTP transport driving the probes.
    pub fn transport_name(&self) -> &str {
        self.dispatcher.transport_name()
    }

    /// Probe everything, re-check failures once, and return the final state.
    pub async fn run(&self) -> RunResult {
        let start_ms = now_ms();
        let store = ResultStore::new();

        info!(
            targets = self.registry.len(),
            transport = self.dispatcher.transport_name(),
            max_in_flight = self.dispatcher.max_in_flight(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Starting check run"
        );

        self.dispatcher.dispatch_all(&self.registry, &store).await;
        let first_pass_failures = store.failed_names().len();

        // The retry pass starts only after the first pass has fully finished
        let reconcile = self
            .reconciler
            .reconcile(&self.dispatcher, &self.registry, &store)
            .await;

        let timing = RunTiming {
            start_ms,
            end_ms: now_ms(),
        };

        info!(
            targets = self.registry.len(),
            first_pass_failures,
            recovered = reconcile.recovered.len(),
            failed = store.failed_names().len(),
            duration_ms = timing.duration_ms(),
            "Check run complete"
        );

        RunResult {
            store,
            timing,
            first_pass_failures,
            reconcile,
        }
    }
}
