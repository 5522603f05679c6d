//! Bounded-parallel dispatch of probes.

use crate::probe::Prober;
use crate::registry::Registry;
use crate::store::ResultStore;
use crate::types::{CheckOutcome, CheckTarget};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Error text recorded for a target whose probe task died before writing.
pub const ABORTED_PROBE_MESSAGE: &str = "probe task aborted";

/// Runs probes concurrently, never more than `max_in_flight` at once.
///
/// Admission is first-completion: when the cap is reached the next launch
/// waits for any running probe to finish. Timeouts are the prober's job.
#[derive(Clone)]
pub struct Dispatcher {
    prober: Arc<Prober>,
    max_in_flight: usize,
}

impl Dispatcher {
    /// Create a new dispatcher. The cap is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(prober: Arc<Prober>, max_in_flight: usize) -> Self {
        Self {
            prober,
            max_in_flight: max_in_flight.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn transport_name(&self) -> &str {
        self.prober.transport_name()
    }

    /// Probe every registered target. Returns once all probes have finished;
    /// outcomes are in `store`.
    pub async fn dispatch_all(&self, registry: &Registry, store: &ResultStore) -> usize {
        let jobs = registry
            .targets()
            .map(|target| (target.clone(), registry.expected_status(&target.name)))
            .collect();
        self.dispatch(jobs, store).await
    }

    /// Probe only the named targets. Names missing from the registry are skipped.
    pub async fn dispatch_subset(
        &self,
        registry: &Registry,
        names: &[String],
        store: &ResultStore,
    ) -> usize {
        let jobs = names
            .iter()
            .filter_map(|name| match registry.get(name) {
                Some(target) => Some((target.clone(), registry.expected_status(name))),
                None => {
                    warn!(name = %name, "Skipping unknown target");
                    None
                }
            })
            .collect();
        self.dispatch(jobs, store).await
    }

    async fn dispatch(&self, jobs: Vec<(CheckTarget, u16)>, store: &ResultStore) -> usize {
        let total = jobs.len();
        if total == 0 {
            return 0;
        }
        info!(
            targets = total,
            max_in_flight = self.max_in_flight,
            transport = self.transport_name(),
            "Dispatching probes"
        );

        let names: Vec<String> = jobs.iter().map(|(target, _)| target.name.clone()).collect();
        let slots = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();

        for (target, expected_status) in jobs {
            // Blocks while max_in_flight probes are running
            let permit = match slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(error = %e, "Dispatch slots closed; not launching remaining probes");
                    break;
                }
            };

            let prober = self.prober.clone();
            let store = store.clone();
            tasks.spawn(async move {
                let _permit = permit;
                prober.probe_into(&target, expected_status, &store).await;
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Probe task failed");
            }
        }

        // Every dispatched target ends with exactly one outcome
        for name in &names {
            if store.record_if_absent(name, CheckOutcome::unreachable(ABORTED_PROBE_MESSAGE)) {
                warn!(name = %name, "Probe produced no outcome; recorded as failed");
            }
        }

        debug!(targets = total, "Dispatch complete");
        total
    }
}
