//! Flap suppression: one delayed re-check of everything that failed.

use crate::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::store::ResultStore;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// What the retry pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Targets probed a second time
    pub retried: Vec<String>,
    /// Retried targets that succeeded on the second attempt
    pub recovered: Vec<String>,
    /// Retried targets that failed again; these are final
    pub still_failing: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.retried.is_empty()
    }
}

/// Re-validates first-pass failures exactly once after a fixed delay.
///
/// A target has to fail twice, `retry_delay` apart, to stay failed.
#[derive(Debug, Clone)]
pub struct Reconciler {
    retry_delay: Duration,
}

impl Reconciler {
    pub fn new(retry_delay: Duration) -> Self {
        Self { retry_delay }
    }

    /// Run the single retry pass. Returns immediately when nothing has failed.
    pub async fn reconcile(
        &self,
        dispatcher: &Dispatcher,
        registry: &Registry,
        store: &ResultStore,
    ) -> ReconcileSummary {
        let failed = store.failed_names();
        if failed.is_empty() {
            info!("No failed checks, skipping retry pass");
            return ReconcileSummary::default();
        }

        info!(
            failed = failed.len(),
            retry_delay_ms = self.retry_delay.as_millis() as u64,
            "Re-checking failed targets after delay"
        );
        sleep(self.retry_delay).await;

        dispatcher.dispatch_subset(registry, &failed, store).await;

        let (still_failing, recovered): (Vec<String>, Vec<String>) =
            failed.iter().cloned().partition(|name| store.has_failure(name));

        for name in &recovered {
            info!(name = %name, "Target recovered on retry");
        }
        for name in &still_failing {
            warn!(name = %name, outcome = ?store.get(name), "Target failed twice");
        }

        ReconcileSummary {
            retried: failed,
            recovered,
            still_failing,
        }
    }
}
