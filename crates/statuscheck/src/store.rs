//! Latest outcome per target, shared between concurrent probes.

use crate::types::CheckOutcome;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Concurrent map from target name to its most recent outcome.
///
/// Cloning is cheap and every clone refers to the same map. Each write
/// replaces the whole outcome for one name; no operation spans keys.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    outcomes: Arc<DashMap<String, CheckOutcome>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome` for `name`, returning the outcome it replaced.
    pub fn record(&self, name: &str, outcome: CheckOutcome) -> Option<CheckOutcome> {
        self.outcomes.insert(name.to_string(), outcome)
    }

    /// Record `outcome` only if `name` has no outcome yet.
    ///
    /// Returns true when the outcome was stored.
    pub fn record_if_absent(&self, name: &str, outcome: CheckOutcome) -> bool {
        let mut inserted = false;
        self.outcomes.entry(name.to_string()).or_insert_with(|| {
            inserted = true;
            outcome
        });
        inserted
    }

    pub fn get(&self, name: &str) -> Option<CheckOutcome> {
        self.outcomes.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.outcomes.contains_key(name)
    }

    /// Whether the latest outcome for `name` is a failure.
    pub fn has_failure(&self, name: &str) -> bool {
        self.outcomes
            .get(name)
            .is_some_and(|entry| entry.value().is_failure())
    }

    /// Names whose latest outcome is a failure, sorted.
    pub fn failed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .outcomes
            .iter()
            .filter(|entry| entry.value().is_failure())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Point-in-time copy of every outcome, in name order.
    pub fn snapshot(&self) -> BTreeMap<String, CheckOutcome> {
        self.outcomes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
