//! Target registry: which endpoints to check and what status each must return.

use crate::types::CheckTarget;
use std::collections::{BTreeMap, HashMap};

/// Status code expected from a target when no override is configured.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Named targets plus expected-status resolution.
///
/// Targets are keyed by name; iteration is in name order so reports and logs
/// are stable between runs.
#[derive(Debug, Clone)]
pub struct Registry {
    targets: BTreeMap<String, CheckTarget>,
    overrides: HashMap<String, u16>,
    default_status: u16,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_EXPECTED_STATUS)
    }
}

impl Registry {
    /// Create an empty registry with the given default expected status.
    pub fn new(default_status: u16) -> Self {
        Self {
            targets: BTreeMap::new(),
            overrides: HashMap::new(),
            default_status,
        }
    }

    /// Build a registry from name → URL pairs.
    pub fn from_urls<I, N, U>(default_status: u16, urls: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut registry = Self::new(default_status);
        for (name, url) in urls {
            registry.insert(CheckTarget::new(name, url));
        }
        registry
    }

    /// Add a target, replacing any previous target with the same name.
    pub fn insert(&mut self, target: CheckTarget) -> Option<CheckTarget> {
        self.targets.insert(target.name.clone(), target)
    }

    /// Override the expected status for one target.
    pub fn set_expected_status(&mut self, name: impl Into<String>, status: u16) {
        self.overrides.insert(name.into(), status);
    }

    /// Builder-style variant of [`Registry::set_expected_status`].
    pub fn with_expected_status(mut self, name: impl Into<String>, status: u16) -> Self {
        self.set_expected_status(name, status);
        self
    }

    /// Expected status for `name`: its override if present, else the default.
    pub fn expected_status(&self, name: &str) -> u16 {
        self.overrides
            .get(name)
            .copied()
            .unwrap_or(self.default_status)
    }

    pub fn default_status(&self) -> u16 {
        self.default_status
    }

    pub fn get(&self, name: &str) -> Option<&CheckTarget> {
        self.targets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Targets in name order.
    pub fn targets(&self) -> impl Iterator<Item = &CheckTarget> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
