//! statuscheck runner
//!
//! Loads a YAML target list, runs the statuscheck engine once, writes an
//! HTML status report and notifies external systems about targets that are
//! still down after the re-check.
//!
//! # Components
//!
//! - **Config**: YAML loading, validation, conversion into engine settings
//! - **Runner**: one end-to-end run
//! - **Report**: HTML and plain-text rendering of the final state
//! - **Notifier**: JSON callbacks and chat alerts for persistent failures
//! - **Metrics**: Prometheus textfile output

pub mod config;
pub mod metrics;
pub mod notifier;
pub mod report;
pub mod runner;

pub use config::{Config, ConfigError};
pub use metrics::MetricsRegistry;
pub use notifier::{CallbackPayload, Notifier, NotifierConfig, WebhookSink};
pub use report::StatusReport;
pub use runner::{RunSummary, StatusRunner};
