//! Concurrent HTTP availability checking with flap suppression.
//!
//! This crate probes a set of named HTTP(S) endpoints and classifies each
//! against an expected status code:
//! - bounded-parallel dispatch with first-completion admission
//! - a shared, concurrency-safe result store keyed by target name
//! - a single delayed re-check of failures before they are reported
//!
//! # Example
//!
//! ```no_run
//! use statuscheck::{Engine, EngineConfig, Registry};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::from_urls(200, [("api", "https://api.example.com/health")])
//!     .with_expected_status("api", 204);
//!
//! let config = EngineConfig {
//!     timeout: Duration::from_secs(3),
//!     retry_delay: Duration::from_secs(5),
//!     max_in_flight: 8,
//!     ..EngineConfig::default()
//! };
//!
//! let engine = Engine::with_reqwest(config, registry)?;
//! let result = engine.run().await;
//!
//! for (name, outcome) in result.failed() {
//!     println!("{name}: {outcome}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod engine;
pub mod probe;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod types;

pub use dispatcher::Dispatcher;
pub use engine::{Engine, RunResult};
pub use probe::{HttpTransport, Prober, ReqwestTransport, TransportError};
pub use reconciler::{ReconcileSummary, Reconciler};
pub use registry::{DEFAULT_EXPECTED_STATUS, Registry};
pub use store::ResultStore;
pub use types::{ActualStatus, CheckOutcome, CheckTarget, EngineConfig, RunTiming};
