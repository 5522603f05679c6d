//! Probe execution: one HTTP GET, timed and classified.

use crate::store::ResultStore;
use crate::types::{CheckOutcome, CheckTarget, EngineConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Failure to obtain any response from a target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Operation timed out after {} milliseconds", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Request(String),
}

/// Capability to perform a GET and report the response status.
///
/// The engine treats the HTTP client as opaque; anything that can turn a URL
/// into a status code (or a transport error) can drive a run.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET against `url` and return the response status code.
    async fn get(&self, url: &str) -> Result<u16, TransportError>;

    /// Get the name of this transport
    fn name(&self) -> &str;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the HTTP client. Fails when the client cannot be constructed,
    /// which must abort the run before any probing.
    pub fn new(config: &EngineConfig) -> common::Result<Self> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for probes");
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(common::Error::transport)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        let mut response = self.client.get(url).send().await.map_err(classify_reqwest)?;
        let status = response.status().as_u16();

        // Elapsed time covers the transfer; chunks are dropped as they arrive.
        loop {
            match response.chunk().await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    debug!(url, error = %e, "Failed to read response body");
                    break;
                }
            }
        }

        Ok(status)
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn classify_reqwest(e: reqwest::Error) -> TransportError {
    TransportError::Request(error_chain(&e))
}

/// Flatten an error and its sources into one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// Runs single probes against targets.
pub struct Prober {
    transport: Arc<dyn HttpTransport>,
    timeout_duration: Duration,
}

impl Prober {
    /// Create a new prober
    pub fn new(transport: Arc<dyn HttpTransport>, timeout_duration: Duration) -> Self {
        Self {
            transport,
            timeout_duration,
        }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Probe one target and classify the result. Never retries.
    pub async fn probe(&self, target: &CheckTarget, expected_status: u16) -> CheckOutcome {
        let start = Instant::now();

        match timeout(self.timeout_duration, self.transport.get(&target.url)).await {
            Ok(Ok(status)) if status == expected_status => {
                let duration = start.elapsed();
                debug!(name = %target.name, url = %target.url, status,
                       duration_ms = duration.as_millis() as u64, "Probe successful");
                CheckOutcome::success(duration)
            }
            Ok(Ok(status)) => {
                warn!(name = %target.name, url = %target.url, status, expected = expected_status,
                      "Probe failed: unexpected status code");
                CheckOutcome::status_mismatch(status)
            }
            Ok(Err(e)) => {
                warn!(name = %target.name, url = %target.url, error = %e, "Probe failed");
                CheckOutcome::unreachable(e.to_string())
            }
            Err(_) => {
                warn!(name = %target.name, url = %target.url, "Probe timed out");
                CheckOutcome::unreachable(TransportError::Timeout(self.timeout_duration).to_string())
            }
        }
    }

    /// Probe one target and write its outcome into `store`, replacing any
    /// previous outcome for that name.
    pub async fn probe_into(
        &self,
        target: &CheckTarget,
        expected_status: u16,
        store: &ResultStore,
    ) -> CheckOutcome {
        let outcome = self.probe(target, expected_status).await;
        store.record(&target.name, outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActualStatus;

    struct FixedTransport(Result<u16, TransportError>);

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn get(&self, _url: &str) -> Result<u16, TransportError> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn get(&self, _url: &str) -> Result<u16, TransportError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn prober(result: Result<u16, TransportError>) -> Prober {
        Prober::new(Arc::new(FixedTransport(result)), Duration::from_secs(1))
    }

    fn target() -> CheckTarget {
        CheckTarget::new("api", "http://api.internal/health")
    }

    #[tokio::test]
    async fn test_matching_status_is_success() {
        let outcome = prober(Ok(200)).probe(&target(), 200).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_mismatched_status_has_empty_error() {
        let outcome = prober(Ok(503)).probe(&target(), 200).await;
        assert_eq!(
            outcome,
            CheckOutcome::Failure {
                actual_status: ActualStatus::Code(503),
                error: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_non_default_expected_status() {
        // A redirect is a success when that is what the target should return
        let outcome = prober(Ok(301)).probe(&target(), 301).await;
        assert!(outcome.is_success());

        let outcome = prober(Ok(200)).probe(&target(), 301).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_transport_error_is_unreachable() {
        let outcome = prober(Err(TransportError::Request("connection refused".into())))
            .probe(&target(), 200)
            .await;
        assert_eq!(outcome, CheckOutcome::unreachable("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_transport_times_out() {
        let prober = Prober::new(Arc::new(HangingTransport), Duration::from_millis(250));
        let outcome = prober.probe(&target(), 200).await;

        match outcome {
            CheckOutcome::Failure { actual_status, error } => {
                assert_eq!(actual_status, ActualStatus::Unreachable);
                assert!(error.contains("timed out"), "unexpected error text: {error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_into_overwrites_store() {
        let store = ResultStore::new();
        store.record("api", CheckOutcome::status_mismatch(500));

        prober(Ok(200)).probe_into(&target(), 200, &store).await;

        assert!(store.get("api").unwrap().is_success());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        // This will fail without a listener, which is what we want
        let transport = ReqwestTransport::new(&EngineConfig {
            timeout: Duration::from_millis(500),
            ..EngineConfig::default()
        })
        .unwrap();

        let result = transport.get("http://127.0.0.1:1/health").await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    #[test]
    fn test_timeout_error_text() {
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(5)).to_string(),
            "Operation timed out after 5000 milliseconds"
        );
    }
}
