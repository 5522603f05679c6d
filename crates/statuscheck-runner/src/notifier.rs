//! Callback and chat notifications for targets that stayed down.

use crate::metrics::MetricsRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use statuscheck::{CheckOutcome, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delivery failure. Logged, never propagated to the run's outcome.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("Alert task failed: {0}")]
    Task(String),
}

/// Notifier settings
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Endpoint receiving one JSON object per failed target
    pub callback_url: Option<String>,

    /// Extra callback attempts after the first
    pub callback_retries: u32,

    /// Pause between callback attempts
    pub callback_retry_delay: Duration,

    /// Send chat alerts for failed targets
    pub alerts_enabled: bool,

    /// Slack-compatible incoming webhook
    pub alert_webhook_url: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// How long shutdown waits for in-flight alerts
    pub alert_drain_timeout: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            callback_url: None,
            callback_retries: 3,
            callback_retry_delay: Duration::from_secs(1),
            alerts_enabled: false,
            alert_webhook_url: None,
            timeout: Duration::from_secs(10),
            alert_drain_timeout: Duration::from_secs(15),
        }
    }
}

impl NotifierConfig {
    /// Nothing to deliver: no callback and no alerts.
    pub fn is_disabled(&self) -> bool {
        self.callback_url.is_none() && !self.alerts_enabled
    }
}

/// JSON body POSTed to the callback URL for each failed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub url: String,
    pub name: String,
    pub expected_status: String,
    pub actual_status: String,
    pub error: String,
}

impl CallbackPayload {
    /// Build the payload for a failed outcome; `None` for successes.
    pub fn from_outcome(name: &str, url: &str, expected: u16, outcome: &CheckOutcome) -> Option<Self> {
        match outcome {
            CheckOutcome::Success { .. } => None,
            CheckOutcome::Failure {
                actual_status,
                error,
            } => Some(Self {
                url: url.to_string(),
                name: name.to_string(),
                expected_status: expected.to_string(),
                actual_status: actual_status.to_string(),
                error: error.clone(),
            }),
        }
    }

    /// Chat message announcing the failure.
    pub fn alert_message(&self) -> String {
        let error = if self.error.is_empty() {
            statuscheck::types::STATUS_MISMATCH_MESSAGE
        } else {
            self.error.as_str()
        };
        format!(
            ":warning: *{}* is down\nURL: {}\nStatus: {} (expected {})\nError: {}",
            self.name, self.url, self.actual_status, self.expected_status, error
        )
    }
}

/// Somewhere JSON can be POSTed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), NotifyError>;
}

/// reqwest-backed sink
pub struct ReqwestSink {
    client: reqwest::Client,
}

impl ReqwestSink {
    pub fn new(timeout: Duration) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(common::Error::transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSink for ReqwestSink {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Chat alerts still in flight after [`Notifier::notify`] returns.
pub struct PendingAlerts {
    tasks: JoinSet<(String, Result<(), NotifyError>)>,
    drain_timeout: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

/// Outcome of waiting for chat alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub sent: usize,
    pub failed: usize,
    /// Still running when the drain timeout expired
    pub abandoned: usize,
}

impl PendingAlerts {
    fn empty() -> Self {
        Self {
            tasks: JoinSet::new(),
            drain_timeout: Duration::ZERO,
            metrics: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait up to the drain timeout for alerts, logging every failure.
    pub async fn drain(mut self) -> AlertSummary {
        let mut summary = AlertSummary::default();
        if self.tasks.is_empty() {
            return summary;
        }

        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(Ok((name, Ok(()))))) => {
                    debug!(name = %name, "Alert delivered");
                    summary.sent += 1;
                    self.record("alert", "success");
                }
                Ok(Some(Ok((name, Err(e))))) => {
                    warn!(name = %name, error = %e, "Failed to send alert");
                    summary.failed += 1;
                    self.record("alert", "failure");
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %NotifyError::Task(e.to_string()), "Alert task failed");
                    summary.failed += 1;
                    self.record("alert", "failure");
                }
                Ok(None) => break,
                Err(_) => {
                    summary.abandoned = self.tasks.len();
                    warn!(abandoned = summary.abandoned, "Gave up waiting for alerts");
                    self.tasks.abort_all();
                    break;
                }
            }
        }

        summary
    }

    fn record(&self, kind: &str, result: &str) {
        if let Some(ref m) = self.metrics {
            m.record_notification(kind, result);
        }
    }
}

/// Sends callbacks and chat alerts for the final failed set.
pub struct Notifier {
    config: NotifierConfig,
    sink: Arc<dyn WebhookSink>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Notifier {
    /// Create a new notifier
    pub fn new(
        config: NotifierConfig,
        sink: Arc<dyn WebhookSink>,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        Self {
            config,
            sink,
            metrics,
        }
    }

    /// Notifier delivering over HTTP.
    pub fn with_reqwest(
        config: NotifierConfig,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> common::Result<Self> {
        let sink = Arc::new(ReqwestSink::new(config.timeout)?);
        Ok(Self::new(config, sink, metrics))
    }

    /// Deliver callbacks for every failed target and launch chat alerts.
    ///
    /// Callbacks complete before this returns; alerts run in the background
    /// and are handed back for draining.
    pub async fn notify(
        &self,
        failed: &BTreeMap<String, CheckOutcome>,
        registry: &Registry,
    ) -> PendingAlerts {
        if self.config.is_disabled() {
            debug!("Notifications disabled");
            return PendingAlerts::empty();
        }

        let mut pending = PendingAlerts {
            tasks: JoinSet::new(),
            drain_timeout: self.config.alert_drain_timeout,
            metrics: self.metrics.clone(),
        };

        let mut payloads = Vec::with_capacity(failed.len());
        for (name, outcome) in failed {
            let Some(target) = registry.get(name) else {
                warn!(name = %name, "Failed outcome for unknown target, not notifying");
                continue;
            };
            if let Some(payload) = CallbackPayload::from_outcome(
                name,
                &target.url,
                registry.expected_status(name),
                outcome,
            ) {
                payloads.push(payload);
            }
        }

        // Alerts go out before any callback so retries cannot hold them back
        if self.config.alerts_enabled {
            match self.config.alert_webhook_url.as_deref() {
                Some(webhook) => {
                    for payload in &payloads {
                        let sink = self.sink.clone();
                        let webhook = webhook.to_string();
                        let body = serde_json::json!({ "text": payload.alert_message() });
                        let name = payload.name.clone();
                        pending.tasks.spawn(async move {
                            let result = sink.post_json(&webhook, &body).await;
                            (name, result)
                        });
                    }
                }
                None => warn!("Alerts enabled but no webhook configured"),
            }
        }

        if let Some(ref url) = self.config.callback_url {
            for payload in &payloads {
                match self.deliver_callback(url, payload).await {
                    Ok(()) => {
                        info!(name = %payload.name, "Callback delivered");
                        self.record("callback", "success");
                    }
                    Err(e) => {
                        warn!(name = %payload.name, error = %e, "Failed to deliver callback");
                        self.record("callback", "failure");
                    }
                }
            }
        }

        pending
    }

    /// POST one payload with bounded retries.
    async fn deliver_callback(&self, url: &str, payload: &CallbackPayload) -> Result<(), NotifyError> {
        let body = serde_json::to_value(payload).map_err(|e| NotifyError::Request(e.to_string()))?;
        let attempts = self.config.callback_retries + 1;

        let mut attempt = 1;
        loop {
            match self.sink.post_json(url, &body).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    debug!(name = %payload.name, attempt, error = %e, "Callback attempt failed, retrying");
                    attempt += 1;
                    sleep(self.config.callback_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record(&self, kind: &str, result: &str) {
        if let Some(ref m) = self.metrics {
            m.record_notification(kind, result);
        }
    }
}
