//! Check targets, outcomes and engine configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default explanation shown when a response arrived with the wrong status.
pub const STATUS_MISMATCH_MESSAGE: &str = "Status code does not match expected code";

/// A named endpoint to be health-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTarget {
    /// Unique key of the target
    pub name: String,

    /// URL probed with a GET request
    pub url: String,
}

impl CheckTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Observed status of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActualStatus {
    /// A response arrived with this status code
    Code(u16),
    /// No response was obtained (DNS, refused connection, timeout)
    Unreachable,
}

impl fmt::Display for ActualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActualStatus::Code(code) => write!(f, "{}", code),
            // curl reports "000" when no response was received
            ActualStatus::Unreachable => write!(f, "000"),
        }
    }
}

/// Classified result of one probe attempt for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Success {
        duration_ms: u64,
    },
    Failure {
        actual_status: ActualStatus,
        /// Transport error text, empty on a status mismatch
        error: String,
    },
}

impl CheckOutcome {
    pub fn success(duration: Duration) -> Self {
        CheckOutcome::Success {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// A response was obtained but its code did not match.
    pub fn status_mismatch(actual: u16) -> Self {
        CheckOutcome::Failure {
            actual_status: ActualStatus::Code(actual),
            error: String::new(),
        }
    }

    /// No response was obtained.
    pub fn unreachable(error: impl Into<String>) -> Self {
        CheckOutcome::Failure {
            actual_status: ActualStatus::Unreachable,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Error text for display; falls back to the mismatch explanation.
    pub fn error_text(&self) -> Option<&str> {
        match self {
            CheckOutcome::Success { .. } => None,
            CheckOutcome::Failure { error, .. } if error.is_empty() => Some(STATUS_MISMATCH_MESSAGE),
            CheckOutcome::Failure { error, .. } => Some(error.as_str()),
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Success { duration_ms } => write!(f, "UP ({}ms)", duration_ms),
            CheckOutcome::Failure { actual_status, .. } => write!(
                f,
                "DOWN ({}: {})",
                actual_status,
                self.error_text().unwrap_or_default()
            ),
        }
    }
}

/// Wall-clock bounds of a whole run, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTiming {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl RunTiming {
    /// Total run duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Immutable engine settings, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-probe timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay before the single re-check pass
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Maximum number of probes in flight
    pub max_in_flight: usize,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,

    /// User-Agent header sent with probes
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
            max_in_flight: 10,
            accept_invalid_certs: true,
            user_agent: concat!("statuscheck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
