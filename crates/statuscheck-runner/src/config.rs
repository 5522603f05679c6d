//! Configuration loading and validation for statuscheck runs

use crate::notifier::NotifierConfig;
use serde::{Deserialize, Serialize};
use statuscheck::{CheckTarget, DEFAULT_EXPECTED_STATUS, EngineConfig, Registry};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found in search paths")]
    FileNotFound,

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl From<ConfigError> for common::Error {
    fn from(e: ConfigError) -> Self {
        common::Error::config(e)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Report title
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub checks: CheckSettings,

    /// Target name → URL
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    /// Per-target expected status overrides
    #[serde(default)]
    pub expected_status: BTreeMap<String, u16>,

    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub notify: NotifySettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.checks.validate()?;
        self.notify.validate()?;

        let mut errors = ValidationErrors::new();

        for (name, url) in &self.targets {
            if name.trim().is_empty() {
                errors.add("targets", ValidationError::new("target_name_empty"));
            } else if name.trim() != name {
                // Names are registry keys and must match overrides exactly
                let mut e = ValidationError::new("target_name_whitespace");
                e.add_param(Cow::from("target"), name);
                errors.add("targets", e);
            }
            if let Err(mut e) = validate_http_url(url) {
                e.add_param(Cow::from("target"), name);
                errors.add("targets", e);
            }
        }

        for (name, code) in &self.expected_status {
            if !self.targets.contains_key(name) {
                let mut e = ValidationError::new("expected_status_unknown_target");
                e.add_param(Cow::from("target"), name);
                errors.add("expected_status", e);
            }
            if validate_status_code(*code).is_err() {
                let mut e = ValidationError::new("expected_status_out_of_range");
                e.add_param(Cow::from("target"), name);
                errors.add("expected_status", e);
            }
        }

        if let Some(url) = &self.notify.callback_url {
            if let Err(e) = validate_http_url(url) {
                errors.add("callback_url", e);
            }
        }

        match (&self.notify.alert_webhook_url, self.notify.alerts_enabled) {
            (Some(url), _) => {
                if let Err(e) = validate_http_url(url) {
                    errors.add("alert_webhook_url", e);
                }
            }
            (None, true) => {
                errors.add("alert_webhook_url", ValidationError::new("alert_webhook_missing"));
            }
            (None, false) => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Probe and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CheckSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub timeout: Duration,

    #[validate(range(min = 1, max = 1024))]
    pub max_concurrent: usize,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_retry_delay")]
    pub retry_delay: Duration,

    #[validate(range(min = 100, max = 599))]
    pub default_status: u16,

    /// Skip TLS certificate verification for probes
    pub accept_invalid_certs: bool,

    #[validate(length(min = 1))]
    pub user_agent: String,
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Where the HTML report is written
    pub path: PathBuf,

    /// Also print a plain-text summary to stdout
    pub print_summary: bool,
}

/// Callback and chat alert settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifySettings {
    pub callback_url: Option<String>,

    #[validate(range(max = 10))]
    pub callback_retries: u32,

    #[serde(with = "humantime_serde")]
    pub callback_retry_delay: Duration,

    pub alerts_enabled: bool,

    pub alert_webhook_url: Option<String>,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_timeout")]
    pub timeout: Duration,

    /// How long shutdown waits for in-flight chat alerts
    #[serde(with = "humantime_serde")]
    pub alert_drain_timeout: Duration,
}

/// Metrics settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Prometheus textfile written at the end of a run
    pub textfile_path: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

fn default_title() -> String {
    "Service Status".to_string()
}

impl Default for CheckSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            timeout: engine.timeout,
            max_concurrent: engine.max_in_flight,
            retry_delay: engine.retry_delay,
            default_status: DEFAULT_EXPECTED_STATUS,
            accept_invalid_certs: engine.accept_invalid_certs,
            user_agent: engine.user_agent,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("status.html"),
            print_summary: true,
        }
    }
}

impl Default for NotifySettings {
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

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            checks: CheckSettings::default(),
            targets: BTreeMap::new(),
            expected_status: BTreeMap::new(),
            report: ReportSettings::default(),
            notify: NotifySettings::default(),
            metrics: MetricsSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// Custom validators

fn validate_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 1 || millis > 600_000 {
        return Err(ValidationError::new("timeout_out_of_range"));
    }
    Ok(())
}

fn validate_retry_delay(delay: &Duration) -> Result<(), ValidationError> {
    if delay.as_secs() > 3600 {
        return Err(ValidationError::new("retry_delay_out_of_range"));
    }
    Ok(())
}

fn validate_status_code(code: u16) -> Result<(), ValidationError> {
    if !(100..=599).contains(&code) {
        return Err(ValidationError::new("status_code_out_of_range"));
    }
    Ok(())
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    if url.trim() != url {
        return Err(ValidationError::new("url_surrounding_whitespace"));
    }

    let parsed = Url::parse(url).map_err(|e| {
        let mut err = ValidationError::new("url_invalid_format");
        err.add_param(Cow::from("reason"), &e.to_string());
        err
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::new("url_unsupported_scheme"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new("url_missing_host"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `path`, or from the default search paths.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)
            }
            None => match Self::find_config_file() {
                Some(path) => {
                    tracing::info!("Loading configuration from: {}", path.display());
                    Self::load_from_file(&path)
                }
                None => Err(ConfigError::FileNotFound),
            },
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        Self::search_paths()
            .into_iter()
            .find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Candidate configuration paths, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/statuscheck/statuscheck.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./statuscheck.yaml"));
        paths
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/statuscheck/statuscheck.yaml"))
    }

    /// Engine settings for a run
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            timeout: self.checks.timeout,
            retry_delay: self.checks.retry_delay,
            max_in_flight: self.checks.max_concurrent,
            accept_invalid_certs: self.checks.accept_invalid_certs,
            user_agent: self.checks.user_agent.clone(),
        }
    }

    /// Target registry with expected-status overrides applied
    pub fn to_registry(&self) -> Registry {
        let mut registry = Registry::new(self.checks.default_status);
        for (name, url) in &self.targets {
            registry.insert(CheckTarget::new(name.as_str(), url.as_str()));
        }
        for (name, code) in &self.expected_status {
            registry.set_expected_status(name, *code);
        }
        registry
    }

    /// Notifier settings
    pub fn to_notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            callback_url: self.notify.callback_url.clone(),
            callback_retries: self.notify.callback_retries,
            callback_retry_delay: self.notify.callback_retry_delay,
            alerts_enabled: self.notify.alerts_enabled,
            alert_webhook_url: self.notify.alert_webhook_url.clone(),
            timeout: self.notify.timeout,
            alert_drain_timeout: self.notify.alert_drain_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_yaml_parsing() {
        let yaml = r#"
title: "Production"

checks:
  timeout: 3s
  max_concurrent: 4
  retry_delay: 5s
  default_status: 200
  accept_invalid_certs: false

targets:
  api: https://api.example.com/health
  docs: https://docs.example.com

expected_status:
  docs: 301

notify:
  callback_url: https://hooks.example.com/status
  callback_retries: 2
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.title, "Production");
        assert_eq!(config.checks.timeout, Duration::from_secs(3));
        assert_eq!(config.checks.max_concurrent, 4);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.notify.callback_retries, 2);

        let registry = config.to_registry();
        assert_eq!(registry.expected_status("api"), 200);
        assert_eq!(registry.expected_status("docs"), 301);
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
targets:
  api: http://localhost:8080/health
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.title, "Service Status");
        assert_eq!(config.checks.max_concurrent, 10);
        assert_eq!(config.checks.default_status, 200);
        assert!(config.checks.accept_invalid_certs);
        assert_eq!(config.report.path, PathBuf::from("status.html"));
        assert!(config.notify.callback_url.is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let yaml = r#"
checks:
  retry_delay: 250ms
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.checks.retry_delay, Duration::from_millis(250));
        assert_eq!(config.checks.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_max_concurrent() {
        let yaml = r#"
checks:
  max_concurrent: 0  # Invalid: < 1
"#;
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_timeout() {
        let yaml = r#"
checks:
  timeout: 0ms
"#;
        assert!(Config::from_yaml(yaml).is_err());

        let yaml = r#"
checks:
  timeout: 15m  # Invalid: > 10m
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_target_url() {
        let yaml = r#"
targets:
  api: ftp://files.example.com
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_override_for_unknown_target_rejected() {
        let yaml = r#"
targets:
  api: https://api.example.com
expected_status:
  apii: 204
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_override_out_of_range_rejected() {
        let yaml = r#"
targets:
  api: https://api.example.com
expected_status:
  api: 42
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_alerts_require_webhook() {
        let yaml = r#"
notify:
  alerts_enabled: true
"#;
        assert!(Config::from_yaml(yaml).is_err());

        let yaml = r#"
notify:
  alerts_enabled: true
  alert_webhook_url: https://hooks.slack.com/services/T000/B000/XXX
"#;
        assert!(Config::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_url_validation() {
        // Valid URLs
        assert!(validate_http_url("http://localhost:8080/health").is_ok());
        assert!(validate_http_url("https://example.com").is_ok());

        // Invalid URLs
        assert!(validate_http_url("").is_err());
        assert!(validate_http_url("example.com").is_err());
        assert!(validate_http_url("https://").is_err());
        assert!(validate_http_url("ftp://example.com/file").is_err());
        assert!(validate_http_url(" https://example.com").is_err());
    }

    #[test]
    fn test_malformed_target_urls_rejected() {
        for url in [
            "http://exa mple.com/",
            "http://[::1",
            "https://host:99999/",
            "http://a b c",
        ] {
            let yaml = format!("targets:\n  a: '{url}'\n");
            assert!(Config::from_yaml(&yaml).is_err(), "accepted {url:?}");
        }

        assert!(Config::from_yaml("targets:\n  a: 'http://[::1]:8080/health'\n").is_ok());
    }

    #[test]
    fn test_target_names_with_surrounding_whitespace_rejected() {
        let yaml = r#"
targets:
  'api': https://api.example.com
  'api ': https://api2.example.com
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_registry_keeps_every_target() {
        let yaml = r#"
targets:
  api: https://api.example.com
  api-v2: https://api2.example.com
expected_status:
  api-v2: 204
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let registry = config.to_registry();
        assert_eq!(registry.len(), config.targets.len());
        assert_eq!(registry.expected_status("api-v2"), 204);
        assert_eq!(registry.expected_status("api"), 200);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load(Some(Path::new("/nonexistent/statuscheck.yaml")));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statuscheck.yaml");
        std::fs::write(&path, "targets:\n  web: https://example.com\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.targets["web"], "https://example.com");
    }

    #[test]
    fn test_config_to_engine_config_conversion() {
        let config = Config::default();
        let engine = config.to_engine_config();

        assert_eq!(engine.timeout, Duration::from_secs(5));
        assert_eq!(engine.retry_delay, Duration::from_secs(5));
        assert_eq!(engine.max_in_flight, 10);
        assert!(engine.accept_invalid_certs);
    }

    #[test]
    fn test_search_paths_end_with_working_directory() {
        let paths = Config::search_paths();
        assert_eq!(paths.first().unwrap(), &PathBuf::from("/etc/statuscheck/statuscheck.yaml"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from("./statuscheck.yaml"));
    }
}
