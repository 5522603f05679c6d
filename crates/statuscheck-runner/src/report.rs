//! Status report rendering.
//!
//! A report is built once from the final result store and rendered as HTML
//! (written to disk) or plain text (printed). Building never mutates the store.

use askama::Template;
use chrono::{DateTime, Local};
use serde::Serialize;
use statuscheck::{CheckOutcome, Registry, ResultStore, RunTiming};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// One row of the failure table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCheck {
    pub name: String,
    pub url: String,
    pub actual_status: String,
    pub expected_status: u16,
    pub error: String,
}

/// One success badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassedCheck {
    pub name: String,
    pub url: String,
    pub duration_ms: u64,
}

/// Everything a rendered report shows.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub total_targets: usize,
    pub failed: Vec<FailedCheck>,
    pub passed: Vec<PassedCheck>,
    pub run_duration_ms: u64,
}

impl StatusReport {
    /// Build a report from final run state, stamped with the current time.
    pub fn build(title: &str, store: &ResultStore, registry: &Registry, timing: RunTiming) -> Self {
        Self::build_at(title, store, registry, timing, Local::now())
    }

    pub fn build_at(
        title: &str,
        store: &ResultStore,
        registry: &Registry,
        timing: RunTiming,
        generated_at: DateTime<Local>,
    ) -> Self {
        let mut failed = Vec::new();
        let mut passed = Vec::new();

        for (name, outcome) in store.snapshot() {
            let url = registry
                .get(&name)
                .map(|target| target.url.clone())
                .unwrap_or_default();

            match &outcome {
                CheckOutcome::Success { duration_ms } => passed.push(PassedCheck {
                    name,
                    url,
                    duration_ms: *duration_ms,
                }),
                CheckOutcome::Failure { actual_status, .. } => failed.push(FailedCheck {
                    expected_status: registry.expected_status(&name),
                    actual_status: actual_status.to_string(),
                    error: outcome.error_text().unwrap_or_default().to_string(),
                    name,
                    url,
                }),
            }
        }

        Self {
            title: title.to_string(),
            generated_at,
            total_targets: registry.len(),
            failed,
            passed,
            run_duration_ms: timing.duration_ms(),
        }
    }

    pub fn is_all_clear(&self) -> bool {
        self.failed.is_empty()
    }

    fn summary_line(&self) -> String {
        if self.is_all_clear() {
            format!("0 failures. All {} services are up.", self.total_targets)
        } else {
            format!(
                "{} of {} services failed. Each failure was confirmed by a second check.",
                self.failed.len(),
                self.total_targets
            )
        }
    }

    fn footer_line(&self) -> String {
        format!(
            "Generated {} in {} ms",
            self.generated_at.format("%Y-%m-%d %H:%M:%S %:z"),
            self.run_duration_ms
        )
    }

    /// Render as a standalone HTML document.
    pub fn render_html(&self) -> Result<String, askama::Error> {
        StatusPage {
            title: &self.title,
            summary: self.summary_line(),
            all_clear: self.is_all_clear(),
            failed: &self.failed,
            passed: &self.passed,
            footer: self.footer_line(),
        }
        .render()
    }

    /// Render as plain text for a terminal.
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{}", self.title);
        let _ = writeln!(text, "{}", self.summary_line());

        for check in &self.failed {
            let _ = writeln!(
                text,
                "  DOWN {:<24} {}/{}  {}",
                check.name, check.actual_status, check.expected_status, check.error
            );
        }
        for check in &self.passed {
            let _ = writeln!(text, "  UP   {:<24} {} ms", check.name, check.duration_ms);
        }

        let _ = writeln!(text, "{}", self.footer_line());
        text
    }

    /// Write the HTML rendering to `path`, replacing any previous report.
    pub fn write_html(&self, path: &Path) -> common::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let html = self
            .render_html()
            .map_err(|e| common::Error::report(format!("template: {e}")))?;

        let tmp = path.with_extension("html.tmp");
        std::fs::write(&tmp, html)?;
        std::fs::rename(&tmp, path)?;

        info!(path = %path.display(), failed = self.failed.len(), "Report written");
        Ok(())
    }
}

/// Render the HTML report for a finished run.
pub fn render(
    title: &str,
    store: &ResultStore,
    registry: &Registry,
    timing: RunTiming,
) -> Result<String, askama::Error> {
    StatusReport::build(title, store, registry, timing).render_html()
}

/// Template view over a [`StatusReport`]; askama escapes every field.
#[derive(Template)]
#[template(path = "status.html")]
struct StatusPage<'a> {
    title: &'a str,
    summary: String,
    all_clear: bool,
    failed: &'a [FailedCheck],
    passed: &'a [PassedCheck],
    footer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use statuscheck::CheckTarget;
    use std::time::Duration;

    fn timing() -> RunTiming {
        RunTiming {
            start_ms: 10_000,
            end_ms: 15_321,
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_registry_is_all_clear() {
        let report = StatusReport::build_at(
            "Status",
            &ResultStore::new(),
            &Registry::default(),
            timing(),
            fixed_time(),
        );

        assert!(report.is_all_clear());
        assert_eq!(report.total_targets, 0);
        let html = report.render_html().unwrap();
        assert!(html.contains("0 failures. All 0 services are up."));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_single_success_badge() {
        let registry = Registry::from_urls(200, [("a", "http://a.local")]);
        let store = ResultStore::new();
        store.record("a", CheckOutcome::success(Duration::from_millis(87)));

        let report = StatusReport::build_at("Status", &store, &registry, timing(), fixed_time());
        assert!(report.failed.is_empty());
        assert_eq!(
            report.passed,
            vec![PassedCheck {
                name: "a".into(),
                url: "http://a.local".into(),
                duration_ms: 87,
            }]
        );

        let html = report.render_html().unwrap();
        assert!(html.contains("0 failures. All 1 services are up."));
        assert!(html.contains(">a 87 ms</span>"));
        assert!(html.contains("in 5321 ms"));
    }

    #[test]
    fn test_failure_rows() {
        let mut registry = Registry::new(200);
        registry.insert(CheckTarget::new("api", "https://api.local"));
        registry.insert(CheckTarget::new("db", "https://db.local"));
        registry.insert(CheckTarget::new("web", "https://web.local"));
        let registry = registry.with_expected_status("web", 301);

        let store = ResultStore::new();
        store.record("api", CheckOutcome::status_mismatch(500));
        store.record("db", CheckOutcome::unreachable("connection refused"));
        store.record("web", CheckOutcome::success(Duration::from_millis(12)));

        let report = StatusReport::build_at("Status", &store, &registry, timing(), fixed_time());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].name, "api");
        assert_eq!(report.failed[0].actual_status, "500");
        assert_eq!(report.failed[0].expected_status, 200);
        assert_eq!(report.failed[0].error, "Status code does not match expected code");
        assert_eq!(report.failed[1].actual_status, "000");
        assert_eq!(report.failed[1].error, "connection refused");

        let html = report.render_html().unwrap();
        assert!(html.contains("2 of 3 services failed"));
        assert!(html.contains("<td>500/200</td>"));
        assert!(html.contains("<td>000/200</td>"));

        let text = report.render_text();
        assert!(text.contains("DOWN api"));
        assert!(text.contains("UP   web"));
    }

    #[test]
    fn test_render_does_not_mutate_store() {
        let registry = Registry::from_urls(200, [("a", "http://a")]);
        let store = ResultStore::new();
        store.record("a", CheckOutcome::status_mismatch(503));
        let before = store.snapshot();

        let _ = render("Status", &store, &registry, timing()).unwrap();

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_html_is_escaped() {
        let registry = Registry::from_urls(200, [("<script>", "http://x/?a=1&b=2")]);
        let store = ResultStore::new();
        store.record("<script>", CheckOutcome::unreachable("bad \"quote\""));

        let html = StatusReport::build_at("A & B", &store, &registry, timing(), fixed_time())
            .render_html()
            .unwrap();
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a=1&amp;b=2"));
        assert!(html.contains("bad &"));
        assert!(!html.contains("bad \"quote\""));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_write_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/status.html");
        let report = StatusReport::build_at(
            "Status",
            &ResultStore::new(),
            &Registry::default(),
            timing(),
            fixed_time(),
        );

        report.write_html(&path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
    }
}
