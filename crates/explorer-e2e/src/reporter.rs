//! Run reports: JSON and JUnit XML.

use crate::harness::{RunReport, TestResult};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// The serialized [`RunReport`]
    Json,
    /// JUnit XML, one `<testsuite>` per suite
    Junit,
}

impl ReportFormat {
    /// Conventional file extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Junit => "xml",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Junit => write!(f, "junit"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "junit" | "xml" => Ok(Self::Junit),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// Render a report in `format`
///
/// # Errors
///
/// Returns error if JSON serialization fails
pub fn render(report: &RunReport, format: ReportFormat) -> HarnessResult<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Junit => Ok(render_junit(report)),
    }
}

/// Render and write a report file, creating parent directories
///
/// # Errors
///
/// Returns error if rendering or writing fails
pub fn write_report(report: &RunReport, format: ReportFormat, path: &Path) -> HarnessResult<()> {
    let body = render(report, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body).map_err(HarnessError::from)
}

/// Render JUnit XML
#[must_use]
pub fn render_junit(report: &RunReport) -> String {
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuites tests="{}" failures="{}" time="{:.3}" timestamp="{}">"#,
        report.total(),
        report.failed(),
        report.duration.as_secs_f64(),
        report.started_at.format("%Y-%m-%dT%H:%M:%S")
    ));
    xml.push('\n');

    for suite in &report.suites {
        xml.push_str(&format!(
            r#"  <testsuite name="{}" tests="{}" failures="{}" time="{:.3}">"#,
            escape_xml(&suite.suite_name),
            suite.total(),
            suite.failed_count(),
            suite.duration.as_secs_f64()
        ));
        xml.push('\n');
        for result in &suite.results {
            push_case(&mut xml, result);
        }
        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

fn push_case(xml: &mut String, result: &TestResult) {
    xml.push_str(&format!(
        r#"    <testcase classname="{}" name="{}" time="{:.3}">"#,
        escape_xml(&result.suite),
        escape_xml(&result.name),
        result.duration.as_secs_f64()
    ));
    xml.push('\n');

    if let Some(error) = result.error() {
        let first_line = error.lines().next().unwrap_or_default();
        xml.push_str(&format!(
            r#"      <failure message="{}">{}</failure>"#,
            escape_xml(first_line),
            escape_xml(error)
        ));
        xml.push('\n');
    }

    xml.push_str("    </testcase>\n");
}

/// One-line run summary
#[must_use]
pub fn summary(report: &RunReport) -> String {
    format!(
        "{} passed, {} failed, {} total ({:.2}s)",
        report.passed(),
        report.failed(),
        report.total(),
        report.duration.as_secs_f64()
    )
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
