//! Adapter for Checkov scan reports.
//!
//! Converts the external JSON report into [`SecurityAnalysis`], inferring a
//! severity from the check id and name when the report omits one.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to parse scan report: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scan report contains a failed check without a check id")]
    MissingCheckId,
}

/// Wire format of a Checkov JSON report.
#[derive(Debug, Deserialize)]
pub struct CheckovReport {
    pub summary: CheckovSummary,
    #[serde(default)]
    pub results: CheckovResults,
}

#[derive(Debug, Deserialize)]
pub struct CheckovSummary {
    #[serde(default)]
    pub passed: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub parsing_errors: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckovResults {
    #[serde(default)]
    pub failed_checks: Vec<CheckovCheck>,
}

#[derive(Debug, Deserialize)]
pub struct CheckovCheck {
    #[serde(default)]
    pub check_id: String,
    #[serde(default)]
    pub check_name: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_line_range: Vec<usize>,
    #[serde(default)]
    pub guideline: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One normalized failed check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub check_id: String,
    pub check_name: String,
    pub severity: Severity,
    pub resource: String,
    pub file: String,
    pub line: usize,
    pub description: String,
    pub guideline: String,
}

/// Severity-bucketed view of a scan report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total_issues: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub findings: Vec<SecurityFinding>,
}

/// Keyword table used when a check carries no severity. First match wins.
const SEVERITY_KEYWORDS: &[(&str, Severity)] = &[
    ("encryption", Severity::High),
    ("credential", Severity::High),
    ("secret", Severity::High),
    ("password", Severity::High),
    ("public access", Severity::High),
    ("logging", Severity::Medium),
    ("monitoring", Severity::Medium),
    ("versioning", Severity::Medium),
    ("tag", Severity::Low),
    ("description", Severity::Low),
];

/// Parse report bytes with strict validation: malformed JSON or a failed
/// check without an id is a hard error.
pub fn validate_report(bytes: &[u8]) -> Result<SecurityAnalysis, ReportError> {
    let report: CheckovReport = serde_json::from_slice(bytes)?;

    if report
        .results
        .failed_checks
        .iter()
        .any(|c| c.check_id.is_empty())
    {
        return Err(ReportError::MissingCheckId);
    }

    Ok(from_report(&report))
}

/// Convert a parsed report into the bucketed analysis.
pub fn from_report(report: &CheckovReport) -> SecurityAnalysis {
    let mut analysis = SecurityAnalysis {
        checks_passed: report.summary.passed,
        checks_failed: report.summary.failed,
        ..Default::default()
    };

    for check in &report.results.failed_checks {
        let severity = match &check.severity {
            Some(s) if !s.is_empty() => Severity::parse(s),
            _ => infer_severity(&check.check_id, &check.check_name),
        };

        match severity {
            Severity::Critical => analysis.critical += 1,
            Severity::High => analysis.high += 1,
            Severity::Medium => analysis.medium += 1,
            Severity::Low => analysis.low += 1,
            Severity::Info => analysis.info += 1,
        }

        analysis.findings.push(SecurityFinding {
            check_id: check.check_id.clone(),
            check_name: check.check_name.clone(),
            severity,
            resource: check.resource.clone(),
            file: check.file_path.clone(),
            line: check.file_line_range.first().copied().unwrap_or(0),
            description: check.description.clone().unwrap_or_default(),
            guideline: check.guideline.clone(),
        });
    }

    analysis.total_issues = analysis.findings.len();
    analysis
}

fn infer_severity(check_id: &str, check_name: &str) -> Severity {
    let haystack = format!("{check_id} {check_name}").to_lowercase();

    for (keyword, severity) in SEVERITY_KEYWORDS {
        if haystack.contains(keyword) {
            return *severity;
        }
    }

    Severity::Medium
}
