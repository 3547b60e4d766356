// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit data model: inputs, per-rule results, summaries and reports.
//!
//! Reports serialize with camelCase keys, matching the shape consumed by the
//! report store and by any caller rendering results.

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Note attached to every summary: layout-dependent criteria are not
/// evaluated from markup alone.
pub const MANUAL_CHECKS_NOTE: &str =
    "Contrast ratios and touch target sizes require client-side or manual evaluation.";

/// Caller input. `html` wins when it is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInput {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl AuditInput {
    /// Audit the given markup
    pub fn html(html: impl Into<String>) -> Self {
        Self { html: Some(html.into()), url: None }
    }

    /// Fetch and audit the given URL
    pub fn url(url: impl Into<String>) -> Self {
        Self { html: None, url: Some(url.into()) }
    }

    /// Attach a source URL, used as report metadata when HTML is also given
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Non-blank HTML, if any
    pub fn html_text(&self) -> Option<&str> {
        self.html.as_deref().filter(|h| !h.trim().is_empty())
    }

    /// Non-blank URL, if any
    pub fn url_text(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Which evaluator produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Parsed document tree with structural queries
    Structured,
    /// Text pattern matching only
    Pattern,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Engine::Structured => "structured",
            Engine::Pattern => "pattern",
        })
    }
}

/// A single metric value: a count or a short piece of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Text(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<usize> for MetricValue {
    fn from(n: usize) -> Self {
        MetricValue::Count(n as u64)
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

/// Result of one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub ok: bool,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, MetricValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<serde_json::Value>,
}

/// Aggregate over the evaluated checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub passed_count: usize,
    pub total_count: usize,
    /// `round(passed / total * 100)`, 100 when nothing was evaluated
    pub score: u8,
    pub pass_list: Vec<String>,
    pub fail_list: Vec<String>,
    pub notes: Vec<String>,
}

impl AuditSummary {
    /// Derive the summary from checks. `labels` maps a check id to the
    /// human-readable line used in the pass/fail lists.
    pub fn from_checks<'a>(
        checks: &[CheckResult],
        labels: impl Fn(&str) -> Option<&'a str>,
        notes: Vec<String>,
    ) -> Self {
        let mut pass_list = Vec::new();
        let mut fail_list = Vec::new();

        for check in checks {
            let line = match labels(&check.id) {
                Some(label) => label.to_string(),
                None => check.id.clone(),
            };
            if check.ok {
                pass_list.push(line);
            } else {
                fail_list.push(line);
            }
        }

        let passed_count = pass_list.len();
        let total_count = checks.len();

        Self {
            passed_count,
            total_count,
            score: score(passed_count, total_count),
            pass_list,
            fail_list,
            notes,
        }
    }
}

/// Percentage of passing checks, rounded half up; 100 for an empty set
pub fn score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let passed = passed.min(total);
    ((passed * 100 + total / 2) / total) as u8
}

/// Full result of one audit invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub engine: Engine,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Byte length of the input before any stripping or truncation
    pub html_length: usize,
    pub truncated: bool,
    pub timed_out: bool,
    pub checks: Vec<CheckResult>,
    pub summary: AuditSummary,
}

impl AuditReport {
    /// Look up a check by rule id
    pub fn check(&self, id: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn score(&self) -> u8 {
        self.summary.score
    }
}

/// Wire shape: `{ ok: true, report }` or `{ ok: false, error, code? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<AuditReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl AuditResponse {
    pub fn success(report: AuditReport) -> Self {
        Self { ok: true, report: Some(report), error: None, code: None }
    }

    pub fn failure(err: &AuditError) -> Self {
        Self { ok: false, report: None, error: Some(err.to_string()), code: err.code() }
    }
}

impl From<Result<AuditReport, AuditError>> for AuditResponse {
    fn from(result: Result<AuditReport, AuditError>) -> Self {
        match result {
            Ok(report) => AuditResponse::success(report),
            Err(err) => AuditResponse::failure(&err),
        }
    }
}
