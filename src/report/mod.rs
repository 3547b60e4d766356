// SPDX-License-Identifier: PMPL-1.0-or-later
//! Rendering of audit responses and stored-report listings.
//!
//! - Text: human-readable PASS/FAIL lines with metrics and notes
//! - JSON: the wire shape, pretty-printed

use crate::model::{AuditReport, AuditResponse};
use crate::scanner::FileAudit;
use crate::store::ReportListing;
use serde::Serialize;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty JSON of the wire response
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render one audit response
pub fn generate_report(response: &AuditResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(response),
        OutputFormat::Json => to_json(response),
    }
}

/// Render the results of a directory scan
pub fn generate_scan_report(results: &[FileAudit], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&results),
        OutputFormat::Text => {
            if results.is_empty() {
                return "No HTML files found.\n".to_string();
            }
            let mut output = String::new();
            for result in results {
                output.push_str(&format!("--- {} ---\n", result.path.display()));
                output.push_str(&generate_text_report(&result.response));
                output.push('\n');
            }
            let passed = results.iter().filter(|r| r.passed()).count();
            output.push_str(&format!(
                "Scanned {} file(s): {} passed, {} with failures\n",
                results.len(),
                passed,
                results.len() - passed
            ));
            output
        }
    }
}

/// Render a page of stored reports
pub fn generate_listing(listing: &ReportListing, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(listing),
        OutputFormat::Text => {
            if listing.items.is_empty() {
                return "No stored reports.\n".to_string();
            }
            let mut output = format!(
                "Reports (page {} of {}, {} total)\n\n",
                listing.page, listing.pages, listing.total
            );
            for item in &listing.items {
                output.push_str(&format!(
                    "#{:<6} {}  score {:>3}  {:<10} {}\n",
                    item.id,
                    item.created_at.format("%Y-%m-%d %H:%M:%S"),
                    item.summary.score,
                    item.engine,
                    display_url(&item.url)
                ));
            }
            output
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize report: {}\"}}", e))
}

fn display_url(url: &str) -> &str {
    if url.is_empty() {
        "(inline html)"
    } else {
        url
    }
}

fn generate_text_report(response: &AuditResponse) -> String {
    let mut output = String::new();
    output.push_str("=== Accessibility Audit Report ===\n\n");

    match &response.report {
        Some(report) if response.ok => write_report(&mut output, report),
        _ => {
            output.push_str(&format!(
                "ERROR: {}\n",
                response.error.as_deref().unwrap_or("unknown error")
            ));
            if let Some(code) = &response.code {
                output.push_str(&format!("Code: {}\n", code));
            }
        }
    }

    output
}

fn write_report(output: &mut String, report: &AuditReport) {
    let summary = &report.summary;

    output.push_str(&format!("Source: {}\n", display_url(&report.url)));
    output.push_str(&format!("Engine: {}\n", report.engine));
    output.push_str(&format!("HTML length: {} bytes", report.html_length));
    if report.truncated {
        output.push_str(" (truncated)");
    }
    output.push('\n');
    output.push_str(&format!(
        "Score: {}/100 ({} of {} checks passed)\n\n",
        summary.score, summary.passed_count, summary.total_count
    ));

    for check in &report.checks {
        let status = if check.ok { "PASS" } else { "FAIL" };
        output.push_str(&format!("[{}] {}\n", status, check.id));
        if !check.ok {
            output.push_str(&format!("  {}\n", check.rationale));
        }
        if !check.metrics.is_empty() {
            let metrics: Vec<String> =
                check.metrics.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!("  Metrics: {}\n", metrics.join(", ")));
        }
        for example in &check.examples {
            output.push_str(&format!("  Example: {}\n", example));
        }
    }

    if !summary.notes.is_empty() {
        output.push_str("\nNotes:\n");
        for note in &summary.notes {
            output.push_str(&format!("- {}\n", note));
        }
    }

    output.push('\n');
    if summary.fail_list.is_empty() {
        output.push_str("RESULT: ALL CHECKS PASSED\n");
    } else {
        output.push_str(&format!("RESULT: {} CHECK(S) FAILED\n", summary.fail_list.len()));
    }
}
