// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for a11yaudit

use a11yaudit::config::EngineChoice;
use a11yaudit::report::{generate_report, OutputFormat};
use a11yaudit::store::{JsonDirStore, ReportStore};
use a11yaudit::{scanner, AuditConfig, AuditInput, AuditReport, Auditor, Engine};
use std::path::Path;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).expect("fixture exists")
}

fn audit_with(engine: EngineChoice, html: &str) -> AuditReport {
    let config = AuditConfig { engine, ..AuditConfig::default() };
    Auditor::new(config)
        .audit(&AuditInput::html(html))
        .expect("audit should succeed")
}

fn both_engines(html: &str) -> Vec<AuditReport> {
    vec![audit_with(EngineChoice::Auto, html), audit_with(EngineChoice::Pattern, html)]
}

#[test]
fn test_accessible_fixture_passes_everything() {
    for report in both_engines(&fixture("accessible.html")) {
        assert_eq!(
            report.summary.fail_list,
            Vec::<String>::new(),
            "{} engine failed checks",
            report.engine
        );
        assert_eq!(report.score(), 100);
        assert!(!report.timed_out);
    }
}

#[test]
fn test_inaccessible_fixture_fails_everything() {
    for report in both_engines(&fixture("inaccessible.html")) {
        let passing: Vec<_> = report.checks.iter().filter(|c| c.ok).map(|c| &c.id).collect();
        assert!(passing.is_empty(), "{} engine passed {:?}", report.engine, passing);
        assert_eq!(report.score(), 0);
    }
}

#[test]
fn test_partial_fixture() {
    for report in both_engines(&fixture("partial.html")) {
        assert_eq!(report.summary.fail_list, vec!["Image elements have [alt] attributes"]);
        assert_eq!(report.summary.passed_count, 8);
        assert_eq!(report.score(), 89);
    }
}

#[test]
fn test_engines_agree_on_fixtures() {
    for name in ["accessible.html", "inaccessible.html", "partial.html"] {
        let html = fixture(name);
        let reports = both_engines(&html);
        let outcomes: Vec<Vec<(String, bool)>> = reports
            .iter()
            .map(|r| r.checks.iter().map(|c| (c.id.clone(), c.ok)).collect())
            .collect();
        assert_eq!(outcomes[0], outcomes[1], "engines disagree on {}", name);
    }
}

#[cfg(feature = "structured")]
#[test]
fn test_default_engine_is_structured() {
    let report = audit_with(EngineChoice::Auto, &fixture("partial.html"));
    assert_eq!(report.engine, Engine::Structured);
}

#[test]
fn test_forced_pattern_engine() {
    let report = audit_with(EngineChoice::Pattern, &fixture("partial.html"));
    assert_eq!(report.engine, Engine::Pattern);
    assert!(report.summary.notes.len() >= 2);
}

#[test]
fn test_script_content_is_ignored() {
    // The only <img> lives inside a script block
    let html = r#"<html lang="en"><head><title>T</title>
        <script>var tpl = '<img src="x">';</script></head><body></body></html>"#;
    for report in both_engines(html) {
        assert!(report.check("images_alt").unwrap().ok);
        assert!(report.html_length > 0);
    }
}

#[test]
fn test_malformed_markup_still_audits() {
    let html = "<html lang=en><title>Broken</title><body><h1>One<h3>Three</div></span><img src=a";
    for report in both_engines(html) {
        assert_eq!(report.checks.len(), 9);
        assert!(!report.check("headings_sequential").unwrap().ok);
    }
}

#[test]
fn test_response_json_shape() {
    let auditor = Auditor::new(AuditConfig::default());
    let response = auditor.audit_response(&AuditInput::html(fixture("partial.html")));
    let json: serde_json::Value =
        serde_json::from_str(&generate_report(&response, OutputFormat::Json)).unwrap();

    assert_eq!(json["ok"], true);
    let report = &json["report"];
    for key in ["engine", "url", "createdAt", "htmlLength", "truncated", "timedOut", "checks", "summary"] {
        assert!(report.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(report["checks"][0]["id"], "document_title");
    assert_eq!(report["summary"]["score"], 89);
    assert_eq!(report["summary"]["totalCount"], 9);
}

#[test]
fn test_empty_input_response() {
    let auditor = Auditor::new(AuditConfig::default());
    let response = auditor.audit_response(&AuditInput {
        html: Some(String::new()),
        url: Some(String::new()),
    });
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json, serde_json::json!({ "ok": false, "error": "Empty input", "code": "empty_input" }));
}

#[test]
fn test_score_in_range_for_varied_inputs() {
    let inputs = [
        "<p>",
        "<<<>>>",
        "<img><img alt=x><a></a><button>",
        "<h6><h1><h6>",
        "\u{feff}<html lang=\"\">é</html>",
    ];
    for html in inputs {
        for report in both_engines(html) {
            assert!(report.summary.score <= 100);
            assert_eq!(report.summary.total_count, report.checks.len());
        }
    }
}

#[test]
fn test_audits_persist_to_configured_store() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut config = AuditConfig::default();
    config.store.dir = Some(temp.path().to_path_buf());

    let auditor = Auditor::new(config);
    auditor.audit(&AuditInput::html(fixture("accessible.html")).with_url("https://lib.example/")).unwrap();
    auditor.audit(&AuditInput::html(fixture("partial.html"))).unwrap();

    let store = JsonDirStore::new(temp.path());
    let listing = store.list(1, 10).unwrap();
    assert_eq!(listing.total, 2);
    assert_eq!(listing.items[0].summary.score, 89);
    assert_eq!(listing.items[1].url, "https://lib.example/");
    assert_eq!(store.get(1).unwrap().unwrap().report.score(), 100);
}

#[test]
fn test_scan_fixture_directory() {
    let auditor = Auditor::new(AuditConfig::default());
    let results = scanner::scan_directory(Path::new("tests/fixtures"), &auditor).expect("scan should succeed");
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|r| r.passed()).count(), 1);
    assert!(results.iter().all(|r| r.response.ok));
}
