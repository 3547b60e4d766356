// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit orchestration: input validation, fetching, preparation, engine
//! selection with fallback, summary and best-effort persistence.

use crate::budget::Deadline;
use crate::config::{AuditConfig, EngineChoice};
use crate::error::{AuditError, Result};
use crate::evaluators::{self, Evaluation, Evaluator, EvaluatorError, PatternEvaluator};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::model::{AuditInput, AuditReport, AuditResponse, AuditSummary, Engine, MANUAL_CHECKS_NOTE};
use crate::preprocess::prepare;
use crate::rules::{label_for, panic_message, RuleId};
use crate::store::{JsonDirStore, ReportStore};
use chrono::Utc;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Runs audits. Holds no per-audit state, so one instance can serve any
/// number of sequential or concurrent audits.
pub struct Auditor {
    config: AuditConfig,
    preferred: Option<Box<dyn Evaluator>>,
    fetcher: Option<Box<dyn Fetcher>>,
    store: Option<Box<dyn ReportStore>>,
}

impl Auditor {
    /// Auditor with the best evaluator this build offers and, when the
    /// config names a directory, a JSON report store
    pub fn new(config: AuditConfig) -> Self {
        let preferred = match config.engine {
            EngineChoice::Auto => evaluators::structured_evaluator(),
            EngineChoice::Pattern => None,
        };
        let store = config
            .store
            .dir
            .clone()
            .map(|dir| Box::new(JsonDirStore::new(dir)) as Box<dyn ReportStore>);

        Self { config, preferred, fetcher: None, store }
    }

    /// Replace the preferred evaluator
    pub fn with_preferred(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.preferred = Some(evaluator);
        self
    }

    /// Use `fetcher` for URL-only input instead of building an HTTP client
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_store(mut self, store: Box<dyn ReportStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit and wrap the outcome in the wire shape
    pub fn audit_response(&self, input: &AuditInput) -> AuditResponse {
        self.audit(input).into()
    }

    /// Audit HTML, or the page behind a URL when no HTML is given.
    ///
    /// Only empty input and fetch failures are errors. Rule failures,
    /// evaluator failures and persistence failures are absorbed.
    pub fn audit(&self, input: &AuditInput) -> Result<AuditReport> {
        let url = input.url_text().unwrap_or_default().to_string();

        let raw: Cow<'_, str> = match input.html_text() {
            Some(html) => Cow::Borrowed(html),
            None if !url.is_empty() => Cow::Owned(self.fetch(&url)?),
            None => return Err(AuditError::EmptyInput),
        };

        let prepared = prepare(&raw, self.config.max_bytes);
        if prepared.truncated {
            debug!(
                "Input of {} bytes truncated to {} bytes",
                prepared.original_len, self.config.max_bytes
            );
        }

        let deadline = Deadline::start(self.config.time_budget());
        let (engine, evaluation) = self.evaluate(&prepared.html, &deadline);

        let mut notes = vec![MANUAL_CHECKS_NOTE.to_string()];
        if engine == Engine::Pattern {
            notes.push("Pattern-match engine used; counting rules are approximate.".to_string());
        }
        if prepared.truncated {
            notes.push(format!(
                "Input exceeded {} bytes and was truncated before evaluation.",
                self.config.max_bytes
            ));
        }
        if evaluation.timed_out {
            notes.push(format!(
                "Time budget of {} ms exceeded; {} of {} rules evaluated.",
                self.config.time_budget_ms,
                evaluation.checks.len(),
                RuleId::ALL.len()
            ));
        }

        let summary = AuditSummary::from_checks(&evaluation.checks, label_for, notes);
        let report = AuditReport {
            engine,
            url,
            created_at: Utc::now(),
            html_length: prepared.original_len,
            truncated: prepared.truncated,
            timed_out: evaluation.timed_out,
            checks: evaluation.checks,
            summary,
        };

        self.persist(&report);
        info!(
            "Audit complete: engine={}, score={}, {}/{} checks passed",
            report.engine, report.summary.score, report.summary.passed_count, report.summary.total_count
        );

        Ok(report)
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let html = match &self.fetcher {
            Some(fetcher) => fetcher.fetch(url)?,
            None => HttpFetcher::new(&self.config.fetch)?.fetch(url)?,
        };
        Ok(html)
    }

    /// Preferred evaluator first; any failure or panic there falls back to
    /// the pattern engine under the same deadline
    fn evaluate(&self, html: &str, deadline: &Deadline) -> (Engine, Evaluation) {
        if let Some(preferred) = &self.preferred {
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| preferred.evaluate(html, deadline)))
                .unwrap_or_else(|payload| Err(EvaluatorError::Panicked(panic_message(payload.as_ref()))));

            match attempt {
                Ok(evaluation) => {
                    debug!("Evaluated with the {} engine", preferred.engine());
                    return (preferred.engine(), evaluation);
                }
                Err(err) => debug!("{} engine failed, using pattern engine: {}", preferred.engine(), err),
            }
        } else {
            debug!("No preferred engine, using pattern engine");
        }

        (Engine::Pattern, PatternEvaluator.run(html, deadline))
    }

    fn persist(&self, report: &AuditReport) {
        if let Some(store) = &self.store {
            match store.save(report) {
                Ok(id) => debug!("Stored report {}", id),
                Err(e) => warn!("Failed to store report: {}", e),
            }
        }
    }
}
