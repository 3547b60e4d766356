// SPDX-License-Identifier: PMPL-1.0-or-later
//! The rule set shared by both evaluators.
//!
//! A rule is identified by [`RuleId`]; the order of [`RuleId::ALL`] is the
//! evaluation order. Evaluators only decide *how* a rule is checked; the
//! driver in [`run_rules`] owns ordering, deadline polling and error capture.
//!
//! | Rule | WCAG |
//! |------|------|
//! | `document_title` | 2.4.2 |
//! | `html_lang` | 3.1.1 |
//! | `images_alt` | 1.1.1 |
//! | `buttons_accessible_name` | 4.1.2 |
//! | `links_discernible` | 2.4.4 / 4.1.2 |
//! | `form_labels` | 3.3.2 / 1.3.1 |
//! | `headings_sequential` | 1.3.1 |
//! | `viewport_scaling` | 1.4.4 |
//! | `aria_attributes_valid` | 4.1.2 |

use crate::budget::Deadline;
use crate::model::{CheckResult, MetricValue};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

/// Upper bound on examples recorded per rule
pub const MAX_EXAMPLES: usize = 5;

/// Smallest `maximum-scale` that still allows meaningful zoom
pub const MIN_MAXIMUM_SCALE: f64 = 5.0;

/// Input types that are buttons rather than labelled fields
pub const BUTTON_INPUT_TYPES: &[&str] = &["button", "submit", "image", "reset"];

/// Input types exempt from the form label rule
pub const LABEL_EXEMPT_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image"];

/// Attributes that give a button an accessible name
pub const BUTTON_NAME_ATTRS: &[&str] = &["aria-label", "title", "alt", "value"];

/// Attributes that give a link an accessible name
pub const LINK_NAME_ATTRS: &[&str] = &["aria-label", "aria-labelledby", "title"];

/// Attributes that label a form control directly
pub const CONTROL_LABEL_ATTRS: &[&str] = &["aria-label", "aria-labelledby"];

/// Identifier of a rule, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    DocumentTitle,
    HtmlLang,
    ImagesAlt,
    ButtonsAccessibleName,
    LinksDiscernible,
    FormLabels,
    HeadingsSequential,
    ViewportScaling,
    AriaAttributesValid,
}

impl RuleId {
    /// Every rule, in evaluation order
    pub const ALL: [RuleId; 9] = [
        RuleId::DocumentTitle,
        RuleId::HtmlLang,
        RuleId::ImagesAlt,
        RuleId::ButtonsAccessibleName,
        RuleId::LinksDiscernible,
        RuleId::FormLabels,
        RuleId::HeadingsSequential,
        RuleId::ViewportScaling,
        RuleId::AriaAttributesValid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::DocumentTitle => "document_title",
            RuleId::HtmlLang => "html_lang",
            RuleId::ImagesAlt => "images_alt",
            RuleId::ButtonsAccessibleName => "buttons_accessible_name",
            RuleId::LinksDiscernible => "links_discernible",
            RuleId::FormLabels => "form_labels",
            RuleId::HeadingsSequential => "headings_sequential",
            RuleId::ViewportScaling => "viewport_scaling",
            RuleId::AriaAttributesValid => "aria_attributes_valid",
        }
    }

    /// Short statement of the property, used in pass/fail lists
    pub fn label(&self) -> &'static str {
        match self {
            RuleId::DocumentTitle => "Document has a <title> element",
            RuleId::HtmlLang => "HTML element has a [lang] attribute",
            RuleId::ImagesAlt => "Image elements have [alt] attributes",
            RuleId::ButtonsAccessibleName => "Buttons have accessible names",
            RuleId::LinksDiscernible => "Links have discernible names",
            RuleId::FormLabels => "Form elements have associated labels",
            RuleId::HeadingsSequential => "Heading elements are in sequential order",
            RuleId::ViewportScaling => "Viewport allows user scaling",
            RuleId::AriaAttributesValid => "ARIA attributes appear syntactically valid",
        }
    }

    /// Why the rule matters
    pub fn rationale(&self) -> &'static str {
        match self {
            RuleId::DocumentTitle => {
                "Ensure the document has exactly one non-empty <title> in its head; screen readers announce it first"
            }
            RuleId::HtmlLang => {
                "Ensure the <html> element has a [lang] attribute so assistive technology picks the right pronunciation"
            }
            RuleId::ImagesAlt => "Ensure image elements have non-empty [alt] attributes",
            RuleId::ButtonsAccessibleName => {
                "Ensure buttons have visible text or an aria-label, title, alt or value"
            }
            RuleId::LinksDiscernible => {
                "Ensure links have text, a labelled image, or an accessible-name attribute"
            }
            RuleId::FormLabels => {
                "Ensure form controls are linked to a <label> or carry aria-label/aria-labelledby"
            }
            RuleId::HeadingsSequential => {
                "Ensure heading levels never increase by more than one at a step"
            }
            RuleId::ViewportScaling => {
                "Ensure [user-scalable=\"no\"] is not used and [maximum-scale] is not less than 5"
            }
            RuleId::AriaAttributesValid => {
                "Ensure [aria-*] attribute names are lowercase and not misspelled"
            }
        }
    }

    pub fn from_id(id: &str) -> Option<RuleId> {
        RuleId::ALL.into_iter().find(|r| r.as_str() == id)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a check id, for summary pass/fail lists
pub fn label_for(id: &str) -> Option<&'static str> {
    RuleId::from_id(id).map(|r| r.label())
}

/// Failure inside a single rule
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("rule panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Internal(String),
}

/// What a rule implementation reports; the id and rationale are filled in
/// by [`run_rules`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub ok: bool,
    pub metrics: BTreeMap<String, MetricValue>,
    pub examples: Vec<serde_json::Value>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self::new(true)
    }

    pub fn fail() -> Self {
        Self::new(false)
    }

    pub fn new(ok: bool) -> Self {
        Self { ok, metrics: BTreeMap::new(), examples: Vec::new() }
    }

    /// Record a metric
    pub fn metric(mut self, key: &str, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.to_string(), value.into());
        self
    }

    /// Record an example, ignoring anything past [`MAX_EXAMPLES`]
    pub fn example(mut self, example: serde_json::Value) -> Self {
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(example);
        }
        self
    }

    /// Record several examples
    pub fn examples(self, examples: impl IntoIterator<Item = serde_json::Value>) -> Self {
        examples.into_iter().fold(self, RuleOutcome::example)
    }

    fn into_check(self, rule: RuleId) -> CheckResult {
        CheckResult {
            id: rule.as_str().to_string(),
            ok: self.ok,
            rationale: rule.rationale().to_string(),
            metrics: self.metrics,
            examples: self.examples,
        }
    }
}

/// Checks produced by one evaluator run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub checks: Vec<CheckResult>,
    /// The deadline stopped evaluation before every rule ran
    pub timed_out: bool,
}

/// Run every rule in order through `check`.
///
/// After each rule the deadline is polled; once it has expired the remaining
/// rules are left out and `timed_out` is set. A rule that errors or panics
/// is recorded as failing with a diagnostic rationale and evaluation
/// continues.
pub fn run_rules<F>(deadline: &Deadline, mut check: F) -> Evaluation
where
    F: FnMut(RuleId) -> Result<RuleOutcome, RuleError>,
{
    let mut evaluation = Evaluation::default();

    for (idx, rule) in RuleId::ALL.into_iter().enumerate() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| check(rule)))
            .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(payload.as_ref()))));

        let check_result = match result {
            Ok(outcome) => outcome.into_check(rule),
            Err(err) => {
                debug!("Rule {} failed internally: {}", rule, err);
                CheckResult {
                    id: rule.as_str().to_string(),
                    ok: false,
                    rationale: format!("Rule failed internally: {}", err),
                    metrics: BTreeMap::new(),
                    examples: Vec::new(),
                }
            }
        };
        evaluation.checks.push(check_result);

        let remaining = RuleId::ALL.len() - idx - 1;
        if remaining > 0 && deadline.expired() {
            debug!(
                "Time budget of {:?} exceeded after {}; skipping {} rule(s)",
                deadline.budget(),
                rule,
                remaining
            );
            evaluation.timed_out = true;
            break;
        }
    }

    evaluation
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A heading level that jumps by more than one over its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingJump {
    pub from: u8,
    pub to: u8,
}

/// Upward jumps of more than one level in a heading sequence.
/// Going back down (h4 to h2) is always allowed.
pub fn heading_jumps(levels: &[u8]) -> Vec<HeadingJump> {
    levels
        .windows(2)
        .filter(|w| w[1] > w[0] + 1)
        .map(|w| HeadingJump { from: w[0], to: w[1] })
        .collect()
}

/// Shared outcome for the heading rule
pub fn headings_outcome(levels: &[u8]) -> RuleOutcome {
    let jumps = heading_jumps(levels);
    let sequence = levels
        .iter()
        .map(|l| format!("h{}", l))
        .collect::<Vec<_>>()
        .join(",");

    RuleOutcome::new(jumps.is_empty())
        .metric("headings_total", levels.len())
        .metric("headings_sequence", sequence)
        .metric("breaks", jumps.len())
        .examples(jumps.iter().map(|j| {
            serde_json::json!({ "sequence": [format!("h{}", j.from), format!("h{}", j.to)] })
        }))
}

/// Whether a viewport `content` value disables or caps user zoom
pub fn viewport_blocks_zoom(content: &str) -> bool {
    let lower = content.to_ascii_lowercase();
    lower
        .split([',', ';'])
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key.trim() {
                "user-scalable" => value == "no" || value == "0",
                "maximum-scale" => value
                    .parse::<f64>()
                    .map(|scale| scale < MIN_MAXIMUM_SCALE)
                    .unwrap_or(false),
                _ => false,
            }
        })
}

/// Whether an attribute value counts as present for naming purposes
pub fn is_nonblank(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// An aria-* attribute name carrying uppercase characters
pub fn is_suspicious_aria_name(name: &str) -> bool {
    name.len() > 5
        && name.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("aria-"))
        && name.chars().any(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rule_order_and_ids() {
        let ids: Vec<_> = RuleId::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "document_title",
                "html_lang",
                "images_alt",
                "buttons_accessible_name",
                "links_discernible",
                "form_labels",
                "headings_sequential",
                "viewport_scaling",
                "aria_attributes_valid",
            ]
        );
        for rule in RuleId::ALL {
            assert_eq!(RuleId::from_id(rule.as_str()), Some(rule));
        }
        assert_eq!(RuleId::from_id("contrast"), None);
    }

    #[test]
    fn test_run_rules_all_pass() {
        let evaluation = run_rules(&Deadline::unlimited(), |_| Ok(RuleOutcome::pass()));
        assert_eq!(evaluation.checks.len(), RuleId::ALL.len());
        assert!(!evaluation.timed_out);
        assert!(evaluation.checks.iter().all(|c| c.ok));
        assert_eq!(evaluation.checks[0].rationale, RuleId::DocumentTitle.rationale());
    }

    #[test]
    fn test_rule_error_is_recorded_and_evaluation_continues() {
        let evaluation = run_rules(&Deadline::unlimited(), |rule| {
            if rule == RuleId::ImagesAlt {
                Err(RuleError::Internal("boom".into()))
            } else {
                Ok(RuleOutcome::pass())
            }
        });
        assert_eq!(evaluation.checks.len(), RuleId::ALL.len());
        let images = &evaluation.checks[2];
        assert_eq!(images.id, "images_alt");
        assert!(!images.ok);
        assert!(images.rationale.contains("Rule failed internally"));
        assert!(images.rationale.contains("boom"));
        assert!(evaluation.checks[3].ok);
    }

    #[test]
    fn test_rule_panic_is_captured() {
        let evaluation = run_rules(&Deadline::unlimited(), |rule| {
            if rule == RuleId::HtmlLang {
                panic!("lang exploded");
            }
            Ok(RuleOutcome::pass())
        });
        assert_eq!(evaluation.checks.len(), RuleId::ALL.len());
        assert!(!evaluation.checks[1].ok);
        assert!(evaluation.checks[1].rationale.contains("lang exploded"));
    }

    #[test]
    fn test_expired_deadline_stops_after_first_rule() {
        let mut calls = 0;
        let evaluation = run_rules(&Deadline::start(Duration::ZERO), |_| {
            calls += 1;
            Ok(RuleOutcome::pass())
        });
        assert_eq!(calls, 1);
        assert_eq!(evaluation.checks.len(), 1);
        assert!(evaluation.timed_out);
    }

    #[test]
    fn test_heading_jumps() {
        assert!(heading_jumps(&[]).is_empty());
        assert!(heading_jumps(&[2]).is_empty());
        assert_eq!(heading_jumps(&[1, 3]), vec![HeadingJump { from: 1, to: 3 }]);
        assert!(heading_jumps(&[1, 2, 2, 3, 4]).is_empty());
        assert!(heading_jumps(&[1, 2, 3, 4, 2, 3]).is_empty());
        assert_eq!(heading_jumps(&[1, 4]).len(), 1);
        assert_eq!(heading_jumps(&[1, 3, 1, 6]).len(), 2);
    }

    #[test]
    fn test_headings_outcome_metrics() {
        let outcome = headings_outcome(&[1, 3]);
        assert!(!outcome.ok);
        assert_eq!(outcome.metrics["headings_sequence"], MetricValue::from("h1,h3"));
        assert_eq!(outcome.metrics["breaks"], MetricValue::Count(1));
        assert_eq!(outcome.examples[0]["sequence"][1], "h3");
    }

    #[test]
    fn test_viewport_blocks_zoom() {
        assert!(!viewport_blocks_zoom("width=device-width, initial-scale=1"));
        assert!(viewport_blocks_zoom("width=device-width, user-scalable=no"));
        assert!(viewport_blocks_zoom("width=device-width; user-scalable = 0"));
        assert!(viewport_blocks_zoom("maximum-scale=1.0"));
        assert!(viewport_blocks_zoom("Maximum-Scale=4.9"));
        assert!(!viewport_blocks_zoom("maximum-scale=5"));
        assert!(!viewport_blocks_zoom("maximum-scale=10, user-scalable=yes"));
        assert!(!viewport_blocks_zoom("maximum-scale=abc"));
    }

    #[test]
    fn test_examples_are_capped() {
        let outcome = RuleOutcome::fail().examples((0..20).map(|i| serde_json::json!(i)));
        assert_eq!(outcome.examples.len(), MAX_EXAMPLES);
    }

    #[test]
    fn test_suspicious_aria_names() {
        assert!(is_suspicious_aria_name("aria-Label"));
        assert!(is_suspicious_aria_name("ARIA-label"));
        assert!(!is_suspicious_aria_name("aria-label"));
        assert!(!is_suspicious_aria_name("aria-"));
        assert!(!is_suspicious_aria_name("data-Aria"));
    }
}
