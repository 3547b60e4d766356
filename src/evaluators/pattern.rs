// SPDX-License-Identifier: PMPL-1.0-or-later
//! Pattern-match evaluator: the rule set over raw text with regexes only.
//!
//! Every pattern is either anchored on a literal tag opener followed by a
//! negated character class (`<img\b[^>]*>`) or a lazy block match, and the
//! `regex` crate runs in linear time, so adversarial input cannot trigger
//! catastrophic backtracking. The byte cap applied by the auditor bounds the
//! total work.
//!
//! The counting rules compare a "qualifying" count against a "total" count
//! and pass when qualifying >= total. This is an approximation: for
//! `form_labels` every `<label for=…>` counts as qualifying whether or not
//! its target exists, so a page can pass with some controls unlabelled.
//! That looseness is accepted in exchange for running without a parser.

use super::{Evaluation, Evaluator, EvaluatorError};
use crate::budget::Deadline;
use crate::model::Engine;
use crate::rules::{
    headings_outcome, is_nonblank, is_suspicious_aria_name, run_rules, viewport_blocks_zoom,
    RuleId, RuleOutcome, BUTTON_INPUT_TYPES, BUTTON_NAME_ATTRS, CONTROL_LABEL_ATTRS,
    LABEL_EXEMPT_INPUT_TYPES, LINK_NAME_ATTRS,
};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#)
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]*>"));
static ANY_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<[A-Za-z][^>]*>"));
static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<html\b[^>]*>"));
static HEAD_BLOCK: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<head\b[^>]*>(.*?)</head\s*>"));
static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<body\b"));
static TITLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<title\b[^>]*>(.*?)</title\s*>"));
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<img\b[^>]*>"));
static BUTTON_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<button\b[^>]*>"));
static BUTTON_CLOSE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)</button\s*>"));
static INPUT_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<input\b[^>]*>"));
static ANCHOR_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<a\b[^>]*>"));
static ANCHOR_CLOSE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)</a\s*>"));
static CONTROL_TAG: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)<(input|select|textarea)\b[^>]*>"));
static LABEL_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<label\b[^>]*>"));
static HEADING_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<h([1-6])\b[^>]*>"));
static META_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<meta\b[^>]*>"));

/// Longest tag snippet kept in examples
const SNIPPET_LEN: usize = 120;

/// Regex-only evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEvaluator;

impl PatternEvaluator {
    /// Evaluate without the `Result` wrapper; this engine cannot fail as a whole
    pub fn run(&self, html: &str, deadline: &Deadline) -> Evaluation {
        run_rules(deadline, |rule| {
            Ok(match rule {
                RuleId::DocumentTitle => document_title(html),
                RuleId::HtmlLang => html_lang(html),
                RuleId::ImagesAlt => images_alt(html),
                RuleId::ButtonsAccessibleName => buttons_accessible_name(html),
                RuleId::LinksDiscernible => links_discernible(html),
                RuleId::FormLabels => form_labels(html),
                RuleId::HeadingsSequential => headings_sequential(html),
                RuleId::ViewportScaling => viewport_scaling(html),
                RuleId::AriaAttributesValid => aria_attributes_valid(html),
            })
        })
    }
}

impl Evaluator for PatternEvaluator {
    fn engine(&self) -> Engine {
        Engine::Pattern
    }

    fn evaluate(&self, html: &str, deadline: &Deadline) -> Result<Evaluation, EvaluatorError> {
        Ok(self.run(html, deadline))
    }
}

/// Attributes of a start tag, in source order. Names keep their source
/// casing; valueless attributes yield an empty value.
pub fn tag_attrs(tag: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    let body = tag.trim_start_matches('<');
    let name_end = body
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(body.len());
    let rest = body[name_end..].trim_end_matches('>');

    ATTRIBUTE.captures_iter(rest).filter_map(|cap| {
        let name = cap.get(1)?.as_str();
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .or_else(|| cap.get(4))
            .map_or("", |m| m.as_str());
        Some((name, value))
    })
}

/// Value of the first attribute named `name` (ASCII case-insensitive)
pub fn tag_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    tag_attrs(tag)
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

fn has_any_nonblank(tag: &str, names: &[&str]) -> bool {
    names.iter().any(|name| is_nonblank(tag_attr(tag, name)))
}

/// Text of a fragment with tags removed and non-breaking spaces folded
fn visible_text(fragment: &str) -> String {
    ANY_TAG
        .replace_all(fragment, " ")
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .trim()
        .to_string()
}

/// Each opener of an element paired with its inner source. The inner source
/// ends at the next closer or the next opener of the same element, whichever
/// comes first, and is empty when no closer follows. Openers and closers are
/// walked together in one forward pass, so the inner slices never overlap.
fn elements<'a>(html: &'a str, open: &Regex, close: &Regex) -> Vec<(&'a str, &'a str)> {
    let openers: Vec<_> = open.find_iter(html).collect();
    let closers: Vec<usize> = close.find_iter(html).map(|m| m.start()).collect();

    let mut next_close = 0;
    let mut out = Vec::with_capacity(openers.len());
    for (idx, m) in openers.iter().enumerate() {
        while closers.get(next_close).is_some_and(|&at| at < m.end()) {
            next_close += 1;
        }
        let inner = match closers.get(next_close) {
            Some(&close_at) => {
                let end = openers
                    .get(idx + 1)
                    .map_or(close_at, |next| next.start().min(close_at));
                &html[m.end()..end]
            }
            None => "",
        };
        out.push((m.as_str(), inner));
    }
    out
}

fn snippet(tag: &str) -> String {
    crate::preprocess::truncate_at_char_boundary(tag, SNIPPET_LEN).to_string()
}

fn input_type(tag: &str) -> String {
    tag_attr(tag, "type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

fn document_title(html: &str) -> RuleOutcome {
    let region = match HEAD_BLOCK.captures(html) {
        Some(cap) => cap.get(1).map_or("", |m| m.as_str()),
        None => match BODY_OPEN.find(html) {
            Some(body) => &html[..body.start()],
            None => html,
        },
    };

    let titles: Vec<String> = TITLE_BLOCK
        .captures_iter(region)
        .map(|cap| visible_text(cap.get(1).map_or("", |m| m.as_str())))
        .collect();

    let ok = titles.len() == 1 && !titles[0].is_empty();
    let mut outcome = RuleOutcome::new(ok).metric("title_count", titles.len());
    if let Some(title) = titles.first() {
        outcome = outcome.metric("title", title.as_str());
    }
    outcome
}

fn html_lang(html: &str) -> RuleOutcome {
    let lang = HTML_OPEN
        .find(html)
        .and_then(|m| tag_attr(m.as_str(), "lang"))
        .map(str::trim)
        .filter(|l| !l.is_empty());

    match lang {
        Some(lang) => RuleOutcome::pass().metric("lang", lang),
        None => RuleOutcome::fail(),
    }
}

fn images_alt(html: &str) -> RuleOutcome {
    let mut total = 0usize;
    let mut with_alt = 0usize;
    let mut missing = Vec::new();

    for m in IMG_TAG.find_iter(html) {
        total += 1;
        if is_nonblank(tag_attr(m.as_str(), "alt")) {
            with_alt += 1;
        } else {
            missing.push(json!({ "tag": snippet(m.as_str()) }));
        }
    }

    RuleOutcome::new(with_alt >= total)
        .metric("images_total", total)
        .metric("images_with_alt", with_alt)
        .metric("images_missing_alt", total - with_alt)
        .examples(missing)
}

fn buttons_accessible_name(html: &str) -> RuleOutcome {
    let mut total = 0usize;
    let mut named = 0usize;
    let mut unnamed = Vec::new();

    for (tag, inner) in elements(html, &BUTTON_OPEN, &BUTTON_CLOSE) {
        total += 1;
        if has_any_nonblank(tag, BUTTON_NAME_ATTRS) || !visible_text(inner).is_empty() {
            named += 1;
        } else {
            unnamed.push(json!({ "tag": snippet(tag) }));
        }
    }

    for m in INPUT_TAG.find_iter(html) {
        let tag = m.as_str();
        if !BUTTON_INPUT_TYPES.contains(&input_type(tag).as_str()) {
            continue;
        }
        total += 1;
        if has_any_nonblank(tag, BUTTON_NAME_ATTRS) {
            named += 1;
        } else {
            unnamed.push(json!({ "tag": snippet(tag) }));
        }
    }

    RuleOutcome::new(named >= total)
        .metric("buttons_total", total)
        .metric("buttons_named", named)
        .examples(unnamed)
}

fn links_discernible(html: &str) -> RuleOutcome {
    let mut total = 0usize;
    let mut named = 0usize;
    let mut unnamed = Vec::new();

    for (tag, inner) in elements(html, &ANCHOR_OPEN, &ANCHOR_CLOSE) {
        total += 1;
        let labelled_image = IMG_TAG
            .find_iter(inner)
            .any(|img| is_nonblank(tag_attr(img.as_str(), "alt")));

        if has_any_nonblank(tag, LINK_NAME_ATTRS) || labelled_image || !visible_text(inner).is_empty() {
            named += 1;
        } else {
            unnamed.push(json!({ "tag": snippet(tag) }));
        }
    }

    RuleOutcome::new(named >= total)
        .metric("links_total", total)
        .metric("links_named", named)
        .examples(unnamed)
}

fn form_labels(html: &str) -> RuleOutcome {
    let mut total = 0usize;
    let mut aria_labelled = 0usize;

    for cap in CONTROL_TAG.captures_iter(html) {
        let tag = cap.get(0).map_or("", |m| m.as_str());
        let is_input = cap
            .get(1)
            .is_some_and(|name| name.as_str().eq_ignore_ascii_case("input"));
        if is_input && LABEL_EXEMPT_INPUT_TYPES.contains(&input_type(tag).as_str()) {
            continue;
        }
        total += 1;
        if has_any_nonblank(tag, CONTROL_LABEL_ATTRS) {
            aria_labelled += 1;
        }
    }

    let labels_for = LABEL_TAG
        .find_iter(html)
        .filter(|m| is_nonblank(tag_attr(m.as_str(), "for")))
        .count();

    RuleOutcome::new(total == 0 || aria_labelled + labels_for >= total)
        .metric("controls_total", total)
        .metric("controls_aria_labelled", aria_labelled)
        .metric("labels_with_for", labels_for)
}

fn headings_sequential(html: &str) -> RuleOutcome {
    let levels: Vec<u8> = HEADING_OPEN
        .captures_iter(html)
        .filter_map(|cap| cap.get(1)?.as_str().parse().ok())
        .collect();
    headings_outcome(&levels)
}

fn viewport_scaling(html: &str) -> RuleOutcome {
    let mut viewports = 0usize;
    let mut blocking = Vec::new();

    for m in META_TAG.find_iter(html) {
        let tag = m.as_str();
        let is_viewport = tag_attr(tag, "name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("viewport"));
        if !is_viewport {
            continue;
        }
        viewports += 1;
        let content = tag_attr(tag, "content").unwrap_or("");
        if viewport_blocks_zoom(content) {
            blocking.push(json!({ "content": content }));
        }
    }

    RuleOutcome::new(blocking.is_empty())
        .metric("viewport_tags", viewports)
        .examples(blocking)
}

/// Casing smell test over source text. Shared with the structured engine,
/// whose parser lowercases attribute names before they can be inspected.
pub fn aria_attributes_valid(html: &str) -> RuleOutcome {
    let mut total = 0usize;
    let mut suspicious = Vec::new();

    for m in ANY_OPEN_TAG.find_iter(html) {
        for (name, _) in tag_attrs(m.as_str()) {
            if !name.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("aria-")) {
                continue;
            }
            total += 1;
            if is_suspicious_aria_name(name) {
                suspicious.push(name.to_string());
            }
        }
    }

    RuleOutcome::new(suspicious.is_empty())
        .metric("aria_attributes_total", total)
        .metric("aria_attributes_invalid", suspicious.len())
        .examples(suspicious.into_iter().map(|name| json!({ "attribute": name })))
}
