// SPDX-License-Identifier: PMPL-1.0-or-later
//! Structured evaluator: parses the document with `scraper` (html5ever) and
//! answers each rule with selector queries over the tree.
//!
//! Parsing is lenient, so malformed markup still yields a tree. The ARIA
//! casing rule is the exception: html5ever lowercases attribute names, so
//! that rule reads the source text through the pattern engine.

use super::pattern;
use super::{Evaluation, Evaluator, EvaluatorError};
use crate::budget::Deadline;
use crate::model::Engine;
use crate::rules::{
    headings_outcome, is_nonblank, run_rules, viewport_blocks_zoom, RuleId, RuleOutcome,
    BUTTON_INPUT_TYPES, BUTTON_NAME_ATTRS, CONTROL_LABEL_ATTRS, LABEL_EXEMPT_INPUT_TYPES,
    LINK_NAME_ATTRS,
};
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::collections::HashSet;

/// Tree-based evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredEvaluator;

/// Selectors compiled once per evaluation
struct Selectors {
    title: Selector,
    img: Selector,
    button_like: Selector,
    anchor: Selector,
    control: Selector,
    label: Selector,
    label_for: Selector,
    heading: Selector,
    meta: Selector,
}

impl Selectors {
    fn compile() -> Result<Self, EvaluatorError> {
        Ok(Self {
            title: selector("head title")?,
            img: selector("img")?,
            button_like: selector("button, input")?,
            anchor: selector("a")?,
            control: selector("input, select, textarea")?,
            label: selector("label")?,
            label_for: selector("label[for]")?,
            heading: selector("h1, h2, h3, h4, h5, h6")?,
            meta: selector("meta[name]")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, EvaluatorError> {
    Selector::parse(css).map_err(|e| EvaluatorError::Selector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

impl Evaluator for StructuredEvaluator {
    fn engine(&self) -> Engine {
        Engine::Structured
    }

    fn evaluate(&self, html: &str, deadline: &Deadline) -> Result<Evaluation, EvaluatorError> {
        let selectors = Selectors::compile()?;
        let document = Html::parse_document(html);

        Ok(run_rules(deadline, |rule| {
            Ok(match rule {
                RuleId::DocumentTitle => document_title(&document, &selectors),
                RuleId::HtmlLang => html_lang(&document),
                RuleId::ImagesAlt => images_alt(&document, &selectors),
                RuleId::ButtonsAccessibleName => buttons_accessible_name(&document, &selectors),
                RuleId::LinksDiscernible => links_discernible(&document, &selectors),
                RuleId::FormLabels => form_labels(&document, &selectors),
                RuleId::HeadingsSequential => headings_sequential(&document, &selectors),
                RuleId::ViewportScaling => viewport_scaling(&document, &selectors),
                RuleId::AriaAttributesValid => pattern::aria_attributes_valid(html),
            })
        }))
    }
}

fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn has_any_nonblank(element: &ElementRef<'_>, names: &[&str]) -> bool {
    names.iter().any(|name| is_nonblank(element.value().attr(name)))
}

fn input_type(element: &ElementRef<'_>) -> String {
    element
        .value()
        .attr("type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

/// Start tag rebuilt from the parsed element, for examples
fn describe(element: &ElementRef<'_>) -> String {
    let mut out = format!("<{}", element.value().name());
    for (name, value) in element.value().attrs() {
        out.push_str(&format!(" {}=\"{}\"", name, value));
    }
    out.push('>');
    out
}

fn document_title(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let titles: Vec<String> = document.select(&selectors.title).map(|t| text_of(&t)).collect();

    let ok = titles.len() == 1 && !titles[0].is_empty();
    let mut outcome = RuleOutcome::new(ok).metric("title_count", titles.len());
    if let Some(title) = titles.first() {
        outcome = outcome.metric("title", title.as_str());
    }
    outcome
}

fn html_lang(document: &Html) -> RuleOutcome {
    let root = document.root_element();
    let lang = root
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|l| !l.is_empty());

    match lang {
        Some(lang) => RuleOutcome::pass().metric("lang", lang),
        None => RuleOutcome::fail(),
    }
}

fn images_alt(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let mut total = 0usize;
    let mut missing = Vec::new();

    for img in document.select(&selectors.img) {
        total += 1;
        if !is_nonblank(img.value().attr("alt")) {
            missing.push(json!({ "src": img.value().attr("src").unwrap_or("") }));
        }
    }

    let with_alt = total - missing.len();
    RuleOutcome::new(missing.is_empty())
        .metric("images_total", total)
        .metric("images_with_alt", with_alt)
        .metric("images_missing_alt", missing.len())
        .examples(missing)
}

fn buttons_accessible_name(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let mut total = 0usize;
    let mut unnamed = Vec::new();

    for element in document.select(&selectors.button_like) {
        let is_button = element.value().name() == "button";
        if !is_button && !BUTTON_INPUT_TYPES.contains(&input_type(&element).as_str()) {
            continue;
        }
        total += 1;

        let named = has_any_nonblank(&element, BUTTON_NAME_ATTRS)
            || (is_button && !text_of(&element).is_empty());
        if !named {
            unnamed.push(json!({ "tag": describe(&element) }));
        }
    }

    RuleOutcome::new(unnamed.is_empty())
        .metric("buttons_total", total)
        .metric("buttons_named", total - unnamed.len())
        .examples(unnamed)
}

fn links_discernible(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let mut total = 0usize;
    let mut unnamed = Vec::new();

    for link in document.select(&selectors.anchor) {
        total += 1;
        let labelled_image = link
            .select(&selectors.img)
            .any(|img| is_nonblank(img.value().attr("alt")));

        let named = has_any_nonblank(&link, LINK_NAME_ATTRS)
            || labelled_image
            || !text_of(&link).is_empty();
        if !named {
            unnamed.push(json!({ "href": link.value().attr("href").unwrap_or("") }));
        }
    }

    RuleOutcome::new(unnamed.is_empty())
        .metric("links_total", total)
        .metric("links_named", total - unnamed.len())
        .examples(unnamed)
}

fn form_labels(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let label_targets: HashSet<&str> = document
        .select(&selectors.label_for)
        .filter_map(|label| label.value().attr("for"))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .collect();

    // Controls inside a <label>. Each outermost label walks its subtree once
    // and nested labels are skipped, so no node is visited twice.
    let mut nested_labels = HashSet::new();
    let mut wrapped = HashSet::new();
    for label in document.select(&selectors.label) {
        if nested_labels.contains(&label.id()) {
            continue;
        }
        for node in label.descendants().skip(1).filter_map(ElementRef::wrap) {
            match node.value().name() {
                "label" => {
                    nested_labels.insert(node.id());
                }
                "input" | "select" | "textarea" => {
                    wrapped.insert(node.id());
                }
                _ => {}
            }
        }
    }

    let mut total = 0usize;
    let mut unlabelled = Vec::new();

    for control in document.select(&selectors.control) {
        if control.value().name() == "input"
            && LABEL_EXEMPT_INPUT_TYPES.contains(&input_type(&control).as_str())
        {
            continue;
        }
        total += 1;

        let by_for = control
            .value()
            .attr("id")
            .is_some_and(|id| label_targets.contains(id.trim()));
        let labelled = by_for
            || has_any_nonblank(&control, CONTROL_LABEL_ATTRS)
            || wrapped.contains(&control.id());
        if !labelled {
            unlabelled.push(json!({ "tag": describe(&control) }));
        }
    }

    RuleOutcome::new(unlabelled.is_empty())
        .metric("controls_total", total)
        .metric("controls_unlabelled", unlabelled.len())
        .metric("labels_with_for", label_targets.len())
        .examples(unlabelled)
}

fn headings_sequential(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let levels: Vec<u8> = document
        .select(&selectors.heading)
        .filter_map(|h| h.value().name().strip_prefix('h')?.parse().ok())
        .collect();
    headings_outcome(&levels)
}

fn viewport_scaling(document: &Html, selectors: &Selectors) -> RuleOutcome {
    let mut viewports = 0usize;
    let mut blocking = Vec::new();

    for meta in document.select(&selectors.meta) {
        let is_viewport = meta
            .value()
            .attr("name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("viewport"));
        if !is_viewport {
            continue;
        }
        viewports += 1;
        let content = meta.value().attr("content").unwrap_or("");
        if viewport_blocks_zoom(content) {
            blocking.push(json!({ "content": content }));
        }
    }

    RuleOutcome::new(blocking.is_empty())
        .metric("viewport_tags", viewports)
        .examples(blocking)
}
