// SPDX-License-Identifier: PMPL-1.0-or-later
//! Evaluator back-ends for the shared rule set.
//!
//! - **Structured** (feature `structured`): parses the document with
//!   `scraper` and answers each rule with structural queries.
//! - **Pattern**: regex scanning only; always compiled and the fallback of
//!   last resort.

pub mod pattern;
#[cfg(feature = "structured")]
pub mod structured;

pub use crate::rules::Evaluation;
pub use pattern::PatternEvaluator;
#[cfg(feature = "structured")]
pub use structured::StructuredEvaluator;

use crate::budget::Deadline;
use crate::model::Engine;
use thiserror::Error;

/// Whole-evaluator failure. The auditor answers it by switching to the
/// pattern engine; it never reaches the caller.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("evaluator panicked: {0}")]
    Panicked(String),
}

/// A strategy that runs the full rule set over prepared HTML
pub trait Evaluator: Send + Sync {
    /// Engine name recorded in the report
    fn engine(&self) -> Engine;

    /// Evaluate every rule in order, honouring the deadline between rules
    fn evaluate(&self, html: &str, deadline: &Deadline) -> Result<Evaluation, EvaluatorError>;
}

/// The preferred evaluator this build can offer, if any
pub fn structured_evaluator() -> Option<Box<dyn Evaluator>> {
    #[cfg(feature = "structured")]
    {
        Some(Box::new(StructuredEvaluator))
    }
    #[cfg(not(feature = "structured"))]
    {
        None
    }
}
