// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11yaudit - heuristic WCAG accessibility audits for HTML documents
//!
//! Given raw HTML (or a URL to fetch), the [`auditor::Auditor`] runs a fixed
//! set of nine rules and returns a scored report. Two engines implement the
//! same rules:
//!
//! - **Structured** (feature `structured`, on by default): a parsed
//!   document tree queried with CSS selectors
//! - **Pattern**: regex scanning, always available, used as the fallback
//!   whenever the structured engine is absent or fails
//!
//! ## Rules
//!
//! - **document_title** (2.4.2): exactly one non-empty `<title>` in the head
//! - **html_lang** (3.1.1): `<html lang>` is present and non-empty
//! - **images_alt** (1.1.1): every `<img>` has non-empty alt text
//! - **buttons_accessible_name** (4.1.2): buttons carry a name
//! - **links_discernible** (2.4.4): links carry a name
//! - **form_labels** (3.3.2): form controls are labelled
//! - **headings_sequential** (1.3.1): no upward jump of more than one level
//! - **viewport_scaling** (1.4.4): zoom is not disabled or capped below 5x
//! - **aria_attributes_valid** (4.1.2): `aria-*` names are lowercase
//!
//! Colour contrast and touch target size need rendered layout and are left
//! to manual review; every report says so in its notes.
//!
//! ```no_run
//! use a11yaudit::{AuditConfig, AuditInput, Auditor};
//!
//! let auditor = Auditor::new(AuditConfig::default());
//! let report = auditor.audit(&AuditInput::html("<html lang=\"en\">...</html>"))?;
//! println!("score {}", report.summary.score);
//! # Ok::<(), a11yaudit::AuditError>(())
//! ```

pub mod auditor;
pub mod budget;
pub mod config;
pub mod error;
pub mod evaluators;
pub mod fetch;
pub mod model;
pub mod preprocess;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod store;

pub use auditor::Auditor;
pub use config::AuditConfig;
pub use error::{AuditError, FetchError, Result};
pub use model::{AuditInput, AuditReport, AuditResponse, CheckResult, Engine};
