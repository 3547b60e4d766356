// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for a11yaudit

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can surface from an audit or from the ambient layers
/// (configuration, report storage).
///
/// Only [`AuditError::EmptyInput`] and [`AuditError::Fetch`] are produced by
/// [`crate::auditor::Auditor::audit`]; rule and evaluator failures are
/// absorbed inside the audit.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Empty input")]
    EmptyInput,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report store error: {0}")]
    Store(String),
}

impl AuditError {
    /// Machine-readable code carried in `{ ok: false, error, code }` responses
    pub fn code(&self) -> Option<String> {
        match self {
            AuditError::EmptyInput => Some("empty_input".to_string()),
            AuditError::Fetch(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// Failure retrieving HTML for a URL-only audit
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Empty HTML")]
    EmptyBody,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{source}")]
    Network {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    pub fn code(&self) -> String {
        match self {
            FetchError::Status(status) => status.to_string(),
            FetchError::EmptyBody => "empty_body".to_string(),
            FetchError::InvalidUrl(_) => "invalid_url".to_string(),
            FetchError::Network { kind, .. } => (*kind).to_string(),
            FetchError::Client(_) => "client".to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(source: reqwest::Error) -> Self {
        let kind = if source.is_timeout() {
            "timeout"
        } else if source.is_connect() {
            "connect"
        } else if source.is_redirect() {
            "redirect"
        } else {
            "request"
        };
        FetchError::Network { kind, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_message() {
        assert_eq!(AuditError::EmptyInput.to_string(), "Empty input");
        assert_eq!(AuditError::EmptyInput.code().as_deref(), Some("empty_input"));
    }

    #[test]
    fn test_fetch_codes() {
        let err = AuditError::from(FetchError::Status(404));
        assert_eq!(err.to_string(), "HTTP status 404");
        assert_eq!(err.code().as_deref(), Some("404"));

        assert_eq!(FetchError::EmptyBody.to_string(), "Empty HTML");
        assert_eq!(FetchError::EmptyBody.code(), "empty_body");
    }

    #[test]
    fn test_ambient_errors_have_no_code() {
        assert!(AuditError::Config("bad".into()).code().is_none());
        assert!(AuditError::Store("locked".into()).code().is_none());
    }
}
