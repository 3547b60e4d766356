// SPDX-License-Identifier: PMPL-1.0-or-later
//! Fetch adapter: retrieves HTML for URL-only audits.
//!
//! Failures are reported, never retried. Certificate checks are relaxed by
//! default (see [`FetchConfig`]) so staging hosts remain reachable; the body
//! is only ever read as text.

use crate::config::FetchConfig;
use crate::error::FetchError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of HTML for a URL
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

/// Parse and restrict to http(s)
pub fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::InvalidUrl(format!("unsupported scheme {}", scheme))),
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url = parse_url(url)?;
        debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().map_err(|e| {
            let err = FetchError::from(e);
            warn!("Fetch of {} failed: {}", url, err);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetch of {} returned {}", url, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text()?;
        if body.trim().is_empty() {
            warn!("Fetch of {} returned an empty body", url);
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_accepts_http() {
        assert!(parse_url("https://example.org/page").is_ok());
        assert!(parse_url("  http://localhost:8080 ").is_ok());
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        let err = parse_url("file:///etc/passwd").unwrap_err();
        assert_eq!(err.code(), "invalid_url");
        assert!(matches!(parse_url("not a url"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(HttpFetcher::new(&FetchConfig::default()).is_ok());
    }
}
