// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report persistence.
//!
//! The auditor only ever calls [`ReportStore::save`], and treats a failure
//! there as non-fatal. `get` and `list` serve the CLI `reports` commands.

use crate::error::{AuditError, Result};
use crate::model::{AuditReport, AuditSummary, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Largest page size `list` will honour
pub const MAX_PER_PAGE: usize = 100;

/// A persisted report with its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: u64,
    pub report: AuditReport,
}

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListItem {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub engine: Engine,
    pub url: String,
    pub summary: AuditSummary,
}

impl ReportListItem {
    fn from_stored(stored: &StoredReport) -> Self {
        Self {
            id: stored.id,
            created_at: stored.report.created_at,
            engine: stored.report.engine,
            url: stored.report.url.clone(),
            summary: stored.report.summary.clone(),
        }
    }
}

/// A page of reports, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListing {
    pub items: Vec<ReportListItem>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

/// Storage backend for audit reports
pub trait ReportStore: Send + Sync {
    /// Persist a report and return its id
    fn save(&self, report: &AuditReport) -> Result<u64>;

    fn get(&self, id: u64) -> Result<Option<StoredReport>>;

    /// Page through reports by descending id. `page` is 1-based.
    fn list(&self, page: usize, per_page: usize) -> Result<ReportListing>;
}

/// In-process store, mostly for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: Mutex<Vec<StoredReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> AuditError {
    AuditError::Store("store lock poisoned".to_string())
}

impl ReportStore for MemoryStore {
    fn save(&self, report: &AuditReport) -> Result<u64> {
        let mut reports = self.reports.lock().map_err(poisoned)?;
        let id = reports.len() as u64 + 1;
        reports.push(StoredReport { id, report: report.clone() });
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<Option<StoredReport>> {
        let reports = self.reports.lock().map_err(poisoned)?;
        Ok(reports.iter().find(|r| r.id == id).cloned())
    }

    fn list(&self, page: usize, per_page: usize) -> Result<ReportListing> {
        let reports = self.reports.lock().map_err(poisoned)?;
        let newest_first: Vec<&StoredReport> = reports.iter().rev().collect();
        listing(page, per_page, newest_first.len(), |range| {
            Ok(newest_first[range].iter().map(|r| ReportListItem::from_stored(r)).collect())
        })
    }
}

/// Build a listing, loading only the requested window
fn listing<F>(page: usize, per_page: usize, total: usize, load: F) -> Result<ReportListing>
where
    F: FnOnce(std::ops::Range<usize>) -> Result<Vec<ReportListItem>>,
{
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let pages = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);

    Ok(ReportListing { items: load(start..end)?, page, per_page, total, pages })
}

/// One pretty-printed JSON file per report under a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("report-{:06}.json", id))
    }

    /// Ids present on disk, descending
    fn ids(&self) -> Result<Vec<u64>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("report-"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    fn read(&self, id: u64) -> Result<StoredReport> {
        let content = std::fs::read_to_string(self.path_for(id))?;
        let report: AuditReport = serde_json::from_str(&content)?;
        Ok(StoredReport { id, report })
    }
}

impl ReportStore for JsonDirStore {
    fn save(&self, report: &AuditReport) -> Result<u64> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(report)?;
        let mut id = self.ids()?.first().copied().unwrap_or(0) + 1;

        // Another writer may claim the same id; move on to the next one
        loop {
            let path = self.path_for(id);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(file, &path, &content)?;
                    debug!("Saved report {} to {}", id, path.display());
                    return Ok(id);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => id += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn get(&self, id: u64) -> Result<Option<StoredReport>> {
        if !self.path_for(id).exists() {
            return Ok(None);
        }
        self.read(id).map(Some)
    }

    fn list(&self, page: usize, per_page: usize) -> Result<ReportListing> {
        let ids = self.ids()?;
        listing(page, per_page, ids.len(), |range| {
            let items = ids[range]
                .iter()
                .filter_map(|&id| match self.read(id) {
                    Ok(stored) => Some(ReportListItem::from_stored(&stored)),
                    Err(e) => {
                        warn!("Skipping unreadable report {}: {}", id, e);
                        None
                    }
                })
                .collect();
            Ok(items)
        })
    }
}

/// Write a freshly claimed report file. A failed write removes the file so
/// no truncated report is left behind under a valid id.
fn write_or_remove<W: Write>(mut file: W, path: &Path, content: &str) -> Result<()> {
    if let Err(e) = file.write_all(content.as_bytes()).and_then(|()| file.flush()) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(path) {
            warn!("Could not remove partial report {}: {}", path.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckResult;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn report(url: &str) -> AuditReport {
        let checks = vec![CheckResult {
            id: "html_lang".to_string(),
            ok: true,
            rationale: "r".to_string(),
            metrics: BTreeMap::new(),
            examples: Vec::new(),
        }];
        let summary = AuditSummary::from_checks(&checks, |_| None, Vec::new());
        AuditReport {
            engine: Engine::Pattern,
            url: url.to_string(),
            created_at: Utc::now(),
            html_length: 10,
            truncated: false,
            timed_out: false,
            checks,
            summary,
        }
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        let id = store.save(&report("a")).unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.get(1).unwrap().unwrap().report.url, "a");
        assert!(store.get(2).unwrap().is_none());
    }

    #[test]
    fn test_memory_store_listing_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.save(&report(&format!("u{}", i))).unwrap();
        }
        let listing = store.list(1, 2).unwrap();
        assert_eq!(listing.total, 5);
        assert_eq!(listing.pages, 3);
        let ids: Vec<_> = listing.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![5, 4]);

        let last = store.list(3, 2).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, 1);
    }

    #[test]
    fn test_listing_clamps_paging() {
        let store = MemoryStore::new();
        store.save(&report("a")).unwrap();
        let listing = store.list(0, 0).unwrap();
        assert_eq!(listing.page, 1);
        assert_eq!(listing.per_page, 1);
        assert_eq!(listing.items.len(), 1);

        let listing = store.list(1, 10_000).unwrap();
        assert_eq!(listing.per_page, MAX_PER_PAGE);

        let beyond = store.list(9, 10).unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.pages, 1);
    }

    #[test]
    fn test_empty_listing() {
        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path().join("missing"));
        let listing = store.list(1, 20).unwrap();
        assert_eq!(listing.total, 0);
        assert_eq!(listing.pages, 0);
        assert!(listing.items.is_empty());
    }

    #[test]
    fn test_json_dir_store() {
        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path().join("reports"));

        assert_eq!(store.save(&report("https://a.example")).unwrap(), 1);
        assert_eq!(store.save(&report("https://b.example")).unwrap(), 2);
        assert!(store.dir().join("report-000002.json").exists());

        let stored = store.get(1).unwrap().unwrap();
        assert_eq!(stored.report.url, "https://a.example");
        assert!(store.get(7).unwrap().is_none());

        let listing = store.list(1, 20).unwrap();
        assert_eq!(listing.total, 2);
        assert_eq!(listing.items[0].url, "https://b.example");
        assert_eq!(listing.items[0].summary.score, 100);
    }

    #[test]
    fn test_json_dir_store_skips_taken_ids() {
        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path());
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(temp.path().join("report-000004.json"), "{}").unwrap();
        assert_eq!(store.save(&report("x")).unwrap(), 5);
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path());
        std::fs::write(temp.path().join("report-000001.json"), "not json").unwrap();
        assert!(matches!(store.get(1), Err(AuditError::Json(_))));
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        struct DiskFull;
        impl Write for DiskFull {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("no space left"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path());
        let path = temp.path().join("report-000001.json");
        std::fs::write(&path, "{\"engi").unwrap();

        let err = write_or_remove(DiskFull, &path, "{}").unwrap_err();
        assert!(matches!(err, AuditError::Io(_)));
        assert!(!path.exists());
        assert!(store.get(1).unwrap().is_none());
        assert_eq!(store.save(&report("next")).unwrap(), 1);
    }

    #[test]
    fn test_listing_skips_unreadable_reports() {
        let temp = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp.path());
        store.save(&report("first")).unwrap();
        std::fs::write(temp.path().join("report-000002.json"), "{\"engine\": \"pat").unwrap();
        store.save(&report("third")).unwrap();

        let listing = store.list(1, 20).unwrap();
        let urls: Vec<_> = listing.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["third", "first"]);
    }
}
