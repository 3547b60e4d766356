// SPDX-License-Identifier: PMPL-1.0-or-later
//! Directory scanner: audits every HTML file under a tree.

use crate::auditor::Auditor;
use crate::error::Result;
use crate::model::{AuditInput, AuditResponse};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// File extensions to scan
const SCANNABLE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Directories to skip
const SKIP_DIRS: &[&str] = &[
    "node_modules", ".git", "target", "dist", "build", "_build", "vendor", "coverage",
];

/// Audit outcome for one file
#[derive(Debug, Clone, Serialize)]
pub struct FileAudit {
    pub path: PathBuf,
    pub response: AuditResponse,
}

impl FileAudit {
    /// True when the audit succeeded and every check passed
    pub fn passed(&self) -> bool {
        self.response
            .report
            .as_ref()
            .is_some_and(|r| self.response.ok && r.summary.fail_list.is_empty())
    }
}

/// Audit every `.html`/`.htm` file under `dir`, in path order
pub fn scan_directory(dir: &Path, auditor: &Auditor) -> Result<Vec<FileAudit>> {
    let mut results = Vec::new();

    info!("Scanning directory: {}", dir.display());

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or("");
            if e.depth() > 0 && e.file_type().is_dir() {
                return !SKIP_DIRS.contains(&name) && !name.starts_with('.');
            }
            true
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        if !entry.file_type().is_file() || !is_scannable(entry.path()) {
            continue;
        }

        let path = entry.path();
        let content = match read_html(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let response = auditor.audit_response(&AuditInput::html(content));
        results.push(FileAudit { path: path.to_path_buf(), response });
    }

    let failing = results.iter().filter(|r| !r.passed()).count();
    info!("Scanned {} files, {} with failing checks", results.len(), failing);

    Ok(results)
}

/// Audit a single file
pub fn scan_file(path: &Path, auditor: &Auditor) -> Result<FileAudit> {
    let content = read_html(path)?;
    Ok(FileAudit {
        path: path.to_path_buf(),
        response: auditor.audit_response(&AuditInput::html(content)),
    })
}

/// File contents as text. Bytes that are not UTF-8 (legacy Latin-1 pages)
/// become U+FFFD instead of failing the read.
fn read_html(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_scannable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SCANNABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
