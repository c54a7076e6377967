// Output validation: checks a prerendered build directory after a run

use anyhow::{Context, Result};
use prerender_core::Route;
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// What is wrong with a route's snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotProblem {
    Missing,
    Empty,
    /// File exists but has no `<html` root element.
    NotHtml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteIssue {
    pub route: Route,
    pub problem: SnapshotProblem,
}

/// State of the client-rendered fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShellStatus {
    pub admin_present: bool,
    pub not_found_present: bool,
    /// Both present with identical bytes.
    pub identical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub issues: Vec<RouteIssue>,
    pub shells: ShellStatus,
    /// Every `index.html` found under the output root.
    pub snapshots_found: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty() && self.shells.admin_present && self.shells.not_found_present
    }
}

/// Check the snapshot of every route plus the SPA fallbacks under `root`.
pub fn validate_output(root: &Path, routes: &[Route]) -> Result<ValidationReport> {
    if !root.is_dir() {
        anyhow::bail!("Output directory does not exist: {}", root.display());
    }

    let mut issues = Vec::new();
    for route in routes {
        if let Some(problem) = check_snapshot(&route.output_path(root))? {
            issues.push(RouteIssue {
                route: route.clone(),
                problem,
            });
        }
    }

    Ok(ValidationReport {
        checked: routes.len(),
        issues,
        shells: check_shells(root)?,
        snapshots_found: count_snapshots(root),
    })
}

fn check_snapshot(path: &Path) -> Result<Option<SnapshotProblem>> {
    if !path.is_file() {
        return Ok(Some(SnapshotProblem::Missing));
    }

    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(SnapshotProblem::Empty));
    }

    let html = String::from_utf8_lossy(&bytes).to_ascii_lowercase();
    if !html.contains("<html") {
        return Ok(Some(SnapshotProblem::NotHtml));
    }

    Ok(None)
}

fn check_shells(root: &Path) -> Result<ShellStatus> {
    let admin = root.join("admin").join("index.html");
    let not_found = root.join("404.html");

    let admin_present = admin.is_file();
    let not_found_present = not_found.is_file();

    let identical = if admin_present && not_found_present {
        let a = fs::read(&admin)
            .with_context(|| format!("Failed to read {}", admin.display()))?;
        let b = fs::read(&not_found)
            .with_context(|| format!("Failed to read {}", not_found.display()))?;
        a == b
    } else {
        false
    };

    Ok(ShellStatus {
        admin_present,
        not_found_present,
        identical,
    })
}

fn count_snapshots(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "index.html")
        .count()
}
