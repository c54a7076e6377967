use anyhow::Result;
use prerender_discovery::{ContentSource, discover_routes};
use prerender_validator::{SnapshotProblem, ValidationReport, validate_output};
use std::path::{Path, PathBuf};

use super::{content_source, load_config};

/// Check a finished run: one snapshot per discovered route plus both
/// SPA fallbacks. Fails when anything is missing.
pub async fn run(config_path: Option<&Path>, dist: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dist) = dist {
        config.dist_dir = dist;
    }

    println!("🔍 Verifying prerendered output...");
    println!("   Output: {}", config.dist_dir.display());
    println!();

    let source = content_source(&config);
    let routes = discover_routes(
        &config.static_routes,
        source.as_ref().map(|s| s as &dyn ContentSource),
    )
    .await;

    let report = validate_output(&config.dist_dir, &routes)?;
    print_report(&report);

    if !report.is_ok() {
        anyhow::bail!("Prerendered output is incomplete");
    }

    println!();
    println!("✅ Output verified");
    Ok(())
}

fn print_report(report: &ValidationReport) {
    let ok = report.checked - report.issues.len();
    println!("   ✓ {}/{} routes have snapshots", ok, report.checked);
    println!("   {} snapshot files on disk", report.snapshots_found);

    for issue in &report.issues {
        let problem = match issue.problem {
            SnapshotProblem::Missing => "missing",
            SnapshotProblem::Empty => "empty",
            SnapshotProblem::NotHtml => "not an HTML document",
        };
        println!("   ✗ {}: {}", issue.route, problem);
    }

    let shells = &report.shells;
    let mark = |present: bool| if present { "✓" } else { "✗" };
    println!("   {} admin/index.html", mark(shells.admin_present));
    println!("   {} 404.html", mark(shells.not_found_present));
    if shells.admin_present && shells.not_found_present && !shells.identical {
        println!("   ⚠ SPA fallbacks differ from each other");
    }
}
