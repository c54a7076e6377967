use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prerender_core::{Config, RenderOutcome, RenderStatus, RenderSummary};
use prerender_discovery::{ContentSource, discover_routes};
use prerender_renderer::{
    BrowserLauncher, BrowserLocator, ChromeLauncher, KnownPathsLocator, LaunchOptions,
    RenderOptions, ShellPreservation, preserve_spa_shell, render_routes,
};
use prerender_server::StaticServer;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{content_source, load_config};

/// Command-line overrides, applied on top of file and environment config
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub dist: Option<PathBuf>,
    pub port: Option<u16>,
    pub browser: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub settle_ms: Option<u64>,
    pub report: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(dist) = &self.dist {
            config.dist_dir = dist.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(browser) = &self.browser {
            config.browser = Some(browser.clone());
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                anyhow::bail!("--timeout-secs must be greater than zero");
            }
            config.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        Ok(())
    }
}

/// JSON report written with `--report`
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    generated_at: DateTime<Utc>,
    summary: RenderSummary,
    outcomes: &'a [RenderOutcome],
}

/// Prerender the build output.
///
/// Exits non-zero only when no browser is found or the run itself fails;
/// individual route failures are reported but do not fail the command.
pub async fn run(config_path: Option<&Path>, overrides: Overrides) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;

    println!("🔨 Prerendering site...");
    println!("   Output: {}", config.dist_dir.display());
    println!();

    let source = content_source(&config);
    let locator = KnownPathsLocator::from_env(config.browser.clone());

    let outcomes = run_pipeline(
        &config,
        source.as_ref().map(|s| s as &dyn ContentSource),
        &locator,
        &ChromeLauncher,
    )
    .await?;

    let summary = RenderSummary::from_outcomes(&outcomes);

    if let Some(path) = &overrides.report {
        write_report(path, &outcomes, summary)?;
        println!("   Report: {}", path.display());
    }

    for outcome in &outcomes {
        if let RenderStatus::Failed { error } = &outcome.status {
            println!("   ⚠ {}: {}", outcome.route, error);
        }
    }

    println!();
    println!("✅ Prerendering complete!");
    println!("   Rendered: {}/{}", summary.rendered, summary.total());
    if summary.failed > 0 {
        println!("   Failed:   {}", summary.failed);
    }
    println!();

    Ok(())
}

/// Full lifecycle: locate browser → start server → discover routes →
/// preserve shells → launch browser → render → close browser → stop server.
///
/// The server and browser are released in reverse order of acquisition on
/// every path, including errors.
pub async fn run_pipeline(
    config: &Config,
    source: Option<&dyn ContentSource>,
    locator: &dyn BrowserLocator,
    launcher: &dyn BrowserLauncher,
) -> Result<Vec<RenderOutcome>> {
    // Checked first so a machine without a browser fails before any file is touched
    let executable = locator.locate().context(
        "Could not find a Chrome, Chromium or Edge installation. \
         Install Google Chrome or set CHROME_PATH.",
    )?;

    tracing::info!("starting static server");
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let server = StaticServer::start(&config.dist_dir, addr).await?;

    let result = crawl(config, source, &executable, launcher, &server.base_url()).await;

    let stopped = server.shutdown().await;
    let outcomes = result?;
    stopped?;

    Ok(outcomes)
}

async fn crawl(
    config: &Config,
    source: Option<&dyn ContentSource>,
    executable: &Path,
    launcher: &dyn BrowserLauncher,
    base_url: &str,
) -> Result<Vec<RenderOutcome>> {
    tracing::info!("fetching routes");
    let routes = discover_routes(&config.static_routes, source).await;
    tracing::info!(count = routes.len(), "found routes to prerender");

    if let ShellPreservation::MissingRoot = preserve_spa_shell(&config.dist_dir).await? {
        tracing::warn!("continuing without SPA fallbacks");
    }

    tracing::info!("launching browser");
    let launch = LaunchOptions {
        viewport: config.viewport,
        request_timeout: config.navigation_timeout,
    };
    let browser = launcher.launch(executable, launch).await?;

    let options = RenderOptions {
        base_url: base_url.to_string(),
        output_root: config.dist_dir.clone(),
        navigation_timeout: config.navigation_timeout,
        settle_delay: config.settle_delay,
    };
    let outcomes = render_routes(browser.as_ref(), &routes, &options).await;

    if let Err(e) = browser.close().await {
        tracing::warn!(error = %format!("{:#}", e), "browser did not shut down cleanly");
    }

    Ok(outcomes)
}

fn write_report(path: &Path, outcomes: &[RenderOutcome], summary: RenderSummary) -> Result<()> {
    let report = RunReport {
        generated_at: Utc::now(),
        summary,
        outcomes,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
