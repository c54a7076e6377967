use crate::browser::{Browser, Page};
use anyhow::{Context, Result, anyhow};
use prerender_core::{RenderOutcome, Route};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one pass of the render loop
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Where the static server is listening, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    /// Snapshots are written below this directory.
    pub output_root: PathBuf,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
}

/// Render every route in order, one page at a time.
///
/// Per route: open page → navigate (bounded by `navigation_timeout`) →
/// settle → capture → write → close page. A failing route is logged and
/// reported as [`prerender_core::RenderStatus::Failed`]; it never stops the
/// loop and never leaves a partial file behind.
pub async fn render_routes(
    browser: &dyn Browser,
    routes: &[Route],
    options: &RenderOptions,
) -> Vec<RenderOutcome> {
    let mut outcomes = Vec::with_capacity(routes.len());

    for route in routes {
        tracing::info!(route = %route, "prerendering");

        let outcome = match render_route(browser, route, options).await {
            Ok((path, bytes)) => {
                tracing::info!(route = %route, path = %path.display(), bytes, "generated");
                RenderOutcome::rendered(route.clone(), path, bytes)
            }
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::error!(route = %route, error = %error, "failed to prerender");
                RenderOutcome::failed(route.clone(), error)
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}

async fn render_route(
    browser: &dyn Browser,
    route: &Route,
    options: &RenderOptions,
) -> Result<(PathBuf, usize)> {
    let mut page = browser.new_page().await.context("Failed to open page")?;

    let result = capture_and_write(page.as_mut(), route, options).await;

    // The page is closed whatever happened above
    if let Err(e) = page.close().await {
        tracing::warn!(route = %route, error = %e, "failed to close page");
    }

    result
}

async fn capture_and_write(
    page: &mut dyn Page,
    route: &Route,
    options: &RenderOptions,
) -> Result<(PathBuf, usize)> {
    let url = route.url(&options.base_url);

    tokio::time::timeout(options.navigation_timeout, page.navigate(&url))
        .await
        .map_err(|_| {
            anyhow!(
                "Navigation to {} timed out after {}s",
                url,
                options.navigation_timeout.as_secs_f32()
            )
        })?
        .with_context(|| format!("Navigation to {} failed", url))?;

    if !options.settle_delay.is_zero() {
        tokio::time::sleep(options.settle_delay).await;
    }

    let html = page.content().await.context("Failed to capture document")?;

    let path = route.output_path(&options.output_root);
    write_snapshot(&path, &html).await?;

    Ok((path, html.len()))
}

/// Write through a sibling temp file so a failed write never leaves a
/// truncated snapshot in place.
async fn write_snapshot(path: &Path, html: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let tmp = path.with_extension("html.tmp");
    tokio::fs::write(&tmp, html)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move snapshot to {}", path.display()))?;

    Ok(())
}
