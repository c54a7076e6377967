use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Outcome of copying the SPA shell to its client-rendered locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellPreservation {
    Created { admin: PathBuf, not_found: PathBuf },
    /// No `index.html` in the output root; nothing was copied.
    MissingRoot,
}

/// Copy the un-rendered `index.html` to `admin/index.html` and `404.html`.
///
/// The admin section and the not-found page must stay client-rendered, so
/// they get the original shell rather than a snapshot. Must run before the
/// root route is rendered, since that overwrites `index.html`.
pub async fn preserve_spa_shell(root: &Path) -> Result<ShellPreservation> {
    let index = root.join("index.html");
    if !tokio::fs::try_exists(&index).await.unwrap_or(false) {
        tracing::error!(path = %index.display(), "root document not found, cannot create SPA fallbacks");
        return Ok(ShellPreservation::MissingRoot);
    }

    let admin_dir = root.join("admin");
    let admin = admin_dir.join("index.html");
    let not_found = root.join("404.html");

    tokio::fs::create_dir_all(&admin_dir)
        .await
        .with_context(|| format!("Failed to create {}", admin_dir.display()))?;

    tokio::fs::copy(&index, &admin)
        .await
        .with_context(|| format!("Failed to copy shell to {}", admin.display()))?;
    tracing::info!(path = %admin.display(), "created SPA fallback");

    tokio::fs::copy(&index, &not_found)
        .await
        .with_context(|| format!("Failed to copy shell to {}", not_found.display()))?;
    tracing::info!(path = %not_found.display(), "created SPA fallback");

    Ok(ShellPreservation::Created { admin, not_found })
}
