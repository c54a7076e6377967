use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A site path to snapshot, e.g. `/` or `/blog/my-post`.
///
/// Always begins with `/`, never ends with `/` (except the root route) and
/// never contains empty, `.` or `..` segments, so the derived output path
/// always stays inside the output root. URL delimiters (`#`, `?`) and `%`
/// are rejected so the URL the browser loads names the same path as the
/// snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Route(String);

impl Route {
    /// The root route `/`.
    pub fn root() -> Self {
        Route("/".to_string())
    }

    /// Parse and normalize a route string.
    ///
    /// ```text
    /// Route::parse("/about")     → Ok("/about")
    /// Route::parse("/about/")    → Ok("/about")
    /// Route::parse("about")      → Err("must begin with '/'")
    /// Route::parse("/a/../etc")  → Err("'..' segments not allowed")
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRoute {
            route: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must begin with '/'"));
        }
        if raw == "/" {
            return Ok(Route::root());
        }

        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        for segment in trimmed[1..].split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("'.' and '..' segments not allowed")),
                s if s.contains('\\') => return Err(invalid("backslashes not allowed")),
                s if s.contains(['#', '?', '%']) => {
                    return Err(invalid("'#', '?' and '%' not allowed"));
                }
                s if s.chars().any(char::is_control) => {
                    return Err(invalid("control characters not allowed"));
                }
                _ => {}
            }
        }

        Ok(Route(trimmed.to_string()))
    }

    /// Build `<prefix>/<identifier>` from a content identifier (slug or id).
    ///
    /// Identifiers must be a single path segment.
    pub fn child(prefix: &str, identifier: &str) -> Result<Self> {
        let reason = if identifier.is_empty() {
            Some("empty identifier")
        } else if identifier.contains('/') {
            Some("identifier contains '/'")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(Error::InvalidRoute {
                route: format!("{}/{}", prefix, identifier),
                reason: reason.to_string(),
            });
        }
        Route::parse(&format!("{}/{}", prefix.trim_end_matches('/'), identifier))
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the snapshot file for this route under `root`.
    ///
    /// `/` maps to `root/index.html`, `/blog/post` maps to
    /// `root/blog/post/index.html`.
    pub fn output_path(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            return root.join("index.html");
        }
        self.0[1..]
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
            .join("index.html")
    }

    /// Absolute URL of this route on the server at `base`.
    pub fn url(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Route {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Route::parse(&value)
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.0
    }
}

/// Browser viewport used for every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1280,
            height: 800,
        }
    }
}

/// Result of rendering a single route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutcome {
    pub route: Route,
    #[serde(flatten)]
    pub status: RenderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenderStatus {
    /// Snapshot written to `path`.
    Rendered { path: PathBuf, bytes: usize },
    /// Navigation, capture or write failed; nothing was written.
    Failed { error: String },
}

impl RenderOutcome {
    pub fn rendered(route: Route, path: PathBuf, bytes: usize) -> Self {
        RenderOutcome {
            route,
            status: RenderStatus::Rendered { path, bytes },
        }
    }

    pub fn failed(route: Route, error: impl fmt::Display) -> Self {
        RenderOutcome {
            route,
            status: RenderStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.status, RenderStatus::Rendered { .. })
    }
}

/// Counts over a finished render loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub rendered: usize,
    pub failed: usize,
}

impl RenderSummary {
    pub fn from_outcomes(outcomes: &[RenderOutcome]) -> Self {
        outcomes.iter().fold(RenderSummary::default(), |mut acc, o| {
            if o.is_rendered() {
                acc.rendered += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.rendered + self.failed
    }
}
