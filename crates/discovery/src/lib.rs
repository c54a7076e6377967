// Route discovery: static marketing routes plus published content from the store

pub mod supabase;

use async_trait::async_trait;
use prerender_core::Route;
use serde::Deserialize;
use std::collections::HashSet;

pub use supabase::SupabaseSource;

/// A blog post row (`select=slug`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostRow {
    #[serde(default)]
    pub slug: Option<String>,
}

/// A project row (`select=slug,id`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectRow {
    #[serde(default)]
    pub slug: Option<String>,
    /// Row id; uuid strings and numeric ids both occur.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl PostRow {
    pub fn identifier(&self) -> Option<String> {
        non_blank(self.slug.as_deref())
    }
}

impl ProjectRow {
    /// The slug, or the id when the slug is missing or blank.
    pub fn identifier(&self) -> Option<String> {
        non_blank(self.slug.as_deref()).or_else(|| match &self.id {
            Some(serde_json::Value::String(s)) => non_blank(Some(s)),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read-only access to the published content that gets its own pages.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Published blog posts.
    async fn published_posts(&self) -> anyhow::Result<Vec<PostRow>>;

    /// All portfolio projects.
    async fn projects(&self) -> anyhow::Result<Vec<ProjectRow>>;
}

/// Build the list of routes to snapshot.
///
/// Starts from `static_routes` (kept in order) and appends `/blog/<slug>`
/// for every published post and `/portfolio/<slug-or-id>` for every project.
/// Discovery never fails: without a source only the static routes are
/// returned, and a failing query contributes no routes. Duplicates are
/// dropped, keeping the first occurrence.
pub async fn discover_routes(
    static_routes: &[Route],
    source: Option<&dyn ContentSource>,
) -> Vec<Route> {
    let mut routes = static_routes.to_vec();

    let Some(source) = source else {
        tracing::warn!("content store credentials not found, skipping dynamic routes");
        return dedupe(routes);
    };

    match source.published_posts().await {
        Ok(posts) => {
            let found = posts.iter().filter_map(PostRow::identifier);
            routes.extend(child_routes("/blog", found));
        }
        Err(e) => tracing::error!(error = %format!("{:#}", e), "failed to fetch blog posts"),
    }

    match source.projects().await {
        Ok(projects) => {
            let found = projects.iter().filter_map(ProjectRow::identifier);
            routes.extend(child_routes("/portfolio", found));
        }
        Err(e) => tracing::error!(error = %format!("{:#}", e), "failed to fetch projects"),
    }

    dedupe(routes)
}

fn child_routes<'a>(
    prefix: &'a str,
    identifiers: impl Iterator<Item = String> + 'a,
) -> impl Iterator<Item = Route> + 'a {
    identifiers.filter_map(move |id| match Route::child(prefix, &id) {
        Ok(route) => Some(route),
        Err(e) => {
            tracing::warn!(error = %e, "skipping content with unusable identifier");
            None
        }
    })
}

fn dedupe(routes: Vec<Route>) -> Vec<Route> {
    let mut seen = HashSet::new();
    routes
        .into_iter()
        .filter(|route| seen.insert(route.clone()))
        .collect()
}
