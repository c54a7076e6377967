// Content store REST client (PostgREST endpoints of the hosted database)

use crate::{ContentSource, PostRow, ProjectRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use prerender_core::ContentStoreConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads published content with the anonymous key, so only rows visible
/// under row-level security for anonymous visitors are returned.
pub struct SupabaseSource {
    client: reqwest::Client,
    base_url: String,
}

impl SupabaseSource {
    pub fn new(config: &ContentStoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key).context("Invalid content store key")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
                .context("Invalid content store key")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `/rest/v1/<table>?<query>` and decode the JSON array of rows.
    async fn select<T: DeserializeOwned>(&self, table: &str, query: &str) -> Result<Vec<T>> {
        let url = format!("{}/rest/v1/{}?{}", self.base_url, table, query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to '{}' failed", table))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Query on '{}' failed ({}): {}", table, status, body);
        }

        let rows: Vec<T> = response
            .json()
            .await
            .with_context(|| format!("Invalid rows returned for '{}'", table))?;

        tracing::debug!(table, rows = rows.len(), "content query complete");
        Ok(rows)
    }
}

#[async_trait]
impl ContentSource for SupabaseSource {
    async fn published_posts(&self) -> Result<Vec<PostRow>> {
        self.select("blog_posts", "select=slug&published=is.true")
            .await
    }

    async fn projects(&self) -> Result<Vec<ProjectRow>> {
        self.select("projects", "select=slug,id").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover_routes;
    use axum::{
        Json, Router,
        extract::RawQuery,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
    };
    use prerender_core::Route;
    use serde_json::json;

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn authorized(headers: &HeaderMap) -> bool {
        header(headers, "apikey") == Some("anon-key")
            && header(headers, "authorization") == Some("Bearer anon-key")
    }

    async fn blog_posts(headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.as_deref(), Some("select=slug&published=is.true"));
        let rows = json!([{ "slug": "hello-world" }, { "slug": null }]);
        Json(rows).into_response()
    }

    async fn projects(headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.as_deref(), Some("select=slug,id"));
        let rows = json!([{ "slug": "acme", "id": "1" }, { "slug": null, "id": "f00d" }]);
        Json(rows).into_response()
    }

    /// Serve a fake REST endpoint on an ephemeral port, returning its base URL
    async fn spawn_store(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn store(url: String, key: &str) -> ContentStoreConfig {
        ContentStoreConfig {
            url,
            anon_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetches_rows_with_key_headers() {
        let app = Router::new()
            .route("/rest/v1/blog_posts", get(blog_posts))
            .route("/rest/v1/projects", get(projects));
        let url = spawn_store(app).await;

        let config = store(format!("{}/", url), "anon-key");
        let source = SupabaseSource::new(&config).unwrap();

        let posts = source.published_posts().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].identifier(), Some("hello-world".to_string()));

        let projects = source.projects().await.unwrap();
        assert_eq!(projects[1].identifier(), Some("f00d".to_string()));
    }

    #[tokio::test]
    async fn test_end_to_end_discovery() {
        let app = Router::new()
            .route("/rest/v1/blog_posts", get(blog_posts))
            .route("/rest/v1/projects", get(projects));
        let url = spawn_store(app).await;
        let source = SupabaseSource::new(&store(url, "anon-key")).unwrap();

        let statics = vec![Route::root(), Route::parse("/about").unwrap()];
        let routes = discover_routes(&statics, Some(&source)).await;
        let routes: Vec<&str> = routes.iter().map(Route::as_str).collect();
        assert_eq!(
            routes,
            vec![
                "/",
                "/about",
                "/blog/hello-world",
                "/portfolio/acme",
                "/portfolio/f00d"
            ]
        );
    }

    #[tokio::test]
    async fn test_unauthorized_is_error() {
        let app = Router::new().route("/rest/v1/blog_posts", get(blog_posts));
        let url = spawn_store(app).await;
        let source = SupabaseSource::new(&store(url, "wrong-key")).unwrap();

        let err = source.published_posts().await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_unreachable_store_degrades_to_static_routes() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = store(format!("http://{}", addr), "anon-key");
        let source = SupabaseSource::new(&config).unwrap();
        assert!(source.projects().await.is_err());

        let statics = vec![Route::root(), Route::parse("/faq").unwrap()];
        let routes = discover_routes(&statics, Some(&source)).await;
        assert_eq!(routes, statics);
    }

    #[test]
    fn test_rejects_key_with_newline() {
        let config = store("http://localhost".to_string(), "bad\nkey");
        assert!(SupabaseSource::new(&config).is_err());
    }
}
