//! HTTP server: routes requests to the content pipeline
//!
//! Every page response is cached whole under its path and query. Document
//! pages and listings use different TTLs; empty listings and missing
//! documents are never cached.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{self, CacheStatus, Cached};
use crate::config::SiteConfig;
use crate::content::{is_valid_slug, Collection};
use crate::{page, RenderedListing, Verdict};

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

/// Build the application router
pub fn router(app: Verdict) -> Router {
    let site = Arc::new(app.config().clone());

    Router::new()
        .route("/", get(home))
        .route("/reviews", get(reviews_index))
        .route("/reviews/:slug", get(review))
        .route("/compare/:slug", get(comparison))
        .route("/search", get(search))
        .fallback(fallback)
        .with_state(app)
        .layer(CatchPanicLayer::custom(move |_: Box<dyn Any + Send + 'static>| {
            tracing::error!("Request handler panicked");
            error_response(&site)
        }))
        .layer(TraceLayer::new_for_http())
}

/// Start the server and run until Ctrl+C
pub async fn start(app: Verdict, ip: &str, port: u16) -> Result<()> {
    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let sweep = cache::spawn_sweep(app.cache().clone(), app.config().cache.sweep_interval());

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}

async fn home(State(app): State<Verdict>, uri: Uri) -> Response {
    listing_response(&app, &uri, || app.render_home()).await
}

async fn reviews_index(State(app): State<Verdict>, uri: Uri) -> Response {
    listing_response(&app, &uri, || app.render_listing(Collection::Reviews)).await
}

async fn review(State(app): State<Verdict>, Path(slug): Path<String>, uri: Uri) -> Response {
    document_response(&app, Collection::Reviews, &slug, &uri).await
}

async fn comparison(State(app): State<Verdict>, Path(slug): Path<String>, uri: Uri) -> Response {
    document_response(&app, Collection::Comparisons, &slug, &uri).await
}

async fn search(
    State(app): State<Verdict>,
    Query(params): Query<SearchParams>,
    uri: Uri,
) -> Response {
    let query = params.q.unwrap_or_default();
    listing_response(&app, &uri, || app.render_search(&query)).await
}

async fn fallback(State(app): State<Verdict>, uri: Uri) -> Response {
    not_found_response(app.config(), uri.path())
}

async fn document_response(app: &Verdict, collection: Collection, slug: &str, uri: &Uri) -> Response {
    if !is_valid_slug(slug) {
        return not_found_response(app.config(), uri.path());
    }

    let ttl = app.config().cache.page_ttl();
    let key = cache::page_key(uri.path(), uri.query());
    let cached = app
        .cache()
        .get_or_produce(&key, ttl, || async {
            app.render_document(collection, slug).await.map(Bytes::from)
        })
        .await;

    match cached {
        Some(cached) => page_response(&key, cached, ttl),
        None => not_found_response(app.config(), uri.path()),
    }
}

async fn listing_response<F, Fut>(app: &Verdict, uri: &Uri, render: F) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = RenderedListing>,
{
    let ttl = app.config().cache.listing_ttl();
    let key = cache::page_key(uri.path(), uri.query());
    let mut uncached = None;
    let slot = &mut uncached;

    let cached = app
        .cache()
        .get_or_produce(&key, ttl, || async move {
            let listing = render().await;
            if listing.entries == 0 {
                *slot = Some(listing.html);
                None
            } else {
                Some(Bytes::from(listing.html))
            }
        })
        .await;

    match (cached, uncached) {
        (Some(cached), _) => page_response(&key, cached, ttl),
        (None, Some(html)) => {
            let mut response = Html(html).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert("x-cache", HeaderValue::from_static("miss"));
            response
        }
        (None, None) => error_response(app.config()),
    }
}

fn page_response(key: &str, cached: Cached, ttl: Duration) -> Response {
    tracing::debug!(key, cache = cached.status.as_str(), "Serving page");

    let x_cache = match cached.status {
        CacheStatus::Hit => "hit",
        CacheStatus::Miss | CacheStatus::Bypass => "miss",
    };

    let mut response = (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        cached.payload,
    )
        .into_response();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert("x-cache", HeaderValue::from_static(x_cache));
    response
}

fn not_found_response(site: &SiteConfig, path: &str) -> Response {
    (StatusCode::NOT_FOUND, Html(page::not_found_page(site, path))).into_response()
}

fn error_response(site: &SiteConfig) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(page::error_page(site))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentSource, DirEntry};
    use crate::testing::{test_config, MemorySource, WIDGET_X};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn setup(source: MemorySource) -> (Router, Arc<MemorySource>) {
        let source = Arc::new(source);
        let app = Verdict::with_source(test_config(), source.clone());
        (router(app), source)
    }

    #[tokio::test]
    async fn test_review_page() {
        let (router, _) = setup(MemorySource::new().with("reviews/widget-x.md", WIDGET_X));
        let (status, headers, body) = get(router, "/reviews/widget-x").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Hello <strong>world</strong>"));
        assert_eq!(headers["content-type"], "text/html; charset=utf-8");
        assert_eq!(headers["cache-control"], "public, max-age=15552000");
        assert_eq!(headers["x-cache"], "miss");
    }

    #[tokio::test]
    async fn test_second_request_is_a_cache_hit() {
        let (router, source) = setup(MemorySource::new().with("reviews/widget-x.md", WIDGET_X));

        let (_, _, first) = get(router.clone(), "/reviews/widget-x").await;
        let (status, headers, second) = get(router, "/reviews/widget-x").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-cache"], "hit");
        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let (router, source) = setup(MemorySource::new());

        for uri in ["/reviews/does-not-exist", "/compare/nope", "/reviews/..%2Fsecrets"] {
            let (status, _, body) = get(router.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(body.contains("not found"));
        }
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (router, _) = setup(MemorySource::new());
        let (status, _, body) = get(router, "/wp-admin").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("not found"));
    }

    #[tokio::test]
    async fn test_concurrent_cold_requests_both_succeed() {
        let source = MemorySource::new()
            .with("comparisons/widget-x-vs-gizmo.md", WIDGET_X)
            .with_delay(Duration::from_millis(50));
        let (router, source) = setup(source);

        let (a, b) = tokio::join!(
            get(router.clone(), "/compare/widget-x-vs-gizmo"),
            get(router.clone(), "/compare/widget-x-vs-gizmo"),
        );

        assert_eq!(a.0, StatusCode::OK);
        assert_eq!(b.0, StatusCode::OK);
        assert!(a.2.contains("Hello <strong>world</strong>"));
        assert_eq!(a.2, b.2);
        assert!(source.fetch_count() >= 1);
    }

    #[tokio::test]
    async fn test_home_and_search() {
        let (router, _) = setup(
            MemorySource::new()
                .with("reviews/widget-x.md", WIDGET_X)
                .with("comparisons/widget-x-vs-gizmo.md", WIDGET_X),
        );

        let (status, headers, body) = get(router.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["cache-control"], "public, max-age=10800");
        assert!(body.contains(r#"href="/reviews/widget-x""#));
        assert!(body.contains(r#"href="/compare/widget-x-vs-gizmo""#));

        let (status, _, body) = get(router.clone(), "/search?q=gizmo").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"href="/compare/widget-x-vs-gizmo""#));
        assert!(!body.contains(r#"href="/reviews/widget-x""#));

        let (status, headers, body) = get(router, "/search?q=toaster").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["cache-control"], "no-store");
        assert!(body.contains("No results for"));
    }

    /// Content source whose fetch panics
    struct PanickingSource;

    #[async_trait]
    impl ContentSource for PanickingSource {
        async fn fetch(&self, _path: &str) -> Option<String> {
            panic!("content store exploded");
        }

        async fn list(&self, _path: &str) -> Vec<DirEntry> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_panic_renders_error_page() {
        let app = Verdict::with_source(test_config(), Arc::new(PanickingSource));
        let (status, _, body) = get(router(app), "/reviews/widget-x").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Something went wrong"));
    }
}
