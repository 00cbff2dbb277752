// ICS Feed - Web Server
// Exposes the cached feed pipeline over HTTP with Axum

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use ics_feed::{FeedService, HttpFetcher, ResponseSource, SqliteCache, SqlitePropertyStore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<FeedService>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

/// Strong ETag of a response body
fn etag_for(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("\"{:x}\"", hasher.finalize())
}

/// If-None-Match check: comma-separated list, weak tags compare equal, `*` matches
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag
    })
}

fn source_label(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "cache",
        ResponseSource::Regenerated => "regenerated",
        ResponseSource::Error => "error",
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/events - The feed (JSON array, or {"error": ...})
async fn get_events(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let service = state.service.clone();

    let feed = match tokio::task::spawn_blocking(move || service.handle()).await {
        Ok(feed) => feed,
        Err(e) => {
            error!("Feed worker crashed: {}", e);
            let body = serde_json::json!({ "error": "internal error" }).to_string();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, ics_feed::JSON_CONTENT_TYPE)],
                body,
            )
                .into_response();
        }
    };

    let etag = etag_for(&feed.body);
    let not_modified = !feed.is_error()
        && headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(|v| etag_matches(v, &etag))
            .unwrap_or(false);

    if not_modified {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, feed.content_type.to_string()),
            (header::ETAG, etag),
            (
                header::HeaderName::from_static("x-feed-source"),
                source_label(feed.source).to_string(),
            ),
        ],
        feed.body,
    )
        .into_response()
}

/// POST /api/cache/clear - Force regeneration on the next read
async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let service = state.service.clone();

    match tokio::task::spawn_blocking(move || service.request_clear()).await {
        Ok(Ok(())) => (StatusCode::OK, Json(ApiResponse::ok("cleared"))).into_response(),
        Ok(Err(e)) => {
            error!("Error raising clear flag: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failed("", e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!("Clear worker crashed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failed("", "internal error".to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn build_service(db_path: &Path) -> Result<FeedService> {
    let properties = Arc::new(
        SqlitePropertyStore::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?,
    );
    let cache = Arc::new(
        SqliteCache::open(db_path)
            .with_context(|| format!("Failed to open cache: {}", db_path.display()))?,
    );
    // Built outside the async runtime: the blocking client owns its own
    let fetcher = Arc::new(HttpFetcher::new().context("Failed to create HTTP client")?);

    Ok(FeedService::new(properties, cache, fetcher))
}

async fn serve(state: AppState, addr: String) -> Result<()> {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/events", get(get_events))
        .route("/cache/clear", post(clear_cache))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🚀 Server running on http://{}", addr);
    info!("   Feed: http://{}/api/events", addr);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ics_feed=info,tower_http=info")),
        )
        .init();

    let db_path = std::env::var_os("ICS_FEED_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ics-feed.db"));
    let addr = std::env::var("ICS_FEED_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let state = AppState {
        service: Arc::new(build_service(&db_path)?),
    };
    info!("✓ Database opened: {}", db_path.display());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(serve(state, addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_is_stable_and_quoted() {
        let a = etag_for("[]");
        assert_eq!(a, etag_for("[]"));
        assert!(a.starts_with('"') && a.ends_with('"'));
        assert_ne!(a, etag_for("[{}]"));
    }

    #[test]
    fn test_if_none_match_lists_and_weak_tags() {
        let etag = etag_for("[]");
        let other = etag_for("[{}]");

        assert!(etag_matches(&etag, &etag));
        assert!(etag_matches(&format!("{}, {}", other, etag), &etag));
        assert!(etag_matches(&format!("W/{}", etag), &etag));
        assert!(etag_matches("*", &etag));
        assert!(!etag_matches(&other, &etag));
        assert!(!etag_matches("", &etag));
    }
}
