//! Router configuration for the preview server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check
//! /preview
//!   POST /register                         - Register a dataset
//!   GET  /bounds/{id}                      - Geographic bounds
//!   GET  /tile/{id}/{z}/{x}/{y}.png        - Tile endpoint
//! *                                        - JSON 404
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_preview::server::routes::{create_router, RouterConfig};
//! use raster_preview::tile::PreviewService;
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://maps.example.com".to_string()])
//!     .with_cache_max_age(60);
//! let router = create_router(PreviewService::new(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{
    bounds_handler, fallback_handler, health_handler, register_handler, tile_handler, AppState,
};
use crate::tile::PreviewService;

/// Preflight responses are cached by browsers for a day.
const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Router Configuration
// =============================================================================

/// Settings for [`create_router`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for tiles in seconds (0 = no-cache)
    pub cache_max_age: u32,

    /// Whether to wrap the router in a `TraceLayer`
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any origin, `no-cache` tiles, tracing on.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 0,
            enable_tracing: true,
        }
    }

    /// Restrict CORS to these origins. An empty list disables CORS headers.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Let clients cache tiles for `seconds` (0 sends `no-cache`).
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router around `service`.
pub fn create_router(service: PreviewService, config: RouterConfig) -> Router {
    let state = AppState::with_cache_max_age(service, config.cache_max_age);

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/preview", preview_routes())
        .fallback(fallback_handler)
        .with_state(state)
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Routes mounted under `/preview`.
fn preview_routes() -> Router<AppState> {
    // {filename} captures both "{y}" and "{y}.png"
    Router::new()
        .route("/register", post(register_handler))
        .route("/bounds/{id}", get(bounds_handler))
        .route("/tile/{id}/{z}/{x}/{filename}", get(tile_handler))
}

fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => cors.allow_origin(parse_origins(origins)),
    }
}

/// Parse configured origins into header values, skipping invalid ones.
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}
