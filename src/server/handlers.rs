//! HTTP request handlers for the preview API.
//!
//! # Endpoints
//!
//! - `POST /preview/register` - Register a dataset under an id
//! - `GET /preview/bounds/{id}` - Geographic extent of a preview
//! - `GET /preview/tile/{id}/{z}/{x}/{y}.png` - Serve a tile
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{DatasetError, PreviewError};
use crate::tile::{PreviewService, TileRequest, PNG_CONTENT_TYPE};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the preview service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState {
    /// The preview service behind every endpoint
    pub service: Arc<PreviewService>,

    /// Cache-Control max-age for tiles in seconds (0 = no-cache)
    pub cache_max_age: u32,
}

impl AppState {
    /// Create a new application state with tiles marked `no-cache`.
    pub fn new(service: PreviewService) -> Self {
        Self::with_cache_max_age(service, 0)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(service: PreviewService, cache_max_age: u32) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age,
        }
    }

    /// `Cache-Control` value for tile responses.
    pub fn cache_control(&self) -> String {
        if self.cache_max_age == 0 {
            "no-cache".to_string()
        } else {
            format!("public, max-age={}", self.cache_max_age)
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Body of a registration request.
///
/// Missing fields deserialize as empty and are rejected as blank.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub path: String,
}

/// Path parameters for tile requests.
///
/// Extracted from: `/preview/tile/{id}/{z}/{x}/{filename}`
/// where filename is `{y}` or `{y}.png`. Numbers are kept as strings so a
/// malformed address maps to a 400 with a JSON body.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub id: String,
    pub z: String,
    pub x: String,
    pub filename: String,
}

impl TilePathParams {
    /// Parse `(z, x, y)`, stripping any `.png` extension from y.
    pub fn address(&self) -> Result<(u32, u32, u32), PreviewError> {
        let y = self.filename.strip_suffix(".png").unwrap_or(&self.filename);
        match (self.z.parse(), self.x.parse(), y.parse()) {
            (Ok(z), Ok(x), Ok(y)) => Ok((z, x, y)),
            _ => Err(PreviewError::Validation(format!(
                "invalid tile address: {}/{}/{}",
                self.z, self.x, self.filename
            ))),
        }
    }
}

/// Query parameters for tile requests.
#[derive(Debug, Default, Deserialize)]
pub struct TileQueryParams {
    /// Comma-separated 1-based band indexes
    #[serde(default)]
    pub indexes: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code, repeated from the response
    pub status: u16,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub id: String,
    pub path: String,
}

/// Extent of a preview in WGS84.
#[derive(Debug, Serialize)]
pub struct BoundsResponse {
    /// `[west, south, east, north]`
    pub bounds: [f64; 4],
    pub crs: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of registered previews
    pub previews: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert PreviewError to HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            PreviewError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            PreviewError::UnknownId { .. } | PreviewError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            PreviewError::Dataset(DatasetError::Open { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dataset_error")
            }
            PreviewError::Dataset(_) => (StatusCode::INTERNAL_SERVER_ERROR, "read_error"),
            PreviewError::Tile(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            PreviewError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle registration requests.
///
/// # Endpoint
///
/// `POST /preview/register` with JSON body `{"id": "...", "path": "..."}`
///
/// # Response
///
/// - `200 OK`: `{"ok": true, "id": "...", "path": "/absolute/path"}`
/// - `400 Bad Request`: blank id or path, or a body that is not JSON
/// - `404 Not Found`: path does not name an existing file
pub async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, PreviewError> {
    let Json(body) = body.map_err(|e| PreviewError::Validation(e.body_text()))?;

    let entry = state.service.register(&body.id, &body.path).await?;

    Ok(Json(RegisterResponse {
        ok: true,
        id: entry.id,
        path: entry.path.display().to_string(),
    }))
}

/// Handle bounds requests.
///
/// # Endpoint
///
/// `GET /preview/bounds/{id}`
///
/// # Response
///
/// - `200 OK`: `{"bounds": [w, s, e, n], "crs": "EPSG:4326"}`
/// - `404 Not Found`: unknown id
/// - `500 Internal Server Error`: dataset cannot be opened
pub async fn bounds_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BoundsResponse>, PreviewError> {
    let bounds = state.service.bounds(&id).await?;

    Ok(Json(BoundsResponse {
        bounds: bounds.to_array(),
        crs: "EPSG:4326".to_string(),
    }))
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /preview/tile/{id}/{z}/{x}/{y}.png?indexes=1,2,3`
///
/// # Response
///
/// - `200 OK`: RGBA PNG with `Content-Type: image/png`
/// - `400 Bad Request`: bad tile address or `indexes` value
/// - `404 Not Found`: unknown id
/// - `500 Internal Server Error`: dataset open, read or encode failure
///
/// # Headers
///
/// - `Cache-Control: no-cache` or `public, max-age={cache_max_age}`
/// - `X-Preview-Bands`: the bands rendered, comma-separated
pub async fn tile_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, PreviewError> {
    let (z, x, y) = params.address()?;

    let mut request = TileRequest::new(&params.id, z, x, y);
    request.indexes = query.indexes;

    let response = state.service.render_tile(request).await?;

    let bands = response
        .bands
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PNG_CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, state.cache_control()),
            (header::HeaderName::from_static("x-preview-bands"), bands),
        ],
        response.data,
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "previews": 2
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        previews: state.service.registry().len().await,
    })
}

/// JSON 404 for paths that match no route.
pub async fn fallback_handler(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No route");
    let body = ErrorResponse::with_status(
        "not_found",
        format!("no route for {}", uri.path()),
        StatusCode::NOT_FOUND,
    );
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
