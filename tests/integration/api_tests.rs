//! API integration tests for registration, bounds and tiles.
//!
//! Tests verify:
//! - Registration validation and path resolution
//! - Bounds for geographic and projected datasets
//! - Tile status codes, headers and JSON error bodies

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::tempdir;

use raster_preview::{create_router, PreviewService, RouterConfig};

use super::test_utils::{
    geographic_ramp, get, json, post_json, register, send, test_router, world_ramp, write_fixture,
};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_success() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "ramp.tif", &world_ramp().build());
    let router = test_router();

    let (status, body) = post_json(
        &router,
        "/preview/register",
        serde_json::json!({ "id": "ramp", "path": path.to_str().unwrap() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["id"], "ramp");
    assert_eq!(body["path"], path.to_str().unwrap());
}

#[tokio::test]
async fn test_register_trims_values() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "ramp.tif", &world_ramp().build());
    let router = test_router();

    let (status, body) = post_json(
        &router,
        "/preview/register",
        serde_json::json!({ "id": "  ramp ", "path": format!(" {} ", path.display()) }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "ramp");

    let (status, _, _) = get(&router, "/preview/bounds/ramp").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_blank_rejected() {
    let router = test_router();

    for body in [
        serde_json::json!({ "id": "", "path": "/tmp/x.tif" }),
        serde_json::json!({ "id": "a", "path": "   " }),
        serde_json::json!({ "id": " ", "path": "" }),
        serde_json::json!({}),
    ] {
        let (status, error) = post_json(&router, "/preview/register", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(error["error"], "invalid_request");
        assert_eq!(error["status"], 400);
    }
}

#[tokio::test]
async fn test_register_malformed_body() {
    let router = test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/preview/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_request");

    let request = Request::builder()
        .method("POST")
        .uri("/preview/register")
        .body(Body::from(r#"{"id":"a","path":"/x.tif"}"#))
        .unwrap();
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_missing_path() {
    let dir = tempdir().unwrap();
    let router = test_router();

    let missing = dir.path().join("nope.tif");
    let (status, error) = post_json(
        &router,
        "/preview/register",
        serde_json::json!({ "id": "a", "path": missing.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "not_found");

    // A directory is not a dataset
    let (status, _) = post_json(
        &router,
        "/preview/register",
        serde_json::json!({ "id": "a", "path": dir.path().to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(&router, "/preview/bounds/a").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_replaces_previous_path() {
    let dir = tempdir().unwrap();
    let world = write_fixture(&dir, "world.tif", &world_ramp().build());
    let local = write_fixture(&dir, "local.tif", &geographic_ramp().build());
    let router = test_router();

    register(&router, "scene", &world).await;
    register(&router, "scene", &local).await;

    let (status, _, body) = get(&router, "/preview/bounds/scene").await;
    assert_eq!(status, StatusCode::OK);
    let west = json(&body)["bounds"][0].as_f64().unwrap();
    assert!((west - 10.0).abs() < 1e-9);
}

// =============================================================================
// Bounds
// =============================================================================

#[tokio::test]
async fn test_bounds_geographic() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "geo.tif", &geographic_ramp().build());
    let router = test_router();
    register(&router, "geo", &path).await;

    let (status, headers, body) = get(&router, "/preview/bounds/geo").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body = json(&body);
    assert_eq!(body["crs"], "EPSG:4326");
    let bounds: Vec<f64> = body["bounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    for (got, want) in bounds.iter().zip([10.0, 40.0, 20.0, 50.0]) {
        assert!((got - want).abs() < 1e-9, "{:?}", bounds);
    }
}

#[tokio::test]
async fn test_bounds_web_mercator_world() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    let (status, _, body) = get(&router, "/preview/bounds/world").await;
    assert_eq!(status, StatusCode::OK);

    let b = &json(&body)["bounds"];
    let (west, south, east, north) = (
        b[0].as_f64().unwrap(),
        b[1].as_f64().unwrap(),
        b[2].as_f64().unwrap(),
        b[3].as_f64().unwrap(),
    );
    assert!((west + 180.0).abs() < 1e-6);
    assert!((east - 180.0).abs() < 1e-6);
    assert!((north - 85.0511).abs() < 1e-3);
    assert!((south + 85.0511).abs() < 1e-3);
}

#[tokio::test]
async fn test_bounds_unknown_id() {
    let router = test_router();
    let (status, _, body) = get(&router, "/preview/bounds/missing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json(&body);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["status"], 404);
    assert!(body["message"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_bounds_unreadable_dataset() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "notes.tif", b"this is not a tiff file");
    let router = test_router();
    register(&router, "bad", &path).await;

    let (status, _, body) = get(&router, "/preview/bounds/bad").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "dataset_error");
}

#[tokio::test]
async fn test_bounds_without_georeference() {
    let dir = tempdir().unwrap();
    let plain = super::test_utils::GeoTiffBuilder::new(
        8,
        8,
        vec![super::test_utils::column_ramp(8, 8)],
    )
    .build();
    let path = write_fixture(&dir, "plain.tif", &plain);
    let router = test_router();
    register(&router, "plain", &path).await;

    let (status, _, _) = get(&router, "/preview/bounds/plain").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_tile_success_headers() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    let (status, headers, body) = get(&router, "/preview/tile/world/0/0/0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert_eq!(headers.get("cache-control").unwrap(), "no-cache");
    assert_eq!(headers.get("x-preview-bands").unwrap(), "1");
    assert_eq!(&body[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_tile_without_png_extension() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    let (status, headers, _) = get(&router, "/preview/tile/world/1/1/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
}

#[tokio::test]
async fn test_tile_cache_max_age() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = create_router(
        PreviewService::new(),
        RouterConfig::new().with_cache_max_age(300).with_tracing(false),
    );
    register(&router, "world", &path).await;

    let (status, headers, _) = get(&router, "/preview/tile/world/0/0/0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=300");
}

#[tokio::test]
async fn test_tile_unknown_id() {
    let router = test_router();
    let (status, _, body) = get(&router, "/preview/tile/missing/0/0/0.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "not_found");
}

#[tokio::test]
async fn test_tile_bad_indexes() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    for query in ["a", "1,,2", "1.5", "0", "1,1"] {
        let uri = format!("/preview/tile/world/0/0/0.png?indexes={}", query);
        let (status, _, body) = get(&router, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(json(&body)["error"], "invalid_request");
    }

    let (_, _, body) = get(&router, "/preview/tile/world/0/0/0.png?indexes=x").await;
    assert!(json(&body)["message"]
        .as_str()
        .unwrap()
        .contains("bad indexes param"));
}

#[tokio::test]
async fn test_tile_unknown_id_wins_over_bad_indexes() {
    let router = test_router();
    let (status, _, body) = get(&router, "/preview/tile/missing/0/0/0.png?indexes=a").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "not_found");
}

#[tokio::test]
async fn test_tile_bad_address() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    for uri in [
        "/preview/tile/world/31/0/0.png",
        "/preview/tile/world/1/2/0.png",
        "/preview/tile/world/1/0/2.png",
        "/preview/tile/world/z/0/0.png",
        "/preview/tile/world/0/-1/0.png",
        "/preview/tile/world/0/0/0.jpg",
    ] {
        let (status, _, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json(&body)["status"], 400);
    }
}

#[tokio::test]
async fn test_tile_band_out_of_range() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    let (status, _, body) = get(&router, "/preview/tile/world/0/0/0.png?indexes=1,4").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "read_error");
}

#[tokio::test]
async fn test_tile_unreadable_dataset() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "bad.tif", b"II*\0garbage");
    let router = test_router();
    register(&router, "bad", &path).await;

    let (status, _, body) = get(&router, "/preview/tile/bad/0/0/0.png").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "dataset_error");
}

#[tokio::test]
async fn test_tile_file_removed_after_registration() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();
    register(&router, "world", &path).await;

    std::fs::remove_file(&path).unwrap();
    let (status, _, _) = get(&router, "/preview/tile/world/0/0/0.png").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Health and CORS
// =============================================================================

#[tokio::test]
async fn test_health_counts_previews() {
    let dir = tempdir().unwrap();
    let path = write_fixture(&dir, "world.tif", &world_ramp().build());
    let router = test_router();

    let (status, _, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["previews"], 0);

    register(&router, "a", &path).await;
    register(&router, "b", &path).await;
    register(&router, "a", &path).await;

    let (_, _, body) = get(&router, "/health").await;
    assert_eq!(json(&body)["previews"], 2);
}

#[tokio::test]
async fn test_cors_any_origin() {
    let router = test_router();
    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://maps.example.com")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let router = create_router(
        PreviewService::new(),
        RouterConfig::new()
            .with_cors_origins(vec!["https://allowed.example.com".to_string()])
            .with_tracing(false),
    );

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://allowed.example.com")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&router, request).await;
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "https://allowed.example.com"
    );

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://other.example.com")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&router, request).await;
    assert!(headers.get("access-control-allow-origin").is_none());
}
