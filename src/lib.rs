//! # Raster Preview
//!
//! On-demand map tile previews for local georeferenced rasters.
//!
//! A raster is registered under a short id. Clients then ask for its
//! geographic extent and for Web Mercator `{z}/{x}/{y}` PNG tiles, each
//! rendered from up to three bands with a per-tile percentile contrast
//! stretch. Nothing is pre-rendered or cached: every tile reads only the
//! TIFF blocks it needs.
//!
//! ## Features
//!
//! - **Native GeoTIFF reader**: tiled or stripped, chunky or planar, with
//!   overviews, and None/Deflate/LZW/PackBits/JPEG compression
//! - **Reprojection**: WGS84, Web Mercator and UTM datasets via `proj4rs`
//! - **Masking**: nodata, alpha bands and sparse blocks become transparent
//!
//! ## Architecture
//!
//! - [`io`] - Positioned reads from local files
//! - [`mod@format`] - TIFF structure, block decoding, GeoTIFF keys
//! - [`dataset`] - Open rasters, bounds and tile sampling
//! - [`preview`] - Registry, band selection, stretch and composite
//! - [`tile`] - Preview service and PNG encoding
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use raster_preview::{create_router, PreviewService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = PreviewService::new();
//!     service
//!         .register("scene", "/data/scene.tif")
//!         .await
//!         .expect("registration failed");
//!
//!     let router = create_router(service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod io;
pub mod preview;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use dataset::{Crs, Dataset, GeoBounds, MercatorBounds, TileAddress, TileSample};
pub use error::{DatasetError, IoError, PreviewError, TiffError, TileError};
pub use format::tiff::{
    BlockDecoder, ByteOrder, Compression, FieldType, Ifd, IfdEntry, RasterLevel, RasterPyramid,
    SampleFormat, TiffHeader, TiffTag, ValueReader,
};
pub use format::{GeoReference, GeoTransform, ModelKind};
pub use io::{FileRangeReader, RangeReader};
pub use preview::{BandSelection, ContrastStretch, PreviewEntry, PreviewRegistry, RenderedTile};
pub use server::{
    create_router, AppState, BoundsResponse, ErrorResponse, HealthResponse, RegisterRequest,
    RegisterResponse, RouterConfig,
};
pub use tile::{PngTileEncoder, PreviewService, TileRequest, TileResponse, DEFAULT_TILE_SIZE};
