//! Preview service: the full path from a tile request to PNG bytes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PreviewService                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                   render_tile()                         │    │
//! │  │  1. Validate address   4. Open dataset, select bands    │    │
//! │  │  2. Resolve id         5. Read tile samples             │    │
//! │  │  3. Parse indexes      6. Stretch, compose, encode      │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │            │
//! │           ▼                    ▼                    ▼            │
//! │  ┌─────────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ PreviewRegistry │   │   Dataset    │   │  PngTileEncoder  │  │
//! │  └─────────────────┘   └──────────────┘   └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 6 is CPU-bound and runs on the blocking pool.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::dataset::{Dataset, GeoBounds, TileAddress, TileSample};
use crate::error::PreviewError;
use crate::preview::{
    compose, parse_requested, select_or_default, ContrastStretch, PreviewEntry, PreviewRegistry,
};

use super::encoder::PngTileEncoder;

/// Default output tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

// =============================================================================
// Tile Request
// =============================================================================

/// A request for one preview tile.
#[derive(Debug, Clone)]
pub struct TileRequest {
    /// Registered preview id
    pub id: String,

    /// Zoom level (0 = whole world in one tile)
    pub zoom: u32,

    /// Tile column, from the west
    pub x: u32,

    /// Tile row, from the north
    pub y: u32,

    /// Raw `indexes` query value, if given
    pub indexes: Option<String>,
}

impl TileRequest {
    /// Create a request with default band selection.
    pub fn new(id: impl Into<String>, zoom: u32, x: u32, y: u32) -> Self {
        Self {
            id: id.into(),
            zoom,
            x,
            y,
            indexes: None,
        }
    }

    /// Set the `indexes` parameter.
    pub fn with_indexes(mut self, indexes: impl Into<String>) -> Self {
        self.indexes = Some(indexes.into());
        self
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// A rendered tile.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// PNG bytes
    pub data: Bytes,

    /// 1-based bands that were rendered
    pub bands: Vec<usize>,
}

// =============================================================================
// Preview Service
// =============================================================================

/// Service behind the HTTP endpoints.
///
/// Holds the registry and the rendering settings. Datasets are opened per
/// request, so a file replaced on disk is picked up by the next tile.
pub struct PreviewService {
    registry: Arc<PreviewRegistry>,
    encoder: PngTileEncoder,
    tile_size: u32,
    stretch: ContrastStretch,
}

impl PreviewService {
    /// Create a service with an empty registry and default settings.
    pub fn new() -> Self {
        Self::with_shared_registry(Arc::new(PreviewRegistry::new()))
    }

    /// Create a service around an existing registry.
    pub fn with_shared_registry(registry: Arc<PreviewRegistry>) -> Self {
        Self {
            registry,
            encoder: PngTileEncoder::new(),
            tile_size: DEFAULT_TILE_SIZE,
            stretch: ContrastStretch::default(),
        }
    }

    /// Set the output tile edge in pixels.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the stretch percentiles.
    pub fn with_stretch(mut self, stretch: ContrastStretch) -> Self {
        self.stretch = stretch;
        self
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Register `path` under `id`.
    pub async fn register(&self, id: &str, path: &str) -> Result<PreviewEntry, PreviewError> {
        self.registry.register(id, path).await
    }

    /// Geographic extent of a registered preview.
    pub async fn bounds(&self, id: &str) -> Result<GeoBounds, PreviewError> {
        self.registry.bounds(id).await
    }

    /// Render one tile to PNG.
    ///
    /// # Errors
    ///
    /// - `Validation` for an address outside the zoom's grid, or a malformed
    ///   `indexes` value on a registered id
    /// - `UnknownId` when nothing is registered under the id, whatever the
    ///   `indexes` value
    /// - `Dataset` when the file cannot be opened or read, including band
    ///   indexes past the dataset's band count
    pub async fn render_tile(&self, request: TileRequest) -> Result<TileResponse, PreviewError> {
        let address = u8::try_from(request.zoom)
            .ok()
            .and_then(|zoom| TileAddress::new(zoom, request.x, request.y))
            .ok_or_else(|| {
                PreviewError::Validation(format!(
                    "tile {}/{}/{} is outside the tile grid",
                    request.zoom, request.x, request.y
                ))
            })?;
        let path = self.registry.resolve(&request.id).await?;
        let explicit = parse_requested(request.indexes.as_deref())?;

        let dataset = Dataset::open(&path).await?;
        let selection = select_or_default(explicit, dataset.band_count());
        let bands = selection.indexes().to_vec();

        debug!(
            id = %request.id,
            z = request.zoom,
            x = request.x,
            y = request.y,
            bands = ?bands,
            "Rendering tile"
        );

        let sample = dataset.read_tile(address, &bands, self.tile_size).await?;

        let encoder = self.encoder.clone();
        let stretch = self.stretch;
        let data = tokio::task::spawn_blocking(move || render_sample(&encoder, stretch, sample))
            .await
            .map_err(|e| PreviewError::Render(e.to_string()))??;

        Ok(TileResponse { data, bands })
    }
}

impl Default for PreviewService {
    fn default() -> Self {
        Self::new()
    }
}

/// Stretch each band, compose to RGB and encode.
fn render_sample(
    encoder: &PngTileEncoder,
    stretch: ContrastStretch,
    sample: TileSample,
) -> Result<Bytes, PreviewError> {
    let stretched = sample
        .bands
        .iter()
        .map(|band| stretch.stretch_band(band, &sample.mask))
        .collect();
    let tile = compose(sample.width, sample.height, stretched, sample.mask);
    Ok(encoder.encode(&tile)?)
}
