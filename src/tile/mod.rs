//! Tile service layer.
//!
//! Turns map tile requests into PNG previews.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the dataset abstraction:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Preview Service             │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │   Stretch    │  │   PNG Encoder   │  │
//! │  │  Composite   │  │ (mask → alpha)  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     PreviewRegistry → Dataset           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`PreviewService`]: Entry point for registration, bounds and tiles
//! - [`PngTileEncoder`]: RGBA PNG encoding of rendered tiles
//! - [`TileRequest`]: Parameters for a tile request
//! - [`TileResponse`]: Encoded tile and the bands it shows
//!
//! # Example
//!
//! ```ignore
//! use raster_preview::tile::{PreviewService, TileRequest};
//!
//! let service = PreviewService::new();
//! service.register("scene", "/data/scene.tif").await?;
//!
//! let request = TileRequest::new("scene", 3, 4, 2).with_indexes("4,3,2");
//! let response = service.render_tile(request).await?;
//! println!("{} bytes, bands {:?}", response.data.len(), response.bands);
//! ```

mod encoder;
mod service;

pub use encoder::{PngTileEncoder, PNG_CONTENT_TYPE};
pub use service::{PreviewService, TileRequest, TileResponse, DEFAULT_TILE_SIZE};
