//! Georeferenced raster datasets.
//!
//! A [`Dataset`] is opened per request from a local GeoTIFF and answers three
//! questions: how many bands it has, where it is on the globe, and what its
//! samples look like under a given map tile.
//!
//! # Reading a tile
//!
//! ```text
//! TileAddress ──► Web Mercator extent ──► native CRS ──► pixel grid
//!                                                          │
//!        overview choice (finest not finer than needed) ◄──┘
//!                                                          │
//!        blocks touched ──► decode ──► samples + validity mask
//! ```

pub mod crs;
mod handle;
pub mod mercator;

pub use crs::Crs;
pub use handle::{Dataset, GeoBounds, TileSample};
pub use mercator::{MercatorBounds, TileAddress};
