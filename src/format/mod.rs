//! File format readers.
//!
//! - [`tiff`]: TIFF/BigTIFF structure, block layout and block decoding
//! - [`geotiff`]: georeferencing carried in GeoTIFF tags
//! - [`jpeg`]: JPEG-compressed blocks and shared JPEG tables

pub mod geotiff;
pub mod jpeg;
pub mod tiff;

pub use geotiff::{GeoReference, GeoTransform, ModelKind};
