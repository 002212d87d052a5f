//! PNG tile encoder.
//!
//! Rendered tiles are written as 8-bit RGBA PNG. The validity mask becomes
//! the alpha channel: 255 where the pixel holds data, 0 where it does not,
//! so gaps and areas outside the dataset show the basemap underneath.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::TileError;
use crate::preview::RenderedTile;

/// Content type of encoded tiles.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Encodes rendered tiles as RGBA PNG.
#[derive(Debug, Clone, Default)]
pub struct PngTileEncoder {}

impl PngTileEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Interleave RGB and mask into RGBA and encode as PNG.
    ///
    /// Output is deterministic for identical input. Buffers that do not match
    /// `width * height` are rejected.
    pub fn encode(&self, tile: &RenderedTile) -> Result<Bytes, TileError> {
        let pixels = tile.width as usize * tile.height as usize;
        for buffer in tile.channels.iter().chain(std::iter::once(&tile.mask)) {
            if buffer.len() != pixels {
                return Err(TileError::ShapeMismatch {
                    expected: pixels,
                    actual: buffer.len(),
                });
            }
        }

        let [red, green, blue] = &tile.channels;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for i in 0..pixels {
            let alpha = if tile.mask[i] != 0 { 255 } else { 0 };
            rgba.extend_from_slice(&[red[i], green[i], blue[i], alpha]);
        }

        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(&rgba, tile.width, tile.height, ExtendedColorType::Rgba8)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}
