//! TIFF and BigTIFF reading for georeferenced rasters.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. All multi-byte values respect it.
//!
//! - **Classic TIFF vs BigTIFF**: classic TIFF uses 32-bit offsets, BigTIFF
//!   64-bit ones. Both are handled transparently.
//!
//! - **Blocks**: pixel data is stored as tiles or strips, each compressed on
//!   its own. A request only fetches the blocks it touches.
//!
//! - **Overviews**: reduced-resolution copies in later IFDs, used when a map
//!   tile covers many source pixels.

mod decode;
mod parser;
mod pyramid;
mod tags;
mod values;

pub use decode::{BlockDecoder, SampleFormat};
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{RasterLevel, RasterPyramid};
pub use tags::{Compression, FieldType, TiffTag};
pub use values::{parse_u64_array, ValueReader};
