//! JPEG-compressed TIFF blocks.
//!
//! TIFF compression 7 stores each block as a JPEG stream. Writers usually
//! emit "abbreviated" streams that omit the quantization (DQT) and Huffman
//! (DHT) tables and keep a single copy in the `JPEGTables` tag. Before such a
//! block can be decoded the tables are spliced in:
//!
//! ```text
//! tables: SOI DQT DHT ... EOI
//! block:  SOI SOS <scan> EOI
//! merged: SOI DQT DHT ... SOS <scan> EOI
//! ```

use bytes::{Bytes, BytesMut};
use image::ImageFormat;

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
pub const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// Whether a stream carries its own tables.
///
/// Walks marker segments after SOI until it meets DQT/DHT (complete) or SOS
/// (abbreviated). Anything unrecognisable counts as not having tables.
pub fn has_tables(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return true;
        }
        if marker == SOS {
            return false;
        }

        // Segments other than standalone markers carry a 2-byte length
        if pos + 3 < data.len() && marker[1] != 0x00 && marker[1] != 0xD8 && marker[1] != 0xD9 {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Splice `JPEGTables` into an abbreviated block stream.
///
/// Drops the EOI closing the tables and the SOI opening the block.
pub fn merge_jpeg_tables(tables: &[u8], block: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(block);
    }
    if block.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let block_start = if block.len() >= 2 && block[0..2] == SOI {
        2
    } else {
        0
    };

    let mut result = BytesMut::with_capacity(tables_end + block.len() - block_start);
    result.extend_from_slice(&tables[..tables_end]);
    result.extend_from_slice(&block[block_start..]);
    result.freeze()
}

/// Make a block decodable, merging tables only when the block lacks them.
pub fn prepare_block_jpeg(tables: Option<&[u8]>, block: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !has_tables(block) => merge_jpeg_tables(tables, block),
        _ => Bytes::copy_from_slice(block),
    }
}

/// Decode a JPEG block to interleaved 8-bit samples.
///
/// One sample per pixel yields luma, anything else yields RGB. YCbCr blocks
/// come back already converted to RGB by the decoder.
pub fn decode_jpeg_block(
    tables: Option<&[u8]>,
    block: &[u8],
    samples_per_pixel: usize,
) -> Result<(u32, u32, Vec<u8>), String> {
    let stream = prepare_block_jpeg(tables, block);
    let image = image::load_from_memory_with_format(&stream, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;

    let (width, height) = (image.width(), image.height());
    let samples = if samples_per_pixel == 1 {
        image.into_luma8().into_raw()
    } else {
        image.into_rgb8().into_raw()
    };
    Ok((width, height, samples))
}
