//! TIFF tag value reading.
//!
//! Values either sit inline in the IFD entry or at an offset in the file.
//! Arrays (block offsets, byte counts, GeoKeys, model tags) are fetched with
//! a single ranged read each.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file, respecting its byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or fetched.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            let bytes = self.reader.read_exact_at(offset, size as usize).await?;
            Ok(bytes)
        }
    }

    /// Unsigned integer array (Byte, Short, Long, Long8), widened to u64.
    pub async fn read_u64_array(
        &self,
        tag: TiffTag,
        entry: &IfdEntry,
    ) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if !field_type.is_unsigned_integer() {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected an unsigned integer type, got {:?}", field_type),
            });
        }

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry).await?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.header.byte_order,
        ))
    }

    /// Floating point array (Double or Float), widened to f64.
    pub async fn read_f64_array(
        &self,
        tag: TiffTag,
        entry: &IfdEntry,
    ) -> Result<Vec<f64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        let byte_order = self.header.byte_order;
        let count = entry.count as usize;
        let bytes = self.read_bytes(entry).await?;

        match field_type {
            FieldType::Double => Ok(bytes
                .chunks_exact(8)
                .take(count)
                .map(|c| byte_order.read_f64(c))
                .collect()),
            FieldType::Float => Ok(bytes
                .chunks_exact(4)
                .take(count)
                .map(|c| f32::from_bits(byte_order.read_u32(c)) as f64)
                .collect()),
            _ => Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected Double or Float, got {:?}", field_type),
            }),
        }
    }

    /// ASCII value with the trailing NUL stripped.
    pub async fn read_string(&self, tag: TiffTag, entry: &IfdEntry) -> Result<String, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if field_type != FieldType::Ascii {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected Ascii, got {:?}", field_type),
            });
        }

        let bytes = self.read_bytes(entry).await?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

// =============================================================================
// Parsing from bytes
// =============================================================================

/// Parse an unsigned integer array from raw bytes.
///
/// Stops early if `bytes` is shorter than `count` values.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = field_type.size_in_bytes();
    if !field_type.is_unsigned_integer() {
        return Vec::new();
    }
    bytes
        .chunks_exact(width)
        .take(count)
        .map(|c| byte_order.read_uint(c, width))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
