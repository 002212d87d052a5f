//! TIFF header and IFD parsing.
//!
//! Classic TIFF header (8 bytes):
//! ```text
//! 0-1  byte order ("II" little-endian, "MM" big-endian)
//! 2-3  version 42
//! 4-7  offset of the first IFD
//! ```
//!
//! BigTIFF header (16 bytes):
//! ```text
//! 0-1   byte order
//! 2-3   version 43
//! 4-5   offset byte size (always 8)
//! 6-7   reserved
//! 8-15  offset of the first IFD
//! ```
//!
//! An IFD is an entry count, a run of fixed-size entries, and the offset of
//! the next IFD (0 terminates the chain). Each entry is
//! `tag, type, count, value-or-offset`; values that fit in the last field
//! are stored inline.

use crate::error::TiffError;

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on entries in one IFD. Real files carry a few dozen.
const MAX_IFD_ENTRIES: u64 = 4096;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

/// First `N` bytes of a slice as an array.
///
/// # Panics
/// Panics if the slice has fewer than `N` bytes.
#[inline]
fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(fixed(bytes)),
            ByteOrder::BigEndian => u16::from_be_bytes(fixed(bytes)),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(fixed(bytes)),
            ByteOrder::BigEndian => u32::from_be_bytes(fixed(bytes)),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(fixed(bytes)),
            ByteOrder::BigEndian => u64::from_be_bytes(fixed(bytes)),
        }
    }

    /// Read an IEEE-754 double from a byte slice using this byte order.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    /// Read an unsigned integer of `width` bytes (1, 2, 4 or 8).
    #[inline]
    pub fn read_uint(self, bytes: &[u8], width: usize) -> u64 {
        match width {
            1 => bytes[0] as u64,
            2 => self.read_u16(bytes) as u64,
            4 => self.read_u32(bytes) as u64,
            _ => self.read_u64(bytes),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// `bytes` should hold at least 16 bytes when available so BigTIFF can be
    /// recognised; `file_size` bounds the first IFD offset.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // The two magic bytes are identical, so either reading order works
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of an IFD entry: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count that opens an IFD: 2 bytes classic, 8 bytes BigTIFF.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the next-IFD offset that closes an IFD.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        self.value_offset_size()
    }

    /// Size of the value/offset field of an entry (the inline threshold).
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// A single raw IFD entry.
///
/// Values are not resolved here; inline values stay in `value_offset_bytes`
/// and out-of-line values are fetched later through `ValueReader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag id
    pub tag_id: u16,

    /// Decoded field type, `None` for types this parser does not know
    pub field_type: Option<FieldType>,

    /// Field type exactly as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// The 4 (classic) or 8 (BigTIFF) value/offset bytes, in file byte order
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value lives in `value_offset_bytes`
    pub is_inline: bool,
}

impl IfdEntry {
    /// Total byte size of the value, or `None` for unknown field types.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .map(|t| t.size_in_bytes() as u64 * self.count)
    }

    /// Interpret the value/offset field as a file offset.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// Read a single inline unsigned value (Byte, Short, Long or Long8).
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        let bytes = &self.value_offset_bytes;
        match self.field_type? {
            FieldType::Byte => Some(bytes[0] as u64),
            FieldType::Short => Some(byte_order.read_u16(bytes) as u64),
            FieldType::Long => Some(byte_order.read_u32(bytes) as u64),
            FieldType::Long8 if bytes.len() >= 8 => Some(byte_order.read_u64(bytes)),
            _ => None,
        }
    }

    /// Read a single inline unsigned value that fits in 32 bits.
    pub fn inline_u32(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u64(byte_order)
            .and_then(|v| u32::try_from(v).ok())
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// Entries in file order (sorted by tag in well-formed files)
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD, 0 if this is the last one
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// An IFD with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            next_ifd_offset: 0,
        }
    }

    /// Byte size of an IFD holding `entry_count` entries.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> usize {
        header.ifd_count_size()
            + entry_count as usize * header.ifd_entry_size()
            + header.ifd_next_offset_size()
    }

    /// Parse an IFD from bytes starting at its entry count.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let count_size = header.ifd_count_size();

        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = if header.is_bigtiff {
            byte_order.read_u64(bytes)
        } else {
            byte_order.read_u16(bytes) as u64
        };

        if entry_count > MAX_IFD_ENTRIES {
            return Err(TiffError::InvalidTagValue {
                tag: "IFD",
                message: format!("implausible entry count {}", entry_count),
            });
        }

        let required = Self::calculate_size(entry_count, header);
        if bytes.len() < required {
            return Err(TiffError::FileTooSmall {
                required: required as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.ifd_entry_size();
        let value_size = header.value_offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let start = count_size + i * entry_size;
            let raw = &bytes[start..start + entry_size];

            let tag_id = byte_order.read_u16(&raw[0..2]);
            let field_type_raw = byte_order.read_u16(&raw[2..4]);
            let field_type = FieldType::from_u16(field_type_raw);

            let (count, value_start) = if header.is_bigtiff {
                (byte_order.read_u64(&raw[4..12]), 12)
            } else {
                (byte_order.read_u32(&raw[4..8]) as u64, 8)
            };

            let value_offset_bytes = raw[value_start..value_start + value_size].to_vec();
            let is_inline = field_type
                .map(|t| t.fits_inline(count, header.is_bigtiff))
                .unwrap_or(false);

            entries.push(IfdEntry {
                tag_id,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes,
                is_inline,
            });
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = if header.is_bigtiff {
            byte_order.read_u64(&bytes[next_start..])
        } else {
            byte_order.read_u32(&bytes[next_start..]) as u64
        };

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Find an entry by numeric tag id.
    pub fn get_entry(&self, tag_id: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag_id == tag_id)
    }

    /// Find an entry by tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.get_entry(tag.as_u16())
    }

    /// Read a single inline value for a tag.
    pub fn get_u32(&self, tag: TiffTag, byte_order: ByteOrder) -> Option<u32> {
        self.get_entry_by_tag(tag)?.inline_u32(byte_order)
    }

    pub fn image_width(&self, byte_order: ByteOrder) -> Option<u32> {
        self.get_u32(TiffTag::ImageWidth, byte_order)
    }

    pub fn image_height(&self, byte_order: ByteOrder) -> Option<u32> {
        self.get_u32(TiffTag::ImageLength, byte_order)
    }

    pub fn tile_width(&self, byte_order: ByteOrder) -> Option<u32> {
        self.get_u32(TiffTag::TileWidth, byte_order)
    }

    pub fn tile_height(&self, byte_order: ByteOrder) -> Option<u32> {
        self.get_u32(TiffTag::TileLength, byte_order)
    }

    pub fn rows_per_strip(&self, byte_order: ByteOrder) -> Option<u32> {
        self.get_u32(TiffTag::RowsPerStrip, byte_order)
    }

    /// Compression code, 1 (none) when absent.
    pub fn compression(&self, byte_order: ByteOrder) -> u16 {
        self.get_u32(TiffTag::Compression, byte_order)
            .map(|v| v as u16)
            .unwrap_or(1)
    }

    /// Samples per pixel, 1 when absent.
    pub fn samples_per_pixel(&self, byte_order: ByteOrder) -> u16 {
        self.get_u32(TiffTag::SamplesPerPixel, byte_order)
            .map(|v| v as u16)
            .unwrap_or(1)
    }

    /// Planar configuration, 1 (chunky) when absent.
    pub fn planar_configuration(&self, byte_order: ByteOrder) -> u16 {
        self.get_u32(TiffTag::PlanarConfiguration, byte_order)
            .map(|v| v as u16)
            .unwrap_or(1)
    }

    /// Predictor, 1 (none) when absent.
    pub fn predictor(&self, byte_order: ByteOrder) -> u16 {
        self.get_u32(TiffTag::Predictor, byte_order)
            .map(|v| v as u16)
            .unwrap_or(1)
    }

    /// NewSubfileType bit field, 0 when absent.
    pub fn new_subfile_type(&self, byte_order: ByteOrder) -> u32 {
        self.get_u32(TiffTag::NewSubfileType, byte_order)
            .unwrap_or(0)
    }

    /// Whether this IFD stores tiles rather than strips.
    pub fn is_tiled(&self) -> bool {
        self.get_entry_by_tag(TiffTag::TileOffsets).is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
