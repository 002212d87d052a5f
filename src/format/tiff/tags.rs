//! TIFF and GeoTIFF tag vocabulary.
//!
//! Field types decide how values are laid out in an IFD entry. Tags name the
//! metadata the raster reader cares about: image structure, block layout,
//! sample encoding, and the GeoTIFF georeferencing set.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two Longs: numerator and denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Opaque bytes
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two SLongs
    SRational = 10,

    /// IEEE-754 single precision
    Float = 11,

    /// IEEE-754 double precision (GeoTIFF model tags)
    Double = 12,

    /// Unsigned 64-bit integer, BigTIFF only
    Long8 = 16,

    /// Signed 64-bit integer, BigTIFF only
    SLong8 = 17,

    /// 64-bit IFD offset, BigTIFF only
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Whether this type holds unsigned integers usable as offsets or counts.
    #[inline]
    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            FieldType::Byte | FieldType::Short | FieldType::Long | FieldType::Long8 | FieldType::Ifd8
        )
    }

    /// Maximum bytes stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: usize = 4;

    /// Maximum bytes stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: usize = 8;

    /// Check if `count` values of this type fit in the entry's value field.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let total_size = self.size_in_bytes() as u64 * count;
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF as u64
        } else {
            Self::INLINE_THRESHOLD_TIFF as u64
        };
        total_size <= threshold
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Tag IDs read by the raster reader. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Image structure
    // -------------------------------------------------------------------------
    /// Bit field; bit 0 marks a reduced-resolution image (overview)
    NewSubfileType = 254,

    ImageWidth = 256,

    ImageLength = 257,

    BitsPerSample = 258,

    Compression = 259,

    PhotometricInterpretation = 262,

    SamplesPerPixel = 277,

    /// 1 = chunky (interleaved), 2 = planar (one plane per band)
    PlanarConfiguration = 284,

    /// 1 = none, 2 = horizontal differencing, 3 = floating point
    Predictor = 317,

    /// Meaning of samples past the colour channels; 1 and 2 are alpha
    ExtraSamples = 338,

    /// 1 = unsigned int, 2 = signed int, 3 = IEEE float
    SampleFormat = 339,

    // -------------------------------------------------------------------------
    // Strip layout
    // -------------------------------------------------------------------------
    StripOffsets = 273,

    RowsPerStrip = 278,

    StripByteCounts = 279,

    // -------------------------------------------------------------------------
    // Tile layout
    // -------------------------------------------------------------------------
    TileWidth = 322,

    TileLength = 323,

    TileOffsets = 324,

    TileByteCounts = 325,

    // -------------------------------------------------------------------------
    // JPEG
    // -------------------------------------------------------------------------
    /// Shared quantization and Huffman tables for abbreviated JPEG blocks
    JpegTables = 347,

    // -------------------------------------------------------------------------
    // GeoTIFF
    // -------------------------------------------------------------------------
    /// Pixel size in model units (x, y, z)
    ModelPixelScale = 33550,

    /// Raster-to-model tie points (i, j, k, x, y, z)*
    ModelTiepoint = 33922,

    /// Full 4x4 raster-to-model affine, row-major
    ModelTransformation = 34264,

    /// GeoKey directory (Short array)
    GeoKeyDirectory = 34735,

    /// Double-valued GeoKeys
    GeoDoubleParams = 34736,

    /// ASCII-valued GeoKeys
    GeoAsciiParams = 34737,

    /// GDAL nodata value as ASCII
    GdalNodata = 42113,
}

impl TiffTag {
    /// Create a TiffTag from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            254 => Some(TiffTag::NewSubfileType),
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            273 => Some(TiffTag::StripOffsets),
            277 => Some(TiffTag::SamplesPerPixel),
            278 => Some(TiffTag::RowsPerStrip),
            279 => Some(TiffTag::StripByteCounts),
            284 => Some(TiffTag::PlanarConfiguration),
            317 => Some(TiffTag::Predictor),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            338 => Some(TiffTag::ExtraSamples),
            339 => Some(TiffTag::SampleFormat),
            347 => Some(TiffTag::JpegTables),
            33550 => Some(TiffTag::ModelPixelScale),
            33922 => Some(TiffTag::ModelTiepoint),
            34264 => Some(TiffTag::ModelTransformation),
            34735 => Some(TiffTag::GeoKeyDirectory),
            34736 => Some(TiffTag::GeoDoubleParams),
            34737 => Some(TiffTag::GeoAsciiParams),
            42113 => Some(TiffTag::GdalNodata),
            _ => None,
        }
    }

    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Tag name for error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::NewSubfileType => "NewSubfileType",
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::Predictor => "Predictor",
            TiffTag::ExtraSamples => "ExtraSamples",
            TiffTag::SampleFormat => "SampleFormat",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::RowsPerStrip => "RowsPerStrip",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::JpegTables => "JPEGTables",
            TiffTag::ModelPixelScale => "ModelPixelScale",
            TiffTag::ModelTiepoint => "ModelTiepoint",
            TiffTag::ModelTransformation => "ModelTransformation",
            TiffTag::GeoKeyDirectory => "GeoKeyDirectory",
            TiffTag::GeoDoubleParams => "GeoDoubleParams",
            TiffTag::GeoAsciiParams => "GeoAsciiParams",
            TiffTag::GdalNodata => "GDAL_NODATA",
        }
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression schemes the block decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    None = 1,

    Lzw = 5,

    /// "Old-style" JPEG, rejected
    OldJpeg = 6,

    Jpeg = 7,

    Deflate = 8,

    PackBits = 32773,

    AdobeDeflate = 32946,

    /// JPEG 2000, rejected
    Jpeg2000 = 33003,
}

impl Compression {
    /// Create a Compression from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            _ => None,
        }
    }

    /// Check if blocks with this compression can be decoded.
    #[inline]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Compression::OldJpeg | Compression::Jpeg2000)
    }

    /// Human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000 => "JPEG 2000",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
