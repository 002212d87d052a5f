use thiserror::Error;

/// I/O errors that can occur when reading raster bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Underlying file system error
    #[error("Read error: {0}")]
    Read(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Errors that can occur when parsing or decoding TIFF / GeoTIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (supported: None, LZW, JPEG, Deflate, PackBits)")]
    UnsupportedCompression(String),

    /// Unsupported combination of bits per sample and sample format
    #[error("Unsupported sample format: {bits} bits, format {format}")]
    UnsupportedSampleFormat { bits: u16, format: u16 },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// Compressed block could not be decoded
    #[error("Failed to decode block {block}: {message}")]
    Decode { block: usize, message: String },

    /// The file carries no usable georeferencing
    #[error("Missing georeferencing: {0}")]
    MissingGeoreference(&'static str),

    /// Coordinate reference system is not supported
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

/// Errors raised by a dataset handle.
///
/// `Open` is the dataset-open failure kind; the other variants are read
/// failures against an already opened dataset.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// The file could not be opened or parsed as a georeferenced raster
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: TiffError,
    },

    /// A requested band index exceeds the band count
    #[error("Band index {index} out of range: dataset has {count} band(s)")]
    BandOutOfRange { index: usize, count: usize },

    /// Reading or decoding the tile window failed
    #[error("Read error: {0}")]
    Read(#[from] TiffError),
}

impl DatasetError {
    /// Whether this error happened while opening the dataset.
    pub fn is_open_error(&self) -> bool {
        matches!(self, DatasetError::Open { .. })
    }
}

/// Errors that can occur when encoding a rendered tile
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Buffer lengths do not match the declared tile dimensions
    #[error("Tile buffer has {actual} bytes, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Failed to encode the output image
    #[error("Encode error: {message}")]
    EncodeError { message: String },
}

/// Errors surfaced by the preview service to the transport boundary
#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    /// Malformed request parameters
    #[error("{0}")]
    Validation(String),

    /// No registry entry for this id
    #[error("unknown preview id: {id}")]
    UnknownId { id: String },

    /// Registration path does not exist
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// Dataset open or read failure
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Tile encoding failure
    #[error(transparent)]
    Tile(#[from] TileError),

    /// The render task did not complete
    #[error("Render task failed: {0}")]
    Render(String),
}
