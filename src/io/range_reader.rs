use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Random access to a byte range of a raster file.
///
/// The TIFF parser only ever asks for the header, the IFDs, tag arrays and the
/// blocks a tile window touches, so a dataset is never loaded whole.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Identifier used in logs and error messages (the absolute file path).
    fn identifier(&self) -> &str;

    /// Read the first `len` bytes, or the whole file if it is shorter.
    ///
    /// A classic TIFF header is 8 bytes and a BigTIFF one 16, so the header
    /// read asks for 16 without knowing which it will get.
    async fn read_prefix(&self, len: usize) -> Result<Bytes, IoError> {
        let len = len.min(usize::try_from(self.size()).unwrap_or(usize::MAX));
        self.read_exact_at(0, len).await
    }

    /// Read a TIFF block given its offset and byte count.
    ///
    /// A byte count of 0 marks a sparse block and yields `None` without I/O.
    async fn read_block_bytes(
        &self,
        offset: u64,
        byte_count: u64,
    ) -> Result<Option<Bytes>, IoError> {
        if byte_count == 0 {
            return Ok(None);
        }
        let len = usize::try_from(byte_count).map_err(|_| IoError::RangeOutOfBounds {
            offset,
            requested: byte_count,
            size: self.size(),
        })?;
        self.read_exact_at(offset, len).await.map(Some)
    }
}

/// Check that `offset..offset + len` lies within a resource of `size` bytes.
pub fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        }),
    }
}
