//! Raster levels: the full-resolution image and its overviews.
//!
//! A GeoTIFF holds the full-resolution raster in its first IFD. Following
//! IFDs with the reduced-resolution bit set in NewSubfileType are internal
//! overviews; IFDs with the mask bit set are skipped. Every level is read
//! through the same block model:
//!
//! ```text
//! tiled:   blocks are TileWidth x TileLength, padded at the right/bottom
//! stripped: blocks are ImageWidth x RowsPerStrip, the last strip is short
//! planar:  one run of blocks per band, band b starts at b * blocks_per_plane
//! ```

use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::decode::BlockDecoder;
use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to parse (safety limit)
const MAX_IFDS: usize = 100;

/// NewSubfileType bit: reduced-resolution version of another image
const SUBFILE_REDUCED: u32 = 0x1;

/// NewSubfileType bit: transparency mask for another image
const SUBFILE_MASK: u32 = 0x4;

/// PlanarConfiguration value for one plane per band
const PLANAR_SEPARATE: u16 = 2;

// =============================================================================
// RasterLevel
// =============================================================================

/// One resolution of the raster.
#[derive(Debug, Clone)]
pub struct RasterLevel {
    /// 0 = full resolution, then overviews from finest to coarsest
    pub level_index: usize,

    /// Position of the IFD in the file's chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,

    /// Block size; for strips this is the image width by RowsPerStrip
    pub block_width: u32,
    pub block_height: u32,

    pub blocks_across: u32,
    pub blocks_down: u32,

    /// Whether blocks are tiles (padded) rather than strips
    pub tiled: bool,

    /// Whether each band is stored in its own plane
    pub planar: bool,

    pub samples_per_pixel: u16,

    /// Full-resolution width divided by this level's width
    pub downsample: f64,

    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,

    pub decoder: BlockDecoder,
}

impl RasterLevel {
    /// Read the block layout and block tables of an IFD.
    async fn load<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
        ifd: &Ifd,
        ifd_index: usize,
    ) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let values = ValueReader::new(reader, header);

        let width = ifd
            .image_width(byte_order)
            .ok_or(TiffError::MissingTag("ImageWidth"))?;
        let height = ifd
            .image_height(byte_order)
            .ok_or(TiffError::MissingTag("ImageLength"))?;
        if width == 0 || height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "ImageWidth",
                message: format!("empty image {}x{}", width, height),
            });
        }

        let samples_per_pixel = ifd.samples_per_pixel(byte_order).max(1);
        let planar = ifd.planar_configuration(byte_order) == PLANAR_SEPARATE;

        let tiled = ifd.is_tiled();
        let (block_width, block_height, offsets_tag, counts_tag) = if tiled {
            let tw = ifd
                .tile_width(byte_order)
                .ok_or(TiffError::MissingTag("TileWidth"))?;
            let th = ifd
                .tile_height(byte_order)
                .ok_or(TiffError::MissingTag("TileLength"))?;
            (tw, th, TiffTag::TileOffsets, TiffTag::TileByteCounts)
        } else {
            let rows = ifd
                .rows_per_strip(byte_order)
                .unwrap_or(height)
                .clamp(1, height);
            (width, rows, TiffTag::StripOffsets, TiffTag::StripByteCounts)
        };
        if block_width == 0 || block_height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "TileWidth",
                message: "zero block dimension".to_string(),
            });
        }

        let blocks_across = width.div_ceil(block_width);
        let blocks_down = height.div_ceil(block_height);

        let offsets_entry = ifd
            .get_entry_by_tag(offsets_tag)
            .ok_or(TiffError::MissingTag(offsets_tag.name()))?;
        let counts_entry = ifd
            .get_entry_by_tag(counts_tag)
            .ok_or(TiffError::MissingTag(counts_tag.name()))?;
        let offsets = values.read_u64_array(offsets_tag, offsets_entry).await?;
        let byte_counts = values.read_u64_array(counts_tag, counts_entry).await?;

        let planes = if planar { samples_per_pixel as usize } else { 1 };
        let expected = blocks_across as usize * blocks_down as usize * planes;
        if offsets.len() < expected || byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: offsets_tag.name(),
                message: format!(
                    "expected {} blocks, found {} offsets and {} byte counts",
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let bits = read_uniform(&values, ifd, TiffTag::BitsPerSample, 1).await?;
        let sample_format = read_uniform(&values, ifd, TiffTag::SampleFormat, 1).await?;

        let compression_raw = ifd.compression(byte_order);
        let compression = Compression::from_u16(compression_raw)
            .ok_or_else(|| TiffError::UnsupportedCompression(compression_raw.to_string()))?;

        let jpeg_tables = match ifd.get_entry_by_tag(TiffTag::JpegTables) {
            Some(entry) if compression == Compression::Jpeg => Some(values.read_bytes(entry).await?),
            _ => None,
        };

        let block_samples = if planar { 1 } else { samples_per_pixel as usize };
        let decoder = BlockDecoder::new(
            compression,
            ifd.predictor(byte_order),
            bits,
            sample_format,
            block_samples,
            byte_order,
            jpeg_tables,
        )?;

        Ok(RasterLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            block_width,
            block_height,
            blocks_across,
            blocks_down,
            tiled,
            planar,
            samples_per_pixel,
            downsample: 1.0,
            offsets,
            byte_counts,
            decoder,
        })
    }

    /// Number of blocks in one plane.
    #[inline]
    pub fn blocks_per_plane(&self) -> usize {
        self.blocks_across as usize * self.blocks_down as usize
    }

    /// Block index for block column/row and zero-based plane.
    ///
    /// `plane` is ignored for chunky files.
    pub fn block_index(&self, block_x: u32, block_y: u32, plane: usize) -> Option<usize> {
        if block_x >= self.blocks_across || block_y >= self.blocks_down {
            return None;
        }
        let within = block_y as usize * self.blocks_across as usize + block_x as usize;
        if self.planar {
            if plane >= self.samples_per_pixel as usize {
                return None;
            }
            Some(plane * self.blocks_per_plane() + within)
        } else {
            Some(within)
        }
    }

    /// Rows stored in a block row. Tiles are padded, the last strip is not.
    pub fn block_rows(&self, block_y: u32) -> u32 {
        if self.tiled {
            self.block_height
        } else {
            let start = block_y * self.block_height;
            self.block_height.min(self.height.saturating_sub(start))
        }
    }

    /// Samples per pixel inside one decoded block.
    #[inline]
    pub fn block_samples(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples_per_pixel as usize
        }
    }

    /// Offset and byte count of a block.
    pub fn block_location(&self, index: usize) -> Option<(u64, u64)> {
        Some((*self.offsets.get(index)?, *self.byte_counts.get(index)?))
    }

    /// Fetch and decode one block.
    ///
    /// Returns `None` for sparse blocks (byte count 0), which hold no data.
    pub async fn read_block<R: RangeReader>(
        &self,
        reader: &R,
        index: usize,
    ) -> Result<Option<Vec<f32>>, TiffError> {
        let (offset, byte_count) =
            self.block_location(index)
                .ok_or_else(|| TiffError::Decode {
                    block: index,
                    message: "block index out of range".to_string(),
                })?;
        let Some(data) = reader.read_block_bytes(offset, byte_count).await? else {
            return Ok(None);
        };
        let block_y = (index % self.blocks_per_plane()) as u32 / self.blocks_across;
        let samples = self.decoder.decode(
            index,
            &data,
            self.block_width as usize,
            self.block_rows(block_y) as usize,
        )?;
        Ok(Some(samples))
    }
}

/// Read a per-sample Short array whose values must all agree.
async fn read_uniform<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
    tag: TiffTag,
    default: u16,
) -> Result<u16, TiffError> {
    let Some(entry) = ifd.get_entry_by_tag(tag) else {
        return Ok(default);
    };
    let all = values.read_u64_array(tag, entry).await?;
    let Some(&first) = all.first() else {
        return Ok(default);
    };
    if all.iter().any(|&v| v != first) {
        return Err(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("mixed per-band values {:?}", all),
        });
    }
    u16::try_from(first).map_err(|_| TiffError::InvalidTagValue {
        tag: tag.name(),
        message: format!("value {} out of range", first),
    })
}

// =============================================================================
// RasterPyramid
// =============================================================================

/// The full-resolution level plus usable overviews, finest first.
#[derive(Debug, Clone)]
pub struct RasterPyramid {
    pub header: TiffHeader,

    /// IFD of the full-resolution image; carries the GeoTIFF tags
    pub base_ifd: Ifd,

    pub levels: Vec<RasterLevel>,
}

impl RasterPyramid {
    /// Parse the header, walk the IFD chain and load every usable level.
    pub async fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_bytes = reader.read_prefix(BIGTIFF_HEADER_SIZE).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header).await?;
        let mut ifds = ifds.into_iter().enumerate();
        let (_, base_ifd) = ifds.next().ok_or(TiffError::InvalidIfdOffset(0))?;

        let base = RasterLevel::load(reader, &header, &base_ifd, 0).await?;
        let mut levels = vec![base];

        let byte_order = header.byte_order;
        for (ifd_index, ifd) in ifds {
            let subfile = ifd.new_subfile_type(byte_order);
            if subfile & SUBFILE_MASK != 0 || subfile & SUBFILE_REDUCED == 0 {
                continue;
            }
            match RasterLevel::load(reader, &header, &ifd, ifd_index).await {
                Ok(level) if level.samples_per_pixel == levels[0].samples_per_pixel => {
                    levels.push(level)
                }
                Ok(_) => debug!(ifd_index, "skipping overview with different band count"),
                Err(e) => debug!(ifd_index, error = %e, "skipping unreadable overview"),
            }
        }

        Ok(Self::from_levels(header, base_ifd, levels))
    }

    /// Order levels from finest to coarsest and compute downsample factors.
    fn from_levels(header: TiffHeader, base_ifd: Ifd, mut levels: Vec<RasterLevel>) -> Self {
        let base_width = levels.first().map(|l| l.width).unwrap_or(1) as f64;
        levels[1..].sort_by(|a, b| b.width.cmp(&a.width));
        for (i, level) in levels.iter_mut().enumerate() {
            level.level_index = i;
            level.downsample = base_width / level.width as f64;
        }
        RasterPyramid {
            header,
            base_ifd,
            levels,
        }
    }

    /// Parse all IFDs following the next-IFD chain.
    async fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            let count_size = header.ifd_count_size();
            let count_bytes = reader.read_exact_at(offset, count_size).await?;

            let entry_count = if header.is_bigtiff {
                header.byte_order.read_u64(&count_bytes)
            } else {
                header.byte_order.read_u16(&count_bytes) as u64
            };

            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The full-resolution level.
    pub fn base_level(&self) -> &RasterLevel {
        &self.levels[0]
    }

    /// Finest level not finer than needed: the largest downsample that is
    /// still at or below `downsample`. Falls back to full resolution.
    pub fn best_level_for_downsample(&self, downsample: f64) -> &RasterLevel {
        self.levels
            .iter()
            .filter(|l| l.downsample <= downsample * 1.01)
            .max_by(|a, b| a.downsample.total_cmp(&b.downsample))
            .unwrap_or(&self.levels[0])
    }
}

// =============================================================================
// Tests
// =============================================================================
