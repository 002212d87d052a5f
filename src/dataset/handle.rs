use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{DatasetError, TiffError};
use crate::format::tiff::{RasterLevel, RasterPyramid};
use crate::format::GeoReference;
use crate::io::FileRangeReader;

use super::crs::{Crs, CrsTransformer};
use super::mercator::TileAddress;

/// Points per raster edge when projecting the extent to lon/lat.
const EDGE_DENSIFY_POINTS: u32 = 21;

/// Dataset extent in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn to_array(self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

/// Samples for one map tile: a plane per requested band plus a shared mask.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSample {
    pub width: u32,
    pub height: u32,
    /// One row-major plane per requested band, in request order
    pub bands: Vec<Vec<f32>>,
    /// Non-zero where the pixel holds data
    pub mask: Vec<u8>,
}

/// An open georeferenced raster.
///
/// Owns its file handle; dropping the dataset closes the file.
pub struct Dataset {
    path: PathBuf,
    reader: FileRangeReader,
    pyramid: RasterPyramid,
    georef: GeoReference,
    crs: Crs,
    bounds: GeoBounds,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("bands", &self.band_count())
            .field("levels", &self.pyramid.level_count())
            .field("crs", &self.crs.name())
            .finish_non_exhaustive()
    }
}

/// Where one output pixel reads from in the chosen level.
#[derive(Debug, Clone, Copy)]
struct SourcePixel {
    col: u32,
    row: u32,
}

impl Dataset {
    /// Open a GeoTIFF and read its structure and georeferencing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source: TiffError| DatasetError::Open {
            path: path.display().to_string(),
            source,
        };

        let reader = FileRangeReader::open(&path)
            .await
            .map_err(|e| open_err(e.into()))?;
        let pyramid = RasterPyramid::parse(&reader).await.map_err(open_err)?;
        let georef = GeoReference::read(&reader, &pyramid)
            .await
            .map_err(open_err)?;
        let crs = Crs::from_epsg(georef.model, georef.epsg).map_err(open_err)?;
        let bounds = native_bounds_to_lonlat(&pyramid, &georef, &crs).map_err(open_err)?;

        debug!(
            path = %path.display(),
            bands = pyramid.base_level().samples_per_pixel,
            levels = pyramid.level_count(),
            crs = %crs.name(),
            "opened dataset"
        );

        Ok(Self {
            path,
            reader,
            pyramid,
            georef,
            crs,
            bounds,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bands (samples per pixel, 1 when the tag is absent).
    pub fn band_count(&self) -> usize {
        self.pyramid.base_level().samples_per_pixel as usize
    }

    /// Extent in lon/lat degrees.
    pub fn geographic_bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Read `bands` (1-based) for one map tile, resampled to `tile_size`.
    ///
    /// Nearest-neighbour sampling of the finest overview that is not finer
    /// than the tile needs. Only blocks under the tile are fetched.
    pub async fn read_tile(
        &self,
        address: TileAddress,
        bands: &[usize],
        tile_size: u32,
    ) -> Result<TileSample, DatasetError> {
        let count = self.band_count();
        if let Some(&index) = bands.iter().find(|&&b| b == 0 || b > count) {
            return Err(DatasetError::BandOutOfRange { index, count });
        }

        let (level, pixels) = {
            let transformer = self.crs.transformer()?;
            let level = self.choose_level(&transformer, address, tile_size);
            let pixels = self.map_pixels(&transformer, level, address, tile_size);
            (level, pixels)
        };

        // Zero-based planes this tile needs: the requested bands plus alpha
        let alpha = self.georef.alpha_band;
        let mut planes: Vec<usize> = bands.iter().map(|b| b - 1).collect();
        planes.extend(alpha);

        // Output pixels grouped by the block each of their planes lives in
        let mut by_block: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for (i, pixel) in pixels.iter().enumerate() {
            let Some(pixel) = pixel else { continue };
            let (bx, by) = (pixel.col / level.block_width, pixel.row / level.block_height);
            for (slot, &plane) in planes.iter().enumerate() {
                if let Some(index) = level.block_index(bx, by, plane) {
                    by_block.entry(index).or_default().push((i, slot));
                }
            }
        }

        let size = (tile_size as usize) * (tile_size as usize);
        let mut values = vec![0f32; planes.len() * size];
        let mut filled = vec![0usize; size];
        let block_count = by_block.len();

        // One decoded block alive at a time
        for (index, targets) in by_block {
            let Some(block) = level.read_block(&self.reader, index).await? else {
                // Sparse: its pixels never fill every plane
                continue;
            };
            for (i, slot) in targets {
                let Some(pixel) = pixels[i] else { continue };
                if let Some(&v) = block.get(offset_in_block(level, pixel, planes[slot])) {
                    values[slot * size + i] = v;
                    filled[i] += 1;
                }
            }
        }

        debug!(
            path = %self.path.display(),
            z = address.zoom,
            x = address.x,
            y = address.y,
            level = level.level_index,
            blocks = block_count,
            "read tile window"
        );

        let mut out_bands = vec![vec![0f32; size]; bands.len()];
        let mut mask = vec![0u8; size];
        let nodata = self.georef.nodata.map(|v| v as f32);

        for i in (0..size).filter(|&i| filled[i] == planes.len()) {
            for (b, band) in out_bands.iter_mut().enumerate() {
                band[i] = values[b * size + i];
            }

            let is_nodata = nodata.is_some_and(|nd| {
                (0..bands.len()).all(|b| {
                    let v = values[b * size + i];
                    v == nd || (v.is_nan() && nd.is_nan())
                })
            });
            let transparent = alpha.is_some() && values[bands.len() * size + i] == 0.0;
            if !is_nodata && !transparent {
                mask[i] = 255;
            }
        }

        Ok(TileSample {
            width: tile_size,
            height: tile_size,
            bands: out_bands,
            mask,
        })
    }

    /// Pick the overview level for a tile from its span in native units.
    fn choose_level(
        &self,
        transformer: &CrsTransformer,
        address: TileAddress,
        tile_size: u32,
    ) -> &RasterLevel {
        let bounds = address.mercator_bounds();
        let mid_y = (bounds.min_y + bounds.max_y) / 2.0;
        let base_pixel = self.georef.transform.pixel_size();

        let needed = match (
            transformer.from_mercator(bounds.min_x, mid_y),
            transformer.from_mercator(bounds.max_x, mid_y),
        ) {
            (Some((x0, y0)), Some((x1, y1))) if base_pixel > 0.0 => {
                let span = (x1 - x0).hypot(y1 - y0);
                span / tile_size as f64 / base_pixel
            }
            _ => 1.0,
        };

        self.pyramid.best_level_for_downsample(needed)
    }

    /// Source pixel in `level` for each output pixel, `None` outside the raster.
    fn map_pixels(
        &self,
        transformer: &CrsTransformer,
        level: &RasterLevel,
        address: TileAddress,
        tile_size: u32,
    ) -> Vec<Option<SourcePixel>> {
        let bounds = address.mercator_bounds();
        let base = self.pyramid.base_level();
        let scale_x = level.width as f64 / base.width as f64;
        let scale_y = level.height as f64 / base.height as f64;

        let mut pixels = Vec::with_capacity((tile_size * tile_size) as usize);
        for row in 0..tile_size {
            for col in 0..tile_size {
                let (mx, my) = bounds.pixel_center(col, row, tile_size);
                let source = transformer
                    .from_mercator(mx, my)
                    .and_then(|(x, y)| self.georef.transform.model_to_pixel(x, y))
                    .and_then(|(c, r)| {
                        let (c, r) = ((c * scale_x).floor(), (r * scale_y).floor());
                        let inside = c >= 0.0
                            && r >= 0.0
                            && c < level.width as f64
                            && r < level.height as f64;
                        inside.then_some(SourcePixel {
                            col: c as u32,
                            row: r as u32,
                        })
                    });
                pixels.push(source);
            }
        }
        pixels
    }
}

/// Index of one plane's sample for a level pixel within its decoded block.
fn offset_in_block(level: &RasterLevel, pixel: SourcePixel, plane: usize) -> usize {
    let x = (pixel.col % level.block_width) as usize;
    let y = (pixel.row % level.block_height) as usize;
    let within = if level.planar { 0 } else { plane };
    (y * level.block_width as usize + x) * level.block_samples() + within
}

/// Project the raster outline to lon/lat and take its envelope.
fn native_bounds_to_lonlat(
    pyramid: &RasterPyramid,
    georef: &GeoReference,
    crs: &Crs,
) -> Result<GeoBounds, TiffError> {
    let base = pyramid.base_level();
    let (w, h) = (base.width as f64, base.height as f64);
    let transformer = crs.transformer()?;

    let steps = if matches!(crs, Crs::Geographic { .. }) {
        1
    } else {
        EDGE_DENSIFY_POINTS - 1
    };

    let mut outline = Vec::with_capacity(4 * (steps as usize + 1));
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        outline.push((t * w, 0.0));
        outline.push((t * w, h));
        outline.push((0.0, t * h));
        outline.push((w, t * h));
    }

    let mut bounds = GeoBounds {
        west: f64::INFINITY,
        south: f64::INFINITY,
        east: f64::NEG_INFINITY,
        north: f64::NEG_INFINITY,
    };
    for (col, row) in outline {
        let (x, y) = georef.transform.pixel_to_model(col, row);
        if let Some((lon, lat)) = transformer.to_lonlat(x, y) {
            bounds.west = bounds.west.min(lon);
            bounds.south = bounds.south.min(lat);
            bounds.east = bounds.east.max(lon);
            bounds.north = bounds.north.max(lat);
        }
    }

    if !bounds.west.is_finite() || !bounds.north.is_finite() {
        return Err(TiffError::UnsupportedCrs(format!(
            "{} extent cannot be expressed in lon/lat",
            crs.name()
        )));
    }
    Ok(bounds)
}
