//! GeoTIFF georeferencing: raster-to-model transform, CRS code, nodata and
//! alpha.
//!
//! The transform comes from either ModelTransformation or the
//! ModelTiepoint + ModelPixelScale pair and is held in the usual six-term
//! affine form:
//!
//! ```text
//! x = origin_x + col * pixel_width + row * row_rotation
//! y = origin_y + col * col_rotation + row * pixel_height
//! ```

use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::tiff::{Ifd, RasterPyramid, TiffTag, ValueReader};

// =============================================================================
// GeoKey ids
// =============================================================================

const GT_MODEL_TYPE: u64 = 1024;
const GT_RASTER_TYPE: u64 = 1025;
const GEOGRAPHIC_TYPE: u64 = 2048;
const PROJECTED_CS_TYPE: u64 = 3072;

const MODEL_TYPE_PROJECTED: u64 = 1;
const MODEL_TYPE_GEOGRAPHIC: u64 = 2;
const RASTER_PIXEL_IS_POINT: u64 = 2;

/// GeoKey value meaning "user-defined", i.e. no EPSG code
const USER_DEFINED: u64 = 32767;

/// ExtraSamples values for associated and unassociated alpha
const EXTRA_ASSOCIATED_ALPHA: u64 = 1;
const EXTRA_UNASSOCIATED_ALPHA: u64 = 2;

// =============================================================================
// GeoTransform
// =============================================================================

/// Affine raster-to-model transform in GDAL coefficient order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from a tie point and pixel scale.
    ///
    /// `tiepoint` is `(i, j, k, x, y, z)`; raster `(i, j)` maps to `(x, y)`.
    pub fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return None;
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);
        Some(Self {
            origin_x: x - i * sx,
            pixel_width: sx,
            row_rotation: 0.0,
            origin_y: y + j * sy,
            col_rotation: 0.0,
            pixel_height: -sy,
        })
    }

    /// Transform from a row-major 4x4 ModelTransformation matrix.
    pub fn from_matrix(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 16 {
            return None;
        }
        Some(Self {
            origin_x: matrix[3],
            pixel_width: matrix[0],
            row_rotation: matrix[1],
            origin_y: matrix[7],
            col_rotation: matrix[4],
            pixel_height: matrix[5],
        })
    }

    /// Move the origin from a pixel centre to its corner (PixelIsPoint).
    pub fn shift_half_pixel(self) -> Self {
        let (x, y) = self.pixel_to_model(-0.5, -0.5);
        Self {
            origin_x: x,
            origin_y: y,
            ..self
        }
    }

    /// Model coordinates of a raster position (pixel edges are integers).
    #[inline]
    pub fn pixel_to_model(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Raster position of a model coordinate, `None` for a degenerate transform.
    #[inline]
    pub fn model_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        Some((
            (dx * self.pixel_height - dy * self.row_rotation) / det,
            (dy * self.pixel_width - dx * self.col_rotation) / det,
        ))
    }

    /// Model-space size of one pixel along x, used to pick overviews.
    pub fn pixel_size(&self) -> f64 {
        self.pixel_width.hypot(self.col_rotation)
    }
}

// =============================================================================
// GeoReference
// =============================================================================

/// Kind of coordinate system named by the GeoKeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Geographic,
    Projected,
}

/// Everything the dataset needs beyond the pixel blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    pub transform: GeoTransform,
    pub model: ModelKind,
    /// EPSG code of the geographic or projected CRS
    pub epsg: u32,
    pub nodata: Option<f64>,
    /// Zero-based sample holding alpha, if any
    pub alpha_band: Option<usize>,
}

impl GeoReference {
    /// Read georeferencing from the full-resolution IFD.
    pub async fn read<R: RangeReader>(
        reader: &R,
        pyramid: &RasterPyramid,
    ) -> Result<Self, TiffError> {
        let ifd = &pyramid.base_ifd;
        let values = ValueReader::new(reader, &pyramid.header);

        let keys = match ifd.get_entry_by_tag(TiffTag::GeoKeyDirectory) {
            Some(entry) => values.read_u64_array(TiffTag::GeoKeyDirectory, entry).await?,
            None => return Err(TiffError::MissingGeoreference("GeoKeyDirectory")),
        };
        let (model, epsg) = crs_from_geokeys(&keys)?;
        let pixel_is_point = geokey(&keys, GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT);

        let transform = read_transform(&values, ifd).await?;
        let transform = if pixel_is_point {
            transform.shift_half_pixel()
        } else {
            transform
        };

        let nodata = match ifd.get_entry_by_tag(TiffTag::GdalNodata) {
            Some(entry) => parse_nodata(&values.read_string(TiffTag::GdalNodata, entry).await?),
            None => None,
        };

        let extra = match ifd.get_entry_by_tag(TiffTag::ExtraSamples) {
            Some(entry) => values.read_u64_array(TiffTag::ExtraSamples, entry).await?,
            None => Vec::new(),
        };
        let spp = pyramid.base_level().samples_per_pixel as usize;
        let alpha_band = alpha_sample(&extra, spp);

        Ok(GeoReference {
            transform,
            model,
            epsg,
            nodata,
            alpha_band,
        })
    }
}

async fn read_transform<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
) -> Result<GeoTransform, TiffError> {
    if let Some(entry) = ifd.get_entry_by_tag(TiffTag::ModelTransformation) {
        let matrix = values
            .read_f64_array(TiffTag::ModelTransformation, entry)
            .await?;
        return GeoTransform::from_matrix(&matrix).ok_or(TiffError::InvalidTagValue {
            tag: TiffTag::ModelTransformation.name(),
            message: format!("expected 16 values, got {}", matrix.len()),
        });
    }

    let tiepoint = match ifd.get_entry_by_tag(TiffTag::ModelTiepoint) {
        Some(entry) => values.read_f64_array(TiffTag::ModelTiepoint, entry).await?,
        None => return Err(TiffError::MissingGeoreference("ModelTiepoint")),
    };
    let scale = match ifd.get_entry_by_tag(TiffTag::ModelPixelScale) {
        Some(entry) => values.read_f64_array(TiffTag::ModelPixelScale, entry).await?,
        None => return Err(TiffError::MissingGeoreference("ModelPixelScale")),
    };

    GeoTransform::from_tiepoint(&tiepoint, &scale).ok_or(TiffError::InvalidTagValue {
        tag: TiffTag::ModelTiepoint.name(),
        message: format!(
            "need 6 tie point and 2 scale values, got {} and {}",
            tiepoint.len(),
            scale.len()
        ),
    })
}

/// Look up a GeoKey stored inline in the directory.
fn geokey(directory: &[u64], key: u64) -> Option<u64> {
    let count = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

/// Model kind and EPSG code from a GeoKey directory.
fn crs_from_geokeys(directory: &[u64]) -> Result<(ModelKind, u32), TiffError> {
    let projected = geokey(directory, PROJECTED_CS_TYPE);
    let geographic = geokey(directory, GEOGRAPHIC_TYPE);

    let (model, code) = match geokey(directory, GT_MODEL_TYPE) {
        Some(MODEL_TYPE_PROJECTED) => (ModelKind::Projected, projected),
        Some(MODEL_TYPE_GEOGRAPHIC) => (ModelKind::Geographic, geographic),
        Some(other) => {
            return Err(TiffError::UnsupportedCrs(format!("model type {}", other)));
        }
        None => match (projected, geographic) {
            (Some(code), _) => (ModelKind::Projected, Some(code)),
            (None, Some(code)) => (ModelKind::Geographic, Some(code)),
            (None, None) => return Err(TiffError::MissingGeoreference("CRS GeoKeys")),
        },
    };

    match code {
        Some(USER_DEFINED) => Err(TiffError::UnsupportedCrs(
            "user-defined coordinate system".to_string(),
        )),
        Some(code) => u32::try_from(code)
            .map(|code| (model, code))
            .map_err(|_| TiffError::UnsupportedCrs(code.to_string())),
        None => Err(TiffError::MissingGeoreference("CRS GeoKeys")),
    }
}

/// GDAL_NODATA is a decimal string; unparseable values are ignored.
fn parse_nodata(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(value = trimmed, "ignoring unparseable GDAL_NODATA");
            None
        }
    }
}

/// Zero-based sample index of the first alpha extra sample.
fn alpha_sample(extra_samples: &[u64], samples_per_pixel: usize) -> Option<usize> {
    let first_extra = samples_per_pixel.checked_sub(extra_samples.len())?;
    extra_samples
        .iter()
        .position(|&v| v == EXTRA_ASSOCIATED_ALPHA || v == EXTRA_UNASSOCIATED_ALPHA)
        .map(|i| first_extra + i)
}
