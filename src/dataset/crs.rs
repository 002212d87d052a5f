//! Coordinate reference systems a dataset can be stored in.
//!
//! Geographic and Web Mercator rasters are converted with closed-form math.
//! UTM zones go through `proj4rs`. Projections are built per use by
//! [`Crs::transformer`] and never kept inside the dataset.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::TiffError;
use crate::format::ModelKind;

use super::mercator::{merc_x_to_lon, merc_y_to_lat};

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// EPSG codes that all mean spherical Web Mercator.
const WEB_MERCATOR_CODES: [u32; 5] = [3857, 3785, 900913, 102100, 102113];

/// Storage CRS of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude degrees, treated as WGS84
    Geographic { epsg: u32 },
    WebMercator,
    /// Projected CRS described by a proj string
    Projected { epsg: u32, definition: String },
}

impl Crs {
    /// Resolve the GeoKey model kind and EPSG code to a supported CRS.
    pub fn from_epsg(model: ModelKind, epsg: u32) -> Result<Self, TiffError> {
        if model == ModelKind::Geographic || (4000..5000).contains(&epsg) {
            return Ok(Crs::Geographic { epsg });
        }
        if WEB_MERCATOR_CODES.contains(&epsg) {
            return Ok(Crs::WebMercator);
        }
        utm_definition(epsg)
            .map(|definition| Crs::Projected { epsg, definition })
            .ok_or_else(|| TiffError::UnsupportedCrs(format!("EPSG:{}", epsg)))
    }

    /// Human-readable CRS name, e.g. `EPSG:32633`.
    pub fn name(&self) -> String {
        match self {
            Crs::Geographic { epsg } | Crs::Projected { epsg, .. } => format!("EPSG:{}", epsg),
            Crs::WebMercator => "EPSG:3857".to_string(),
        }
    }

    /// Build a transformer between this CRS and lon/lat / Web Mercator.
    pub fn transformer(&self) -> Result<CrsTransformer, TiffError> {
        match self {
            Crs::Geographic { .. } => Ok(CrsTransformer::Geographic),
            Crs::WebMercator => Ok(CrsTransformer::WebMercator),
            Crs::Projected { epsg, definition } => {
                let projected = Proj::from_proj_string(definition)
                    .map_err(|e| TiffError::UnsupportedCrs(format!("EPSG:{}: {:?}", epsg, e)))?;
                let lonlat = Proj::from_proj_string(WGS84_LONLAT)
                    .map_err(|e| TiffError::UnsupportedCrs(format!("EPSG:4326: {:?}", e)))?;
                Ok(CrsTransformer::Projected {
                    projected: Box::new(projected),
                    lonlat: Box::new(lonlat),
                })
            }
        }
    }
}

/// proj string for UTM zones on WGS84, ETRS89 and NAD83.
fn utm_definition(epsg: u32) -> Option<String> {
    let (zone, south, datum) = match epsg {
        32601..=32660 => (epsg - 32600, false, "+datum=WGS84"),
        32701..=32760 => (epsg - 32700, true, "+datum=WGS84"),
        25828..=25838 => (epsg - 25800, false, "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0"),
        26901..=26923 => (epsg - 26900, false, "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0"),
        _ => return None,
    };
    let south = if south { " +south" } else { "" };
    Some(format!(
        "+proj=utm +zone={}{} {} +units=m +no_defs",
        zone, south, datum
    ))
}

/// Point conversions for one CRS. Not kept across awaits.
pub enum CrsTransformer {
    Geographic,
    WebMercator,
    Projected {
        projected: Box<Proj>,
        lonlat: Box<Proj>,
    },
}

impl CrsTransformer {
    /// Web Mercator meters to native coordinates.
    pub fn from_mercator(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            CrsTransformer::WebMercator => Some((x, y)),
            CrsTransformer::Geographic => Some((merc_x_to_lon(x), merc_y_to_lat(y))),
            CrsTransformer::Projected { projected, lonlat } => {
                let mut point = (
                    merc_x_to_lon(x).to_radians(),
                    merc_y_to_lat(y).to_radians(),
                    0.0,
                );
                transform(lonlat, projected, &mut point).ok()?;
                finite(point.0, point.1)
            }
        }
    }

    /// Native coordinates to lon/lat degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            CrsTransformer::Geographic => finite(x, y),
            CrsTransformer::WebMercator => finite(merc_x_to_lon(x), merc_y_to_lat(y)),
            CrsTransformer::Projected { projected, lonlat } => {
                let mut point = (x, y, 0.0);
                transform(projected, lonlat, &mut point).ok()?;
                finite(point.0.to_degrees(), point.1.to_degrees())
            }
        }
    }
}

#[inline]
fn finite(x: f64, y: f64) -> Option<(f64, f64)> {
    (x.is_finite() && y.is_finite()).then_some((x, y))
}
