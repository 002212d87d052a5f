//! Slippy-map tile addressing over the spherical Web Mercator extent.

use std::f64::consts::PI;

/// Half the Web Mercator world width, in meters.
pub const HALF_EARTH: f64 = 20_037_508.342_789_244;

/// Full Web Mercator world width, in meters.
pub const WORLD_SIZE: f64 = 40_075_016.685_578_49;

/// Deepest zoom level accepted.
pub const MAX_ZOOM: u8 = 30;

/// Latitude limit of the square Web Mercator world.
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// A `(zoom, x, y)` tile with `x, y < 2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    /// Build a tile address, `None` when it lies outside the zoom's grid.
    pub fn new(zoom: u8, x: u32, y: u32) -> Option<Self> {
        if zoom > MAX_ZOOM {
            return None;
        }
        let tiles = 1u64 << zoom;
        if x as u64 >= tiles || y as u64 >= tiles {
            return None;
        }
        Some(Self { zoom, x, y })
    }

    /// Extent of this tile in Web Mercator meters.
    pub fn mercator_bounds(&self) -> MercatorBounds {
        let size = WORLD_SIZE / (1u64 << self.zoom) as f64;
        let min_x = -HALF_EARTH + self.x as f64 * size;
        let max_y = HALF_EARTH - self.y as f64 * size;
        MercatorBounds {
            min_x,
            min_y: max_y - size,
            max_x: min_x + size,
            max_y,
        }
    }
}

/// Axis-aligned box in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MercatorBounds {
    /// Centre of output pixel `(col, row)` on a `size` x `size` grid.
    #[inline]
    pub fn pixel_center(&self, col: u32, row: u32, size: u32) -> (f64, f64) {
        let res_x = (self.max_x - self.min_x) / size as f64;
        let res_y = (self.max_y - self.min_y) / size as f64;
        (
            self.min_x + (col as f64 + 0.5) * res_x,
            self.max_y - (row as f64 + 0.5) * res_y,
        )
    }
}

#[inline]
pub fn merc_x_to_lon(x: f64) -> f64 {
    x * 180.0 / HALF_EARTH
}

#[inline]
pub fn merc_y_to_lat(y: f64) -> f64 {
    let y_rad = y * PI / HALF_EARTH;
    (2.0 * y_rad.exp().atan() - PI / 2.0).to_degrees()
}

#[inline]
pub fn lon_to_merc_x(lon: f64) -> f64 {
    lon * HALF_EARTH / 180.0
}

/// Latitudes past the Mercator limit are clamped to it.
#[inline]
pub fn lat_to_merc_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln() * HALF_EARTH / PI
}
