//! Spherical Web Mercator conversions and TMS tile arithmetic
//!
//! Meters are EPSG:3857. Pixels are global pixel coordinates at a zoom level with
//! the origin at the south-west corner of the world (y grows north), and tile rows
//! follow the TMS convention unless converted with [`tms_to_xyz_row`].

use geo::{Coord, Rect};

/// Tile edge length in pixels
pub const TILE_SIZE: u32 = 256;

/// Tile edge length as a float, for pixel math
pub const TILE_SIZE_F: f64 = TILE_SIZE as f64;

/// Equatorial radius of the WGS84 sphere used by Web Mercator
pub const EARTH_RADIUS_M: f64 = 6378137.0;

/// Half the world width in meters (EPSG:3857)
pub const ORIGIN_SHIFT: f64 = std::f64::consts::PI * EARTH_RADIUS_M;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Meters per pixel at zoom 0
const INITIAL_RESOLUTION: f64 = 2.0 * ORIGIN_SHIFT / TILE_SIZE_F;

/// Precomputed constant: ORIGIN_SHIFT / 180.0
const LON_TO_X_FACTOR: f64 = ORIGIN_SHIFT / 180.0;

/// Precomputed constant: ORIGIN_SHIFT / PI
const Y_FACTOR: f64 = ORIGIN_SHIFT / std::f64::consts::PI;

/// Convert WGS84 (lat, lon) to Web Mercator meters
///
/// Latitude is clamped to the valid Web Mercator range.
#[inline(always)]
pub fn lat_lon_to_meters(lat: f64, lon: f64) -> Coord<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let lat_rad = lat.to_radians();
    Coord {
        x: lon * LON_TO_X_FACTOR,
        y: (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR,
    }
}

/// Convert Web Mercator meters back to WGS84 `(lat, lon)` in degrees
#[inline(always)]
pub fn meters_to_lat_lon(meters: Coord<f64>) -> (f64, f64) {
    let lon = meters.x / LON_TO_X_FACTOR;
    let lat = (std::f64::consts::PI / 2.0 - 2.0 * (-meters.y / Y_FACTOR).exp().atan()).to_degrees();
    (lat, lon)
}

/// Meters per pixel at `zoom`
#[inline(always)]
pub fn resolution(zoom: u8) -> f64 {
    INITIAL_RESOLUTION / (1u64 << zoom) as f64
}

/// Convert meters to global pixel coordinates at `zoom`
#[inline(always)]
pub fn meters_to_pixels(meters: Coord<f64>, zoom: u8) -> Coord<f64> {
    let res = resolution(zoom);
    Coord {
        x: (meters.x + ORIGIN_SHIFT) / res,
        y: (meters.y + ORIGIN_SHIFT) / res,
    }
}

/// Convert global pixel coordinates at `zoom` to meters
#[inline(always)]
pub fn pixels_to_meters(pixels: Coord<f64>, zoom: u8) -> Coord<f64> {
    let res = resolution(zoom);
    Coord {
        x: pixels.x * res - ORIGIN_SHIFT,
        y: pixels.y * res - ORIGIN_SHIFT,
    }
}

/// Number of tiles along one axis at `zoom`
#[inline(always)]
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Bounds of the TMS tile `(x, y)` at `zoom` in meters
pub fn tile_bounds(x: u32, y: u32, zoom: u8) -> Rect<f64> {
    let (min, max) = tile_pixel_corners(x, y);
    Rect::new(pixels_to_meters(min, zoom), pixels_to_meters(max, zoom))
}

/// Bounds of the TMS tile `(x, y)` in global pixels at its own zoom
///
/// Since pixels scale by exactly two per zoom level, this is simply the tile
/// index times the tile size.
pub fn tile_pixel_rect(x: u32, y: u32) -> Rect<f64> {
    let (min, max) = tile_pixel_corners(x, y);
    Rect::new(min, max)
}

fn tile_pixel_corners(x: u32, y: u32) -> (Coord<f64>, Coord<f64>) {
    let min = Coord {
        x: x as f64 * TILE_SIZE_F,
        y: y as f64 * TILE_SIZE_F,
    };
    let max = Coord {
        x: min.x + TILE_SIZE_F,
        y: min.y + TILE_SIZE_F,
    };
    (min, max)
}

/// TMS tile containing `meters` at `zoom`, clamped to the valid tile range
pub fn meters_to_tile(meters: Coord<f64>, zoom: u8) -> (u32, u32) {
    let pixels = meters_to_pixels(meters, zoom);
    let max_index = (tiles_per_axis(zoom) - 1) as f64;
    let to_index = |p: f64| ((p / TILE_SIZE_F).ceil() - 1.0).clamp(0.0, max_index) as u32;
    (to_index(pixels.x), to_index(pixels.y))
}

/// Convert a TMS row to the XYZ ("slippy map") row used in file names
#[inline]
pub fn tms_to_xyz_row(y: u32, zoom: u8) -> u32 {
    tiles_per_axis(zoom) - y - 1
}

/// Convert a global pixel position to tile-local pixels of the tile whose
/// south-west corner is `origin`, flipping y so that it grows downward
#[inline(always)]
pub fn to_tile_local(pixels: Coord<f64>, origin: Coord<f64>) -> Coord<f64> {
    Coord {
        x: pixels.x - origin.x,
        y: TILE_SIZE_F - (pixels.y - origin.y),
    }
}

/// Inverse of [`to_tile_local`]
#[inline(always)]
pub fn from_tile_local(local: Coord<f64>, origin: Coord<f64>) -> Coord<f64> {
    Coord {
        x: local.x + origin.x,
        y: origin.y + TILE_SIZE_F - local.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lon_to_meters_origin() {
        let m = lat_lon_to_meters(0.0, 0.0);
        assert!(m.x.abs() < 0.01);
        assert!(m.y.abs() < 0.01);
    }

    #[test]
    fn test_lat_lon_to_meters_bounds() {
        let west = lat_lon_to_meters(0.0, -180.0);
        assert!((west.x + ORIGIN_SHIFT).abs() < 1e-6);

        let north = lat_lon_to_meters(90.0, 0.0);
        assert!((north.y - ORIGIN_SHIFT).abs() < 1.0);
    }

    #[test]
    fn test_meters_to_lat_lon_roundtrip() {
        let (lat, lon) = (42.6525, -73.757222);
        let (lat2, lon2) = meters_to_lat_lon(lat_lon_to_meters(lat, lon));
        assert!((lat - lat2).abs() < 1e-9);
        assert!((lon - lon2).abs() < 1e-9);
    }

    #[test]
    fn test_pixels_double_per_zoom() {
        let m = lat_lon_to_meters(42.6525, -73.757222);
        let p8 = meters_to_pixels(m, 8);
        let p9 = meters_to_pixels(m, 9);
        assert!((p9.x - 2.0 * p8.x).abs() < 1e-6);
        assert!((p9.y - 2.0 * p8.y).abs() < 1e-6);
    }

    #[test]
    fn test_root_tile_covers_world() {
        let bounds = tile_bounds(0, 0, 0);
        assert!((bounds.min().x + ORIGIN_SHIFT).abs() < 1e-6);
        assert!((bounds.max().y - ORIGIN_SHIFT).abs() < 1e-6);
        assert_eq!(
            tile_pixel_rect(0, 0),
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 256.0, y: 256.0 })
        );
    }

    #[test]
    fn test_child_tile_contained_in_parent() {
        let parent = tile_bounds(3, 5, 4);
        for (cx, cy) in [(6, 10), (6, 11), (7, 10), (7, 11)] {
            let child = tile_bounds(cx, cy, 5);
            assert!(child.min().x >= parent.min().x - 1e-6);
            assert!(child.min().y >= parent.min().y - 1e-6);
            assert!(child.max().x <= parent.max().x + 1e-6);
            assert!(child.max().y <= parent.max().y + 1e-6);
        }
    }

    #[test]
    fn test_meters_to_tile_matches_tile_bounds() {
        let m = lat_lon_to_meters(42.6525, -73.757222);
        let (x, y) = meters_to_tile(m, 12);
        let bounds = tile_bounds(x, y, 12);
        assert!(m.x >= bounds.min().x && m.x <= bounds.max().x);
        assert!(m.y >= bounds.min().y && m.y <= bounds.max().y);
    }

    #[test]
    fn test_meters_to_tile_clamps() {
        let corner = Coord {
            x: -ORIGIN_SHIFT,
            y: -ORIGIN_SHIFT,
        };
        assert_eq!(meters_to_tile(corner, 3), (0, 0));
    }

    #[test]
    fn test_tms_to_xyz_row() {
        assert_eq!(tms_to_xyz_row(0, 0), 0);
        assert_eq!(tms_to_xyz_row(0, 1), 1);
        assert_eq!(tms_to_xyz_row(2, 2), 1);
    }

    #[test]
    fn test_tile_local_roundtrip() {
        let origin = Coord { x: 512.0, y: 768.0 };
        let global = Coord { x: 600.0, y: 800.0 };
        let local = to_tile_local(global, origin);
        assert_eq!(local, Coord { x: 88.0, y: 224.0 });
        assert_eq!(from_tile_local(local, origin), global);
    }
}
