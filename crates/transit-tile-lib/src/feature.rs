//! Projected transit features
//!
//! Patterns and stops are projected to Web Mercator meters once and then to
//! global pixels for every zoom level up to the configured maximum. The caches
//! are immutable after construction and shared by reference during the walk.

use crate::projection;
use geo::{Coord, Rect};

/// One directional path variant of a route
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Feed identifier of the pattern, used for logging only
    pattern_id: String,
    /// Short public name of the owning route (e.g. "1", "SBX"), used for labels
    route_short_name: Option<String>,
    /// Geometry in Web Mercator meters
    meters: Vec<Coord<f64>>,
    /// Global pixel coordinates, indexed by zoom level
    pixels_by_zoom: Vec<Vec<Coord<f64>>>,
}

impl Pattern {
    /// Build a pattern from WGS84 `(lon, lat)` coordinates
    pub fn from_lon_lat(
        pattern_id: impl Into<String>,
        route_short_name: Option<String>,
        lon_lat: &[(f64, f64)],
        max_zoom: u8,
    ) -> Self {
        let meters = lon_lat
            .iter()
            .map(|&(lon, lat)| projection::lat_lon_to_meters(lat, lon))
            .collect();
        Self::from_meters(pattern_id, route_short_name, meters, max_zoom)
    }

    /// Build a pattern from Web Mercator coordinates, precomputing pixel
    /// polylines for zoom levels `0..=max_zoom`
    pub fn from_meters(
        pattern_id: impl Into<String>,
        route_short_name: Option<String>,
        meters: Vec<Coord<f64>>,
        max_zoom: u8,
    ) -> Self {
        let pixels_by_zoom = (0..=max_zoom)
            .map(|zoom| {
                meters
                    .iter()
                    .map(|&m| projection::meters_to_pixels(m, zoom))
                    .collect()
            })
            .collect();

        Self {
            pattern_id: pattern_id.into(),
            route_short_name: route_short_name.filter(|name| !name.is_empty()),
            meters,
            pixels_by_zoom,
        }
    }

    #[inline]
    pub fn pattern_id(&self) -> &str {
        &self.pattern_id
    }

    /// Route short name, if the route has a non-empty one
    #[inline]
    pub fn route_short_name(&self) -> Option<&str> {
        self.route_short_name.as_deref()
    }

    #[inline]
    pub fn meters(&self) -> &[Coord<f64>] {
        &self.meters
    }

    /// Pixel polyline at `zoom`, or an empty slice past the cached range
    #[inline]
    pub fn pixels(&self, zoom: u8) -> &[Coord<f64>] {
        self.pixels_by_zoom
            .get(zoom as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest zoom level with a cached pixel polyline
    #[inline]
    pub fn max_zoom(&self) -> u8 {
        self.pixels_by_zoom.len().saturating_sub(1) as u8
    }
}

/// A stop location
#[derive(Debug, Clone)]
pub struct Stop {
    /// Location in Web Mercator meters
    meters: Coord<f64>,
    /// Global pixel coordinate, indexed by zoom level
    pixels_by_zoom: Vec<Coord<f64>>,
}

impl Stop {
    pub fn from_lat_lon(lat: f64, lon: f64, max_zoom: u8) -> Self {
        Self::from_meters(projection::lat_lon_to_meters(lat, lon), max_zoom)
    }

    pub fn from_meters(meters: Coord<f64>, max_zoom: u8) -> Self {
        let pixels_by_zoom = (0..=max_zoom)
            .map(|zoom| projection::meters_to_pixels(meters, zoom))
            .collect();
        Self {
            meters,
            pixels_by_zoom,
        }
    }

    #[inline]
    pub fn meters(&self) -> Coord<f64> {
        self.meters
    }

    /// Pixel position at `zoom`; `None` past the cached range
    #[inline]
    pub fn pixel(&self, zoom: u8) -> Option<Coord<f64>> {
        self.pixels_by_zoom.get(zoom as usize).copied()
    }
}

/// Every pattern and stop of one or more feeds, in feed order
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub patterns: Vec<Pattern>,
    pub stops: Vec<Stop>,
}

impl FeatureSet {
    pub fn new(patterns: Vec<Pattern>, stops: Vec<Stop>) -> Self {
        Self { patterns, stops }
    }

    /// Append another set, moving its features
    pub fn extend(&mut self, other: FeatureSet) {
        self.patterns.extend(other.patterns);
        self.stops.extend(other.stops);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.stops.is_empty()
    }

    /// Extent of every pattern vertex and stop in Web Mercator meters
    pub fn bounding_box_meters(&self) -> Option<Rect<f64>> {
        self.patterns
            .iter()
            .flat_map(|pattern| pattern.meters().iter().copied())
            .chain(self.stops.iter().map(Stop::meters))
            .fold(None, |bbox: Option<Rect<f64>>, c| {
                Some(match bbox {
                    None => Rect::new(c, c),
                    Some(r) => Rect::new(
                        Coord {
                            x: r.min().x.min(c.x),
                            y: r.min().y.min(c.y),
                        },
                        Coord {
                            x: r.max().x.max(c.x),
                            y: r.max().y.max(c.y),
                        },
                    ),
                })
            })
    }

    /// Combined extent in WGS84 as `(min_lat, min_lon, max_lat, max_lon)`,
    /// or `None` when the set is empty
    pub fn bounding_box_wgs84(&self) -> Option<(f64, f64, f64, f64)> {
        let bbox = self.bounding_box_meters()?;
        let (min_lat, min_lon) = projection::meters_to_lat_lon(bbox.min());
        let (max_lat, max_lon) = projection::meters_to_lat_lon(bbox.max());
        Some((min_lat, min_lon, max_lat, max_lon))
    }
}

impl FromIterator<FeatureSet> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureSet>>(iter: I) -> Self {
        let mut all = FeatureSet::default();
        for set in iter {
            all.extend(set);
        }
        all
    }
}
