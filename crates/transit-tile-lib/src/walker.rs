//! Quadtree tile walk
//!
//! The walk starts at the whole-world tile (0, 0, 0) and descends depth-first.
//! Each tile filters the features it received from its parent, so the visible
//! set can only shrink with zoom. A tile with nothing visible, or one outside the
//! configured bounds, prunes its whole subtree: child tiles are contained in their
//! parent, so they cannot see anything the parent did not.

use crate::config::{Config, RenderConfig};
use crate::feature::{FeatureSet, Pattern, Stop};
use crate::{Result, geometry, projection};
use geo::{Coord, Rect};

/// Address of a tile in the TMS scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileAddress {
    /// The single tile covering the whole world
    pub const ROOT: TileAddress = TileAddress { x: 0, y: 0, zoom: 0 };

    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        debug_assert!(x < projection::tiles_per_axis(zoom) && y < projection::tiles_per_axis(zoom));
        Self { x, y, zoom }
    }

    /// The four children at `zoom + 1`, in walk order
    pub fn children(&self) -> [TileAddress; 4] {
        let (x, y, zoom) = (self.x * 2, self.y * 2, self.zoom + 1);
        [
            TileAddress { x, y, zoom },
            TileAddress { x, y: y + 1, zoom },
            TileAddress { x: x + 1, y, zoom },
            TileAddress { x: x + 1, y: y + 1, zoom },
        ]
    }

    /// Parent tile, or `None` for the root
    pub fn parent(&self) -> Option<TileAddress> {
        (self.zoom > 0).then(|| TileAddress {
            x: self.x / 2,
            y: self.y / 2,
            zoom: self.zoom - 1,
        })
    }

    /// Whether `self` is `other` or lies inside it
    pub fn is_within(&self, other: &TileAddress) -> bool {
        if self.zoom < other.zoom {
            return false;
        }
        let shift = self.zoom - other.zoom;
        self.x >> shift == other.x && self.y >> shift == other.y
    }

    /// Global pixel rectangle of the tile at its zoom
    #[inline]
    pub fn pixel_rect(&self) -> Rect<f64> {
        projection::tile_pixel_rect(self.x, self.y)
    }

    /// South-west corner of the tile in global pixels
    #[inline]
    pub fn pixel_origin(&self) -> Coord<f64> {
        self.pixel_rect().min()
    }

    /// Tile extent in Web Mercator meters
    #[inline]
    pub fn bounds_meters(&self) -> Rect<f64> {
        projection::tile_bounds(self.x, self.y, self.zoom)
    }

    /// Row index in the XYZ scheme used for file names
    #[inline]
    pub fn xyz_row(&self) -> u32 {
        projection::tms_to_xyz_row(self.y, self.zoom)
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A tile to render along with the features visible in it
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub tile: TileAddress,
    pub patterns: &'a [&'a Pattern],
    pub stops: &'a [&'a Stop],
}

/// Consumer of render requests emitted by the walk
pub trait TileSink {
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<()>;
}

impl<F> TileSink for F
where
    F: FnMut(&RenderRequest<'_>) -> Result<()>,
{
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<()> {
        self(request)
    }
}

/// Counters describing one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Tiles the walk entered
    pub visited: u64,
    /// Tiles rejected by the configured bounds
    pub pruned_bounds: u64,
    /// Tiles with no visible pattern or stop
    pub pruned_empty: u64,
    /// Render requests handed to the sink
    pub emitted: u64,
}

/// Recursive walker over the tile pyramid
#[derive(Debug, Clone)]
pub struct TileWalker<'c> {
    render: &'c RenderConfig,
    /// Configured bounds in Web Mercator meters
    bounds: Option<Rect<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'c> TileWalker<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self {
            render: &config.render,
            bounds: config.bounds.as_ref().map(|b| b.to_meters()),
        }
    }

    /// Walk the whole pyramid starting at the root tile
    pub fn walk<S: TileSink + ?Sized>(
        &self,
        features: &FeatureSet,
        sink: &mut S,
    ) -> Result<WalkStats> {
        #[cfg(feature = "profiling")]
        profiling::scope!("walker::walk");

        let patterns: Vec<&Pattern> = features.patterns.iter().collect();
        let stops: Vec<&Stop> = features.stops.iter().collect();

        tracing::info!(
            "Walking tiles for zoom {}..={} with {} patterns and {} stops",
            self.render.min_zoom,
            self.render.max_zoom,
            patterns.len(),
            stops.len()
        );

        let stats = self.walk_from(TileAddress::ROOT, &patterns, &stops, sink)?;

        tracing::info!(
            "Walk finished: visited {} tiles, emitted {}, pruned {} empty and {} out of bounds",
            stats.visited,
            stats.emitted,
            stats.pruned_empty,
            stats.pruned_bounds
        );
        Ok(stats)
    }

    /// Walk the subtree rooted at `tile` with the given candidate features
    pub fn walk_from<S: TileSink + ?Sized>(
        &self,
        tile: TileAddress,
        patterns: &[&Pattern],
        stops: &[&Stop],
        sink: &mut S,
    ) -> Result<WalkStats> {
        let mut stats = WalkStats::default();
        self.process_tile(tile, patterns, stops, sink, &mut stats)?;
        Ok(stats)
    }

    fn process_tile<S: TileSink + ?Sized>(
        &self,
        tile: TileAddress,
        patterns: &[&Pattern],
        stops: &[&Stop],
        sink: &mut S,
        stats: &mut WalkStats,
    ) -> Result<()> {
        stats.visited += 1;

        if self.is_outside_bounds(&tile) {
            stats.pruned_bounds += 1;
            return Ok(());
        }

        let rect = tile.pixel_rect();
        let visible_stops = self.filter_stops(&tile, stops);
        let visible_patterns = filter_patterns(&tile, &rect, patterns);

        if visible_patterns.is_empty() && visible_stops.is_empty() {
            stats.pruned_empty += 1;
            return Ok(());
        }

        if tile.zoom >= self.render.min_zoom {
            tracing::trace!(
                "Tile {tile}: {} patterns, {} stops",
                visible_patterns.len(),
                visible_stops.len()
            );
            sink.render(&RenderRequest {
                tile,
                patterns: &visible_patterns,
                stops: &visible_stops,
            })?;
            stats.emitted += 1;
        }

        if tile.zoom < self.render.max_zoom {
            for child in tile.children() {
                self.process_tile(child, &visible_patterns, &visible_stops, sink, stats)?;
            }
        }

        Ok(())
    }

    /// Cheap reject against the configured bounds, before any feature filtering
    fn is_outside_bounds(&self, tile: &TileAddress) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        let tile_bounds = tile.bounds_meters();
        tile_bounds.max().y < bounds.min().y // south of bounds
            || tile_bounds.min().y > bounds.max().y // north of bounds
            || tile_bounds.min().x > bounds.max().x // east of bounds
            || tile_bounds.max().x < bounds.min().x // west of bounds
    }

    fn filter_stops<'f>(&self, tile: &TileAddress, stops: &[&'f Stop]) -> Vec<&'f Stop> {
        let origin = tile.pixel_origin();
        let tol = self.render.stop_tolerance;
        let range = -tol..=projection::TILE_SIZE_F + tol;
        stops
            .iter()
            .copied()
            .filter(|stop| {
                stop.pixel(tile.zoom).is_some_and(|pixel| {
                    let local = projection::to_tile_local(pixel, origin);
                    range.contains(&local.x) && range.contains(&local.y)
                })
            })
            .collect()
    }
}

fn filter_patterns<'f>(
    tile: &TileAddress,
    rect: &Rect<f64>,
    patterns: &[&'f Pattern],
) -> Vec<&'f Pattern> {
    patterns
        .iter()
        .copied()
        .filter(|pattern| {
            pattern
                .pixels(tile.zoom)
                .windows(2)
                .any(|pair| geometry::intersects(rect, pair[0], pair[1]))
        })
        .collect()
}
