//! Route label placement within a single tile
//!
//! Placement is greedy: patterns are visited in order, each distinct route name
//! gets at most one label, and a candidate box is accepted only if it stays
//! inside the tile and does not overlap a label placed before it. Work is
//! bounded by [`MAX_LABEL_ATTEMPTS`] per route.

use crate::config::RenderConfig;
use crate::feature::Pattern;
use crate::geometry::{self, LabelBox};
use crate::projection::{self, TILE_SIZE_F};
use crate::walker::TileAddress;
use geo::Coord;
use std::collections::HashSet;

/// Candidate positions tried per route before giving up
pub const MAX_LABEL_ATTEMPTS: usize = 10;

/// Arc-length step between successive candidate positions, in pixels
pub const LABEL_OFFSET_STEP: f64 = 25.0;

/// Padding added to the measured text width and the font size
const LABEL_PADDING: f64 = 2.0;

/// Text width measurement at a given font size
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// A label accepted for drawing, in tile-local 1x pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel<'a> {
    pub route_name: &'a str,
    pub anchor: Coord<f64>,
    pub bbox: LabelBox,
}

/// Offset to use after `attempt` failed at `offset`
///
/// Alternates sides of the closest point with growing distance:
/// `+25, -25, +50, -50, ...`
pub fn next_label_offset(attempt: usize, offset: f64) -> f64 {
    if attempt % 2 == 0 {
        offset.abs() + LABEL_OFFSET_STEP
    } else {
        -offset
    }
}

/// Places route labels for one tile at a time
pub struct LabelPlacer<'m, M: TextMeasure + ?Sized> {
    measurer: &'m M,
    font_size: f64,
    min_label_zoom: u8,
}

impl<'m, M: TextMeasure + ?Sized> LabelPlacer<'m, M> {
    pub fn new(measurer: &'m M, render: &RenderConfig) -> Self {
        Self {
            measurer,
            font_size: render.font_size,
            min_label_zoom: render.min_label_zoom,
        }
    }

    /// Place labels for the patterns visible in `tile`
    pub fn place<'p>(&self, patterns: &[&'p Pattern], tile: TileAddress) -> Vec<PlacedLabel<'p>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("labels::place");

        if tile.zoom < self.min_label_zoom {
            return Vec::new();
        }

        let origin = tile.pixel_origin();
        let center = Coord {
            x: TILE_SIZE_F / 2.0,
            y: TILE_SIZE_F / 2.0,
        };
        let mut seen_names = HashSet::new();
        let mut placed: Vec<PlacedLabel<'p>> = Vec::new();

        for &pattern in patterns {
            let Some(name) = pattern.route_short_name() else {
                continue;
            };
            if seen_names.contains(name) {
                continue;
            }

            let local: Vec<Coord<f64>> = pattern
                .pixels(tile.zoom)
                .iter()
                .map(|&p| projection::to_tile_local(p, origin))
                .collect();
            let Some(closest) = geometry::closest_point_along_polyline(&local, center) else {
                continue;
            };

            let width = self.measurer.text_width(name, self.font_size) + LABEL_PADDING;
            let height = self.font_size + LABEL_PADDING;

            let label = self.try_positions(
                name,
                &local,
                closest.point,
                closest.traversed,
                (width, height),
                &placed,
            );
            match label {
                Some(label) => {
                    seen_names.insert(name);
                    placed.push(label);
                }
                None => tracing::trace!("No room for label '{name}' in tile {tile}"),
            }
        }

        placed
    }

    fn try_positions<'p>(
        &self,
        name: &'p str,
        polyline: &[Coord<f64>],
        start: Coord<f64>,
        traversed: f64,
        (width, height): (f64, f64),
        placed: &[PlacedLabel<'p>],
    ) -> Option<PlacedLabel<'p>> {
        let mut anchor = start;
        let mut offset = 0.0;

        for attempt in 0..MAX_LABEL_ATTEMPTS {
            let bbox = LabelBox::centered(anchor, width, height);
            if !bbox.fits_within(TILE_SIZE_F) {
                return None;
            }
            if !placed.iter().any(|other| geometry::bbox_overlap(&bbox, &other.bbox)) {
                return Some(PlacedLabel {
                    route_name: name,
                    anchor,
                    bbox,
                });
            }
            offset = next_label_offset(attempt, offset);
            anchor = geometry::point_at_distance(polyline, traversed + offset);
        }

        None
    }
}
