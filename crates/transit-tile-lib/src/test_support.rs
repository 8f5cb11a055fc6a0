//! Shared fixtures for unit tests

use crate::feature::{Pattern, Stop};
use crate::labels::TextMeasure;
use crate::projection;
use crate::render::GlyphSource;
use crate::walker::{RenderRequest, TileAddress};
use geo::Coord;

/// Zoom depth of the pixel caches built by the fixtures
pub const FIXTURE_MAX_ZOOM: u8 = 20;

/// Pattern whose polyline passes through the given tile-local points of `tile`
pub fn pattern_through(
    tile: &TileAddress,
    id: &str,
    name: Option<&str>,
    local: &[(f64, f64)],
) -> Pattern {
    let meters = local
        .iter()
        .map(|&(x, y)| local_to_meters(tile, x, y))
        .collect();
    Pattern::from_meters(id, name.map(str::to_string), meters, FIXTURE_MAX_ZOOM)
}

/// Stop at a tile-local point of `tile`
pub fn stop_at(tile: &TileAddress, (x, y): (f64, f64)) -> Stop {
    Stop::from_meters(local_to_meters(tile, x, y), FIXTURE_MAX_ZOOM)
}

fn local_to_meters(tile: &TileAddress, x: f64, y: f64) -> Coord<f64> {
    let global = projection::from_tile_local(Coord { x, y }, tile.pixel_origin());
    projection::pixels_to_meters(global, tile.zoom)
}

/// Pins a closure to the signature expected by [`crate::TileSink`]
pub fn sink_fn<F>(f: F) -> F
where
    F: FnMut(&RenderRequest<'_>) -> crate::Result<()>,
{
    f
}

/// Font stand-in drawing every character as a solid block
pub struct BlockGlyphs;

impl BlockGlyphs {
    const ADVANCE_EM: f64 = 0.6;
}

impl TextMeasure for BlockGlyphs {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * Self::ADVANCE_EM
    }
}

impl GlyphSource for BlockGlyphs {
    fn text_path(
        &self,
        text: &str,
        font_size: f64,
        x: f64,
        baseline: f64,
    ) -> Option<tiny_skia::Path> {
        let advance = font_size * Self::ADVANCE_EM;
        let mut builder = tiny_skia::PathBuilder::new();
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = (x + i as f64 * advance) as f32;
            let rect = tiny_skia::Rect::from_xywh(
                left,
                (baseline - font_size * 0.7) as f32,
                (advance * 0.8) as f32,
                (font_size * 0.7) as f32,
            )?;
            builder.push_rect(rect);
        }
        builder.finish()
    }
}
