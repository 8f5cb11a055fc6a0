//! Tile rasterization
//!
//! Every tile is drawn twice: once on a 256px canvas and once on a 512px
//! "retina" canvas. Both draws share the same tile-local geometry; the 2x canvas
//! applies a uniform scale transform so line widths, radii, label boxes and
//! glyph outlines are exactly twice their 1x counterparts.

use crate::color::Color;
use crate::config::RenderConfig;
use crate::labels::{LabelPlacer, PlacedLabel, TextMeasure};
use crate::projection::{self, TILE_SIZE};
use crate::walker::RenderRequest;
use geo::Coord;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

/// Scale factor of the high-resolution canvas
pub const RETINA_SCALE: f32 = 2.0;

/// Baseline offset below the label anchor, as a fraction of the font size
const LABEL_BASELINE_FACTOR: f64 = 0.4;

/// Rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to allocate a {0}x{0} canvas")]
    Canvas(u32),

    #[error("no usable font found for families {0:?}")]
    FontNotFound(Vec<String>),

    #[error("failed to read font {path}: {source}")]
    FontIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse font: {0}")]
    FontParse(String),

    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// A font that can both measure and outline text
pub trait GlyphSource: TextMeasure {
    /// Outline of `text` at `font_size`, starting at `x` on the given baseline,
    /// in y-down canvas coordinates. `None` when nothing would be drawn.
    fn text_path(&self, text: &str, font_size: f64, x: f64, baseline: f64) -> Option<Path>;
}

/// PNG bytes of both resolutions of a tile
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub standard: Vec<u8>,
    pub retina: Vec<u8>,
}

/// Line width for route patterns at `zoom`
pub fn route_line_width(zoom: u8) -> f64 {
    match zoom {
        16.. => 3.0,
        14.. => 2.0,
        _ => 1.0,
    }
}

/// Stop marker `(radius, outline width)` at `zoom`
pub fn stop_style(zoom: u8) -> (f64, f64) {
    if zoom >= 16 { (3.0, 1.5) } else { (2.0, 1.0) }
}

/// Paired 1x and 2x canvases of one tile
pub struct TileCanvas {
    standard: Pixmap,
    retina: Pixmap,
}

impl TileCanvas {
    /// Create a fully transparent tile
    pub fn new() -> Result<Self, RenderError> {
        let retina_size = TILE_SIZE * RETINA_SCALE as u32;
        Ok(Self {
            standard: Pixmap::new(TILE_SIZE, TILE_SIZE).ok_or(RenderError::Canvas(TILE_SIZE))?,
            retina: Pixmap::new(retina_size, retina_size).ok_or(RenderError::Canvas(retina_size))?,
        })
    }

    /// PNG bytes of a tile with nothing drawn on it
    pub fn blank() -> Result<EncodedTile, RenderError> {
        Self::new()?.encode()
    }

    #[inline]
    pub fn standard(&self) -> &Pixmap {
        &self.standard
    }

    #[inline]
    pub fn retina(&self) -> &Pixmap {
        &self.retina
    }

    fn layers(&mut self) -> [(&mut Pixmap, Transform); 2] {
        [
            (&mut self.standard, Transform::identity()),
            (&mut self.retina, Transform::from_scale(RETINA_SCALE, RETINA_SCALE)),
        ]
    }

    /// Stroke a polyline given in tile-local 1x pixels
    pub fn draw_polyline(&mut self, points: &[Coord<f64>], color: Color, width: f64) {
        let Some(path) = polyline_path(points) else {
            return;
        };
        let paint = solid_paint(color);
        let stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        for (pixmap, transform) in self.layers() {
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    /// Draw a filled and outlined circle
    pub fn draw_stop(
        &mut self,
        center: Coord<f64>,
        radius: f64,
        outline_width: f64,
        fill: Color,
        outline: Color,
    ) {
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32)
        else {
            return;
        };
        let fill_paint = solid_paint(fill);
        let outline_paint = solid_paint(outline);
        let stroke = Stroke {
            width: outline_width as f32,
            ..Stroke::default()
        };
        for (pixmap, transform) in self.layers() {
            pixmap.fill_path(&path, &fill_paint, FillRule::Winding, transform, None);
            pixmap.stroke_path(&path, &outline_paint, &stroke, transform, None);
        }
    }

    /// Draw a label box and its centered text
    pub fn draw_label<G: GlyphSource + ?Sized>(
        &mut self,
        label: &PlacedLabel<'_>,
        glyphs: &G,
        font_size: f64,
        background: Color,
        text_color: Color,
    ) {
        let bbox = &label.bbox;
        let rect = tiny_skia::Rect::from_xywh(
            bbox.x as f32,
            bbox.y as f32,
            bbox.width as f32,
            bbox.height as f32,
        );
        let text_width = glyphs.text_width(label.route_name, font_size);
        let text = glyphs.text_path(
            label.route_name,
            font_size,
            label.anchor.x - text_width / 2.0,
            label.anchor.y + font_size * LABEL_BASELINE_FACTOR,
        );

        let background_paint = solid_paint(background);
        let text_paint = solid_paint(text_color);
        for (pixmap, transform) in self.layers() {
            if let Some(rect) = rect {
                pixmap.fill_rect(rect, &background_paint, transform, None);
            }
            if let Some(text) = &text {
                pixmap.fill_path(text, &text_paint, FillRule::Winding, transform, None);
            }
        }
    }

    /// Encode both canvases as PNG
    pub fn encode(&self) -> Result<EncodedTile, RenderError> {
        let encode = |pixmap: &Pixmap| {
            pixmap.encode_png().map_err(|e| RenderError::Encode(e.to_string()))
        };
        Ok(EncodedTile {
            standard: encode(&self.standard)?,
            retina: encode(&self.retina)?,
        })
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn polyline_path(points: &[Coord<f64>]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.x as f32, first.y as f32);
    for p in rest {
        builder.line_to(p.x as f32, p.y as f32);
    }
    builder.finish()
}

/// Draws the features of a render request onto a fresh [`TileCanvas`]
pub struct TileRenderer<'a, G: GlyphSource + ?Sized> {
    render: &'a RenderConfig,
    glyphs: &'a G,
    placer: LabelPlacer<'a, G>,
}

impl<'a, G: GlyphSource + ?Sized> TileRenderer<'a, G> {
    pub fn new(render: &'a RenderConfig, glyphs: &'a G) -> Self {
        Self {
            render,
            glyphs,
            placer: LabelPlacer::new(glyphs, render),
        }
    }

    pub fn render(&self, request: &RenderRequest<'_>) -> Result<TileCanvas, RenderError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("render::tile");

        let zoom = request.tile.zoom;
        let origin = request.tile.pixel_origin();
        let route_color = self.render.route_color;
        let mut canvas = TileCanvas::new()?;

        let line_width = route_line_width(zoom);
        for pattern in request.patterns {
            let local: Vec<Coord<f64>> = pattern
                .pixels(zoom)
                .iter()
                .map(|&p| projection::to_tile_local(p, origin))
                .collect();
            canvas.draw_polyline(&local, route_color, line_width);
        }

        if zoom >= self.render.min_stop_zoom {
            let (radius, outline_width) = stop_style(zoom);
            for pixel in request.stops.iter().filter_map(|stop| stop.pixel(zoom)) {
                let center = projection::to_tile_local(pixel, origin);
                canvas.draw_stop(center, radius, outline_width, Color::WHITE, route_color);
            }
        }

        for label in self.placer.place(request.patterns, request.tile) {
            canvas.draw_label(
                &label,
                self.glyphs,
                self.render.font_size,
                route_color,
                self.render.text_color,
            );
        }

        Ok(canvas)
    }
}
