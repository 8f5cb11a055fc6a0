//! Font loading and glyph outlining
//!
//! A [`SystemFont`] owns the bytes of a single font face, found either at an
//! explicit path or by querying the system font database. Text is laid out left
//! to right using horizontal advances only; no shaping or kerning is applied.

use crate::config::RenderConfig;
use crate::labels::TextMeasure;
use crate::render::{GlyphSource, RenderError};
use fontdb::{Database, Family, Query};
use std::path::Path;
use tiny_skia::PathBuilder;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// An owned font face
pub struct SystemFont {
    data: Vec<u8>,
    index: u32,
}

impl std::fmt::Debug for SystemFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemFont")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl SystemFont {
    /// Load the font named by the render settings: `font_path` if set,
    /// otherwise the first installed family of `font_families`
    pub fn load(render: &RenderConfig) -> Result<Self, RenderError> {
        match &render.font_path {
            Some(path) => Self::from_file(path),
            None => Self::from_families(&render.font_families),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| RenderError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Self::from_data(data, 0)?;
        tracing::debug!("Loaded font from {}", path.display());
        Ok(font)
    }

    /// Query installed fonts, falling back to the generic sans-serif family
    pub fn from_families(families: &[String]) -> Result<Self, RenderError> {
        let mut db = Database::new();
        db.load_system_fonts();

        let mut query_families: Vec<Family<'_>> =
            families.iter().map(|f| Family::Name(f)).collect();
        query_families.push(Family::SansSerif);
        let query = Query {
            families: &query_families,
            ..Query::default()
        };

        let id = db
            .query(&query)
            .ok_or_else(|| RenderError::FontNotFound(families.to_vec()))?;
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| RenderError::FontNotFound(families.to_vec()))?;

        if let Some(face) = db.face(id) {
            tracing::debug!(
                "Using system font '{}' from {} faces",
                face.post_script_name,
                db.len()
            );
        }
        Self::from_data(data, index)
    }

    /// Wrap raw font bytes, checking that they parse
    pub fn from_data(data: Vec<u8>, index: u32) -> Result<Self, RenderError> {
        Face::parse(&data, index).map_err(|e| RenderError::FontParse(e.to_string()))?;
        Ok(Self { data, index })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }
}

/// Glyphs of `text` with their pen position in font units
fn layout<'f>(face: &'f Face<'_>, text: &'f str) -> impl Iterator<Item = (GlyphId, f32)> + 'f {
    let mut pen = 0.0;
    text.chars().map(move |c| {
        let glyph = face.glyph_index(c).unwrap_or(GlyphId(0));
        let x = pen;
        pen += face.glyph_hor_advance(glyph).unwrap_or(0) as f32;
        (glyph, x)
    })
}

impl TextMeasure for SystemFont {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let units: f32 = layout(&face, text)
            .map(|(glyph, _)| face.glyph_hor_advance(glyph).unwrap_or(0) as f32)
            .sum();
        units as f64 * font_size / face.units_per_em() as f64
    }
}

impl GlyphSource for SystemFont {
    fn text_path(
        &self,
        text: &str,
        font_size: f64,
        x: f64,
        baseline: f64,
    ) -> Option<tiny_skia::Path> {
        let face = self.face()?;
        let scale = (font_size / face.units_per_em() as f64) as f32;
        let mut builder = PathBuilder::new();
        for (glyph, pen) in layout(&face, text) {
            let mut sink = PathSink {
                builder: &mut builder,
                scale,
                offset_x: x as f32 + pen * scale,
                offset_y: baseline as f32,
            };
            face.outline_glyph(glyph, &mut sink);
        }
        builder.finish()
    }
}

/// Adapts font-unit outlines (y up) into a canvas path (y down)
struct PathSink<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl PathSink<'_> {
    #[inline]
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.offset_x + x * self.scale, self.offset_y - y * self.scale)
    }
}

impl OutlineBuilder for PathSink<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file() {
        let err = SystemFont::from_file("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, RenderError::FontIo { .. }));
    }

    #[test]
    fn test_garbage_font_data() {
        let err = SystemFont::from_data(b"definitely not a font".to_vec(), 0).unwrap_err();
        assert!(matches!(err, RenderError::FontParse(_)));
    }

    #[test]
    fn test_system_font_measures_proportionally() {
        // Font availability depends on the host
        let Ok(font) = SystemFont::from_families(&[]) else {
            return;
        };
        let narrow = font.text_width("1", 9.0);
        let wide = font.text_width("11", 9.0);
        assert!(narrow > 0.0);
        assert!((wide - 2.0 * narrow).abs() < 1e-6);
        assert!((font.text_width("11", 18.0) - 2.0 * wide).abs() < 1e-6);
        assert!(font.text_path("1", 9.0, 0.0, 9.0).is_some());
    }
}
