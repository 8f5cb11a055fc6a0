//! PNG tile output
//!
//! Tiles are written flat into the output directory as `{z}_{x}_{y}.png` and
//! `{z}_{x}_{y}@2x.png`, with `y` in the XYZ row convention. A tile whose 1x
//! file already exists is left untouched, so an interrupted run can be resumed.

use crate::config::Config;
use crate::render::{EncodedTile, GlyphSource, TileCanvas, TileRenderer};
use crate::walker::{RenderRequest, TileAddress, TileSink};
use crate::{ConfigError, Result, TileError, projection};
use std::path::{Path, PathBuf};

/// Log a progress line every this many written tiles
const PROGRESS_INTERVAL: u64 = 100;

/// File locations of both resolutions of a tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePaths {
    pub standard: PathBuf,
    pub retina: PathBuf,
}

impl TilePaths {
    pub fn new(directory: &Path, tile: TileAddress) -> Self {
        let stem = format!("{}_{}_{}", tile.zoom, tile.x, tile.xyz_row());
        Self {
            standard: directory.join(format!("{stem}.png")),
            retina: directory.join(format!("{stem}@2x.png")),
        }
    }

    /// Write both files, the 2x one first so that an existing 1x file
    /// always implies a complete tile
    fn write(&self, tile: &EncodedTile) -> Result<()> {
        write_file(&self.retina, &tile.retina)?;
        write_file(&self.standard, &tile.standard)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| TileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Tile sink rendering every request to PNG files
pub struct TileWriter<'a, G: GlyphSource + ?Sized> {
    directory: PathBuf,
    renderer: TileRenderer<'a, G>,
    written: u64,
    skipped: u64,
}

impl<'a, G: GlyphSource + ?Sized> TileWriter<'a, G> {
    /// Create a writer for `config.output.directory`, creating it if needed
    pub fn new(config: &'a Config, glyphs: &'a G) -> Result<Self> {
        let directory = config.output.directory.clone();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            renderer: TileRenderer::new(&config.render, glyphs),
            written: 0,
            skipped: 0,
        })
    }

    /// Number of tiles written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Number of tiles skipped because they already existed
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<G: GlyphSource + ?Sized> TileSink for TileWriter<'_, G> {
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<()> {
        let paths = TilePaths::new(&self.directory, request.tile);
        if paths.standard.exists() {
            self.skipped += 1;
            return Ok(());
        }

        tracing::debug!(
            "Rendering tile {} ({} patterns, {} stops)",
            request.tile,
            request.patterns.len(),
            request.stops.len()
        );
        let encoded = self.renderer.render(request)?.encode()?;
        paths.write(&encoded)?;

        if self.written % PROGRESS_INTERVAL == 0 {
            tracing::info!("Wrote {} tiles", self.written);
        }
        self.written += 1;
        Ok(())
    }
}

/// Fill every missing tile inside the configured bounds with a transparent tile
///
/// Returns the number of tiles written. Requires `bounds` to be configured.
pub fn backfill_blank_tiles(config: &Config) -> Result<u64> {
    let bounds = config
        .bounds
        .as_ref()
        .ok_or_else(|| ConfigError::Invalid("backfilling blank tiles requires bounds".to_string()))?
        .to_meters();
    let directory = &config.output.directory;
    std::fs::create_dir_all(directory)?;

    let blank = TileCanvas::blank()?;
    let mut written = 0;

    for zoom in config.render.min_zoom..=config.render.max_zoom {
        let (min_x, min_y) = projection::meters_to_tile(bounds.min(), zoom);
        let (max_x, max_y) = projection::meters_to_tile(bounds.max(), zoom);
        let total = u64::from(max_x - min_x + 1) * u64::from(max_y - min_y + 1);
        tracing::info!("Examining {total} tiles for zoom level {zoom}");

        for x in min_x..=max_x {
            for y in min_y..=max_y {
                let paths = TilePaths::new(directory, TileAddress::new(x, y, zoom));
                if paths.standard.exists() {
                    continue;
                }
                tracing::debug!("Missing {}", paths.standard.display());
                paths.write(&blank)?;
                written += 1;
            }
        }
    }

    tracing::info!("Backfilled {written} blank tiles");
    Ok(written)
}
