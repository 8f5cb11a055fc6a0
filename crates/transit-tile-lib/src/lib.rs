//! Transit Tile Library - Raster Tile Pyramids for Transit Route Maps
//!
//! This library turns transit route patterns and stops into a pyramid of 256px
//! (and 512px "retina") PNG tiles. The core is a recursive quadtree walk over
//! Web Mercator tiles that prunes empty and out-of-bounds subtrees, plus a
//! greedy per-tile label placer.
//!
//! # Architecture
//!
//! - **[`geometry`]**: Segment/rectangle, closest-point and label-box primitives
//! - **[`TileWalker`]**: Depth-first quadtree walk emitting [`RenderRequest`]s to a [`TileSink`]
//! - **[`LabelPlacer`]**: Non-overlapping route-name placement within a tile
//! - **[`FeedLoader`]**: Sequential GraphQL/JSON-cache feed loading into a [`FeatureSet`]
//! - **[`TileRenderer`]** / **[`TileWriter`]**: 1x/2x rasterization and idempotent PNG output
//!
//! # Performance Characteristics
//!
//! - **Preprocessing**: O(V × Z) per feed for V vertices and Z zoom levels, parallel per feature
//! - **Walk**: proportional to the visible feature footprint times the number of zoom levels
//! - **Labels**: O(P × A × L) per tile for P patterns, A ≤ 10 attempts and L placed labels

mod color;
mod config;
mod feature;
mod feed;
mod font;
pub mod geometry;
mod labels;
mod output;
pub mod projection;
mod render;
mod walker;

#[cfg(test)]
pub(crate) mod test_support;

// Public API exports
pub use color::Color;
pub use config::{
    ApiConfig, Bounds, Config, ConfigError, MAX_SUPPORTED_ZOOM, OutputConfig, RenderConfig,
};
pub use feature::{FeatureSet, Pattern, Stop};
pub use feed::{
    Degrees, FeedError, FeedLoader, FeedRecord, LineStringRecord, PatternRecord, RouteRecord,
    StopRecord, process_feed,
};
pub use font::SystemFont;
pub use labels::{LabelPlacer, PlacedLabel, TextMeasure, next_label_offset};
pub use output::{TilePaths, TileWriter, backfill_blank_tiles};
pub use render::{EncodedTile, GlyphSource, RenderError, TileCanvas, TileRenderer};
pub use walker::{RenderRequest, TileAddress, TileSink, TileWalker, WalkStats};

/// Error types for tile generation
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let config = Config::default();
        let _walker = TileWalker::new(&config);
        let _: fn() -> FeatureSet = FeatureSet::default;
        let _: fn(usize, f64) -> f64 = next_label_offset;
    }

    #[test]
    fn test_errors_convert_to_tile_error() {
        let err: TileError = ConfigError::Invalid("minZoom".to_string()).into();
        assert!(err.to_string().contains("minZoom"));
        let err: TileError = RenderError::Canvas(256).into();
        assert!(matches!(err, TileError::Render(_)));
    }
}
