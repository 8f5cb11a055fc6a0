use anyhow::Context;
use std::path::PathBuf;
use transit_tile_lib::{
    Config, FeatureSet, FeedLoader, SystemFont, TileWalker, TileWriter, backfill_blank_tiles,
};

/// Load feeds, then walk the tile pyramid and write every non-empty tile
pub fn generate(
    mut config: Config,
    output: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(output) = output {
        config.output.directory = output;
    }
    if let Some(cache_dir) = cache_dir {
        config.cache_directory = cache_dir;
    }

    let font = SystemFont::load(&config.render).context("Failed to load the label font")?;
    let features = load_features(&config)?;
    if features.is_empty() {
        tracing::warn!("No patterns or stops loaded; nothing to render");
        return Ok(());
    }
    if let Some((min_lat, min_lon, max_lat, max_lon)) = features.bounding_box_wgs84() {
        tracing::info!(
            "Features span lat {min_lat:.4}..{max_lat:.4}, lon {min_lon:.4}..{max_lon:.4}"
        );
    }

    let walker = TileWalker::new(&config);
    let mut writer = TileWriter::new(&config, &font)
        .with_context(|| {
            format!("Failed to prepare output directory {}", config.output.directory.display())
        })?;
    let stats = walker.walk(&features, &mut writer)?;

    tracing::info!(
        "Done: wrote {} tiles, skipped {} existing, visited {} ({} empty, {} out of bounds)",
        writer.written(),
        writer.skipped(),
        stats.visited,
        stats.pruned_empty,
        stats.pruned_bounds
    );
    Ok(())
}

/// Fetch or read every configured feed on a short-lived async runtime
fn load_features(config: &Config) -> anyhow::Result<FeatureSet> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let loader = FeedLoader::new(config)?;
    let features = runtime
        .block_on(loader.load_all(&config.feeds))
        .context("Failed to load feeds")?;
    Ok(features)
}

/// Fill gaps in the output directory with transparent tiles
pub fn backfill(mut config: Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(output) = output {
        config.output.directory = output;
    }
    let written = backfill_blank_tiles(&config)?;
    tracing::info!("Wrote {written} blank tiles to {}", config.output.directory.display());
    Ok(())
}
