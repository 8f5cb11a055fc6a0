//! Generator configuration
//!
//! The configuration is read once from a JSON file (camelCase keys) and passed
//! by reference to every component. All fields have defaults so a partial file
//! is enough.

use crate::color::Color;
use crate::projection;
use geo::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Highest zoom level the generator accepts
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Feed identifiers to load, in order
    pub feeds: Vec<String>,
    /// Query API settings
    pub api: ApiConfig,
    /// Where rendered tiles are written
    pub output: OutputConfig,
    /// Directory holding cached feed responses
    pub cache_directory: PathBuf,
    /// Optional WGS84 extent outside of which no tiles are generated
    pub bounds: Option<Bounds>,
    /// Rendering and styling settings
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// GraphQL endpoint of the GTFS API
    pub gtfs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// Geographic extent in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// First zoom level that is written to disk
    pub min_zoom: u8,
    /// Last zoom level that is visited
    pub max_zoom: u8,
    /// First zoom level with route labels
    pub min_label_zoom: u8,
    /// First zoom level with stop markers
    pub min_stop_zoom: u8,
    /// Route line and label background color
    pub route_color: Color,
    /// Label text color
    pub text_color: Color,
    /// Label font size in pixels at 1x
    pub font_size: f64,
    /// Font families to try, in order, when no font file is given
    pub font_families: Vec<String>,
    /// Explicit font file, overriding `font_families`
    pub font_path: Option<PathBuf>,
    /// Margin in pixels around a tile within which stops are still drawn
    pub stop_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            api: ApiConfig::default(),
            output: OutputConfig::default(),
            cache_directory: PathBuf::from("cache"),
            bounds: None,
            render: RenderConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gtfs: "http://localhost:4000/api/manager/graphql".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("tiles"),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_zoom: 1,
            max_zoom: 14,
            min_label_zoom: 8,
            min_stop_zoom: 14,
            route_color: Color::NAVY,
            text_color: Color::WHITE,
            font_size: 9.0,
            font_families: vec![
                "Helvetica".to_string(),
                "Arial".to_string(),
                "DejaVu Sans".to_string(),
                "Liberation Sans".to_string(),
            ],
            font_path: None,
            stop_tolerance: 5.0,
        }
    }
}

impl Config {
    /// Read and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON config string
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the generator relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        if render.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(ConfigError::Invalid(format!(
                "maxZoom {} exceeds the supported maximum {MAX_SUPPORTED_ZOOM}",
                render.max_zoom
            )));
        }
        if render.min_zoom > render.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "minZoom {} is greater than maxZoom {}",
                render.min_zoom, render.max_zoom
            )));
        }
        if !(render.font_size.is_finite() && render.font_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fontSize must be positive, got {}",
                render.font_size
            )));
        }
        if !(render.stop_tolerance.is_finite() && render.stop_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stopTolerance must be non-negative, got {}",
                render.stop_tolerance
            )));
        }
        if let Some(bounds) = &self.bounds {
            bounds.validate()?;
        }
        Ok(())
    }
}

impl Bounds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.west >= self.east || self.south >= self.north {
            return Err(ConfigError::Invalid(format!(
                "bounds must satisfy west < east and south < north, got {self:?}"
            )));
        }
        Ok(())
    }

    /// The extent in Web Mercator meters
    pub fn to_meters(&self) -> Rect<f64> {
        Rect::new(
            projection::lat_lon_to_meters(self.south, self.west),
            projection::lat_lon_to_meters(self.north, self.east),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
        "feeds": ["Feed1", "Feed2"],
        "api": { "gtfs": "https://localhost:9966/api/manager/graphql" },
        "output": { "directory": "tiles" },
        "bounds": { "west": -73.8789, "south": 42.6218, "east": -73.662, "north": 42.7883 },
        "render": {
            "minZoom": 1,
            "maxZoom": 14,
            "minLabelZoom": 8,
            "minStopZoom": 14,
            "routeColor": "navy",
            "textColor": "white",
            "fontSize": 9
        }
    }"#;

    #[test]
    fn test_parse_template() {
        let config = Config::from_json(TEMPLATE).unwrap();
        assert_eq!(config.feeds, ["Feed1", "Feed2"]);
        assert_eq!(config.render.max_zoom, 14);
        assert_eq!(config.render.route_color, Color::NAVY);
        assert_eq!(config.render.stop_tolerance, 5.0);
        assert_eq!(config.cache_directory, PathBuf::from("cache"));
        let bounds = config.bounds.unwrap();
        assert!((bounds.west + 73.8789).abs() < 1e-12);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert!(config.feeds.is_empty());
        assert!(config.bounds.is_none());
        assert_eq!(config.render.min_label_zoom, 8);
    }

    #[test]
    fn test_rejects_inverted_zoom_range() {
        let err =
            Config::from_json(r#"{ "render": { "minZoom": 10, "maxZoom": 5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_excessive_zoom() {
        let err = Config::from_json(r#"{ "render": { "maxZoom": 30 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let json = r#"{ "bounds": { "west": 10, "south": 0, "east": 5, "north": 1 } }"#;
        assert!(matches!(Config::from_json(json), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_color() {
        let json = r#"{ "render": { "routeColor": "sparkly" } }"#;
        assert!(matches!(Config::from_json(json), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_bounds_to_meters_is_ordered() {
        let bounds = Bounds {
            west: -73.8789,
            south: 42.6218,
            east: -73.662,
            north: 42.7883,
        };
        let rect = bounds.to_meters();
        assert!(rect.min().x < rect.max().x);
        assert!(rect.min().y < rect.max().y);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/transit-tiler.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
