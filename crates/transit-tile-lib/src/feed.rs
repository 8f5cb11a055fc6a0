//! Transit feed loading
//!
//! Feeds are fetched from a GTFS GraphQL API, or read from a per-feed JSON
//! cache written after the first successful fetch. Feeds are loaded one at a
//! time in configuration order; projecting a loaded feed's features runs in
//! parallel.

use crate::config::Config;
use crate::feature::{FeatureSet, Pattern, Stop};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// GraphQL query selecting the routes, patterns and stops of one feed
const ROUTE_QUERY: &str = r#"
query routeQuery ($feedId: String) {
  feeds (feed_id: [$feedId]) {
    feed_id,
    routes {
      route_id
      route_short_name
      route_long_name
      patterns {
        pattern_id
        geometry
      }
    }
    stops {
      stop_lat
      stop_lon
    }
  }
}
"#;

/// Feed loading errors
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read feed cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid response for feed {feed_id}: {source}")]
    Json {
        feed_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response for feed {0} contains no feed")]
    MissingFeed(String),
}

/// Query response; the feed list sits either at the top level or under `data`
#[derive(Debug, Deserialize)]
struct FeedResponse {
    feeds: Option<Vec<FeedRecord>>,
    data: Option<FeedData>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    feeds: Option<Vec<FeedRecord>>,
}

/// One feed as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecord {
    pub feed_id: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
    #[serde(default)]
    pub stops: Vec<StopRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    #[serde(default)]
    pub patterns: Vec<PatternRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternRecord {
    pub pattern_id: Option<String>,
    pub geometry: Option<LineStringRecord>,
}

/// GeoJSON LineString; positions are `[lon, lat, ...]`
#[derive(Debug, Clone, Deserialize)]
pub struct LineStringRecord {
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopRecord {
    pub stop_lat: Option<Degrees>,
    pub stop_lon: Option<Degrees>,
}

/// A coordinate the API may send either as a number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    pub fn value(&self) -> Option<f64> {
        let value = match self {
            Degrees::Number(v) => Some(*v),
            Degrees::Text(s) => s.trim().parse().ok(),
        };
        value.filter(|v: &f64| v.is_finite())
    }
}

impl FeedRecord {
    /// Parse a raw query response and return its first feed
    pub fn from_response(bytes: &[u8], feed_id: &str) -> Result<Self, FeedError> {
        let response: FeedResponse =
            serde_json::from_slice(bytes).map_err(|source| FeedError::Json {
                feed_id: feed_id.to_string(),
                source,
            })?;

        if let Some(errors) = response.errors.as_ref().filter(|e| !e.is_empty()) {
            tracing::warn!(
                "Query for feed {feed_id} returned {} errors: {:?}",
                errors.len(),
                errors
            );
        }

        response
            .feeds
            .or_else(|| response.data.and_then(|d| d.feeds))
            .and_then(|feeds| feeds.into_iter().next())
            .ok_or_else(|| FeedError::MissingFeed(feed_id.to_string()))
    }
}

impl PatternRecord {
    fn to_pattern(&self, route: &RouteRecord, max_zoom: u8) -> Option<Pattern> {
        let coordinates = &self.geometry.as_ref()?.coordinates;
        let lon_lat: Vec<(f64, f64)> = coordinates
            .iter()
            .filter_map(|position| match position.as_slice() {
                [lon, lat, ..] => Some((*lon, *lat)),
                _ => None,
            })
            .collect();
        if lon_lat.len() < 2 {
            return None;
        }
        let id = self.pattern_id.clone().unwrap_or_default();
        Some(Pattern::from_lon_lat(id, route.route_short_name.clone(), &lon_lat, max_zoom))
    }
}

impl StopRecord {
    fn to_stop(&self, max_zoom: u8) -> Option<Stop> {
        let lat = self.stop_lat.as_ref()?.value()?;
        let lon = self.stop_lon.as_ref()?.value()?;
        Some(Stop::from_lat_lon(lat, lon, max_zoom))
    }
}

/// Project every usable pattern and stop of a feed, preserving feed order
pub fn process_feed(record: &FeedRecord, max_zoom: u8) -> FeatureSet {
    #[cfg(feature = "profiling")]
    profiling::scope!("feed::process_feed");

    let sources: Vec<(&RouteRecord, &PatternRecord)> = record
        .routes
        .iter()
        .flat_map(|route| route.patterns.iter().map(move |pattern| (route, pattern)))
        .collect();

    let patterns: Vec<Pattern> = sources
        .par_iter()
        .filter_map(|(route, pattern)| pattern.to_pattern(route, max_zoom))
        .collect();
    let stops: Vec<Stop> = record
        .stops
        .par_iter()
        .filter_map(|stop| stop.to_stop(max_zoom))
        .collect();

    let skipped_patterns = sources.len() - patterns.len();
    let skipped_stops = record.stops.len() - stops.len();
    if skipped_patterns > 0 || skipped_stops > 0 {
        tracing::warn!(
            "Feed {}: skipped {skipped_patterns} patterns without geometry \
             and {skipped_stops} stops without coordinates",
            record.feed_id.as_deref().unwrap_or("<unnamed>")
        );
    }
    tracing::info!("Read {} patterns and {} stops", patterns.len(), stops.len());

    FeatureSet::new(patterns, stops)
}

/// Loads feeds from the JSON cache or the query API
#[derive(Debug, Clone)]
pub struct FeedLoader {
    client: reqwest::Client,
    endpoint: String,
    cache_dir: PathBuf,
    max_zoom: u8,
}

impl FeedLoader {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("transit-tile-lib/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.api.gtfs.clone(),
            cache_dir: config.cache_directory.clone(),
            max_zoom: config.render.max_zoom,
        })
    }

    /// Path of the cached response for `feed_id`
    pub fn cache_path(&self, feed_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{feed_id}.json"))
    }

    /// Load the given feeds one after another and concatenate their features
    pub async fn load_all(&self, feed_ids: &[String]) -> Result<FeatureSet, FeedError> {
        let mut all = FeatureSet::default();
        for feed_id in feed_ids {
            let features = self.load_feed(feed_id).await?;
            all.extend(features);
        }
        tracing::info!(
            "Total patterns processed: {}, total stops processed: {}",
            all.patterns.len(),
            all.stops.len()
        );
        Ok(all)
    }

    pub async fn load_feed(&self, feed_id: &str) -> Result<FeatureSet, FeedError> {
        let record = match self.load_from_cache(feed_id)? {
            Some(record) => record,
            None => self.load_from_api(feed_id).await?,
        };
        Ok(process_feed(&record, self.max_zoom))
    }

    fn load_from_cache(&self, feed_id: &str) -> Result<Option<FeedRecord>, FeedError> {
        let path = self.cache_path(feed_id);
        tracing::debug!("Checking cache for {feed_id}");
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FeedError::Io { path, source }),
        };
        tracing::info!("Found {}, reading from cache", path.display());
        FeedRecord::from_response(&bytes, feed_id).map(Some)
    }

    async fn load_from_api(&self, feed_id: &str) -> Result<FeedRecord, FeedError> {
        tracing::info!("Feed {feed_id} not cached, querying {}", self.endpoint);
        let variables = serde_json::json!({ "feedId": feed_id }).to_string();
        let bytes = self
            .client
            .get(&self.endpoint)
            .query(&[("query", ROUTE_QUERY), ("variables", variables.as_str())])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if let Err(e) = write_cache(&self.cache_path(feed_id), &bytes) {
            tracing::warn!("Failed to cache feed {feed_id}: {e}");
        }
        FeedRecord::from_response(&bytes, feed_id)
    }
}

fn write_cache(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "data": {
            "feeds": [{
                "feed_id": "CDTA",
                "routes": [
                    {
                        "route_id": "r1",
                        "route_short_name": "1",
                        "route_long_name": "Central Ave",
                        "patterns": [
                            {
                                "pattern_id": "p1",
                                "geometry": {
                                    "type": "LineString",
                                    "coordinates": [[-73.76, 42.65], [-73.75, 42.66]]
                                }
                            },
                            { "pattern_id": "p2", "geometry": null }
                        ]
                    },
                    {
                        "route_id": "r2",
                        "route_short_name": "",
                        "patterns": [
                            {
                                "pattern_id": "p3",
                                "geometry": {
                                    "coordinates": [[-73.70, 42.60, 12.0], [-73.71, 42.61, 13.0]]
                                }
                            }
                        ]
                    }
                ],
                "stops": [
                    { "stop_lat": "42.65", "stop_lon": "-73.76" },
                    { "stop_lat": 42.66, "stop_lon": -73.75 },
                    { "stop_lat": "n/a", "stop_lon": "-73.75" }
                ]
            }]
        }
    }"#;

    #[test]
    fn test_parse_graphql_envelope() {
        let record = FeedRecord::from_response(RESPONSE.as_bytes(), "CDTA").unwrap();
        assert_eq!(record.feed_id.as_deref(), Some("CDTA"));
        assert_eq!(record.routes.len(), 2);
        assert_eq!(record.stops.len(), 3);
    }

    #[test]
    fn test_parse_top_level_feeds() {
        let json = r#"{ "feeds": [{ "feed_id": "X", "routes": [], "stops": [] }] }"#;
        let record = FeedRecord::from_response(json.as_bytes(), "X").unwrap();
        assert_eq!(record.feed_id.as_deref(), Some("X"));
    }

    #[test]
    fn test_missing_feed() {
        let err = FeedRecord::from_response(br#"{ "data": { "feeds": [] } }"#, "X").unwrap_err();
        assert!(matches!(err, FeedError::MissingFeed(id) if id == "X"));
        let err = FeedRecord::from_response(b"not json", "X").unwrap_err();
        assert!(matches!(err, FeedError::Json { .. }));
    }

    #[test]
    fn test_degrees_accept_numbers_and_strings() {
        assert_eq!(Degrees::Number(1.5).value(), Some(1.5));
        assert_eq!(Degrees::Text(" -73.75 ".into()).value(), Some(-73.75));
        assert_eq!(Degrees::Text("north".into()).value(), None);
        assert_eq!(Degrees::Number(f64::NAN).value(), None);
    }

    #[test]
    fn test_process_feed() {
        let record = FeedRecord::from_response(RESPONSE.as_bytes(), "CDTA").unwrap();
        let features = process_feed(&record, 12);

        let ids: Vec<&str> = features.patterns.iter().map(Pattern::pattern_id).collect();
        assert_eq!(ids, ["p1", "p3"]);
        assert_eq!(features.patterns[0].route_short_name(), Some("1"));
        assert_eq!(features.patterns[1].route_short_name(), None);
        assert_eq!(features.patterns[0].max_zoom(), 12);
        assert_eq!(features.stops.len(), 2);
    }

    #[tokio::test]
    async fn test_load_all_reads_cache_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let second = r#"{ "feeds": [{ "feed_id": "B", "routes": [{
            "route_short_name": "9",
            "patterns": [
            { "pattern_id": "b1", "geometry": { "coordinates": [[0.0, 0.0], [1.0, 1.0]] } }
        ] }], "stops": [] }] }"#;
        std::fs::write(dir.path().join("A.json"), RESPONSE).unwrap();
        std::fs::write(dir.path().join("B.json"), second).unwrap();

        let mut config = Config::default();
        // Unroutable endpoint; every feed must come from the cache
        config.api.gtfs = "http://127.0.0.1:9/graphql".to_string();
        config.cache_directory = dir.path().to_path_buf();
        config.render.max_zoom = 10;
        let loader = FeedLoader::new(&config).unwrap();
        assert_eq!(loader.cache_path("A"), dir.path().join("A.json"));

        let features = loader.load_all(&["A".to_string(), "B".to_string()]).await.unwrap();
        let ids: Vec<&str> = features.patterns.iter().map(Pattern::pattern_id).collect();
        assert_eq!(ids, ["p1", "p3", "b1"]);
        assert_eq!(features.stops.len(), 2);
    }

    #[test]
    fn test_write_cache_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feed.json");
        write_cache(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }
}
