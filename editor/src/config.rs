//! Editor configuration loaded via OrthoConfig.
//!
//! Values layer CLI arguments over `OSM_GTFS_*` environment variables over
//! configuration files. Every field is optional; accessors apply defaults.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::changeset::DEFAULT_GENERATOR;
use crate::domain::query_queue::{DEFAULT_COOLDOWN, DEFAULT_MAX_IDS_PER_REQUEST, QueryQueueConfig};
use crate::outbound::{DEFAULT_USER_AGENT, HttpIdentity};

/// Public Overpass interpreter.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
/// Public OSM REST API host.
pub const DEFAULT_OSM_API_URL: &str = "https://api.openstreetmap.org";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TILE_ZOOM: u8 = 15;
const DEFAULT_MAX_TILES: u64 = 400;

/// Settings for the upstream services and export.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "OSM_GTFS")]
pub struct EditorSettings {
    /// Overpass interpreter endpoint.
    pub overpass_url: Option<String>,
    /// OSM REST API base URL.
    pub osm_api_url: Option<String>,
    /// Minimum spacing between outbound requests, in milliseconds.
    pub throttle_ms: Option<u64>,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: Option<u64>,
    /// `User-Agent` sent upstream.
    pub user_agent: Option<String>,
    /// Operator contact sent in the `Contact` header.
    pub contact: Option<String>,
    /// Zoom level used to tile query areas.
    pub tile_zoom: Option<u8>,
    /// Largest number of tiles one query area may cover.
    pub max_tiles: Option<u64>,
    /// Maximum ids per OSM API request.
    pub max_ids_per_request: Option<usize>,
    /// `generator` attribute of exported changesets.
    pub generator: Option<String>,
}

impl EditorSettings {
    /// Overpass endpoint, falling back to the public interpreter.
    pub fn overpass_url(&self) -> &str {
        self.overpass_url.as_deref().unwrap_or(DEFAULT_OVERPASS_URL)
    }

    /// OSM API base URL, falling back to openstreetmap.org.
    pub fn osm_api_url(&self) -> &str {
        self.osm_api_url.as_deref().unwrap_or(DEFAULT_OSM_API_URL)
    }

    /// Request spacing.
    pub fn throttle(&self) -> Duration {
        self.throttle_ms
            .map_or(DEFAULT_COOLDOWN, Duration::from_millis)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Tile zoom level.
    pub fn tile_zoom(&self) -> u8 {
        self.tile_zoom.unwrap_or(DEFAULT_TILE_ZOOM)
    }

    /// Tile budget for one query area.
    pub fn max_tiles(&self) -> u64 {
        self.max_tiles.unwrap_or(DEFAULT_MAX_TILES)
    }

    /// Ids per REST request.
    pub fn max_ids_per_request(&self) -> usize {
        self.max_ids_per_request
            .unwrap_or(DEFAULT_MAX_IDS_PER_REQUEST)
    }

    /// Changeset generator attribute.
    pub fn generator(&self) -> &str {
        self.generator.as_deref().unwrap_or(DEFAULT_GENERATOR)
    }

    /// Queue tuning derived from these settings.
    pub fn query_queue_config(&self) -> QueryQueueConfig {
        QueryQueueConfig {
            cooldown: self.throttle(),
            max_ids_per_request: self.max_ids_per_request(),
        }
    }

    /// Client identity sent with upstream requests. Blank contacts are
    /// dropped.
    pub fn http_identity(&self) -> HttpIdentity {
        HttpIdentity {
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            contact: self
                .contact
                .clone()
                .filter(|contact| !contact.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for editor configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const KEYS: [&str; 10] = [
        "OSM_GTFS_OVERPASS_URL",
        "OSM_GTFS_OSM_API_URL",
        "OSM_GTFS_THROTTLE_MS",
        "OSM_GTFS_REQUEST_TIMEOUT_SECS",
        "OSM_GTFS_USER_AGENT",
        "OSM_GTFS_CONTACT",
        "OSM_GTFS_TILE_ZOOM",
        "OSM_GTFS_MAX_TILES",
        "OSM_GTFS_MAX_IDS_PER_REQUEST",
        "OSM_GTFS_GENERATOR",
    ];

    fn load_from_empty_args() -> EditorSettings {
        EditorSettings::load_from_iter([OsString::from("fetch-stops")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(KEYS.map(|key| (key, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.overpass_url(), DEFAULT_OVERPASS_URL);
        assert_eq!(settings.osm_api_url(), DEFAULT_OSM_API_URL);
        assert_eq!(settings.throttle(), Duration::from_millis(1500));
        assert_eq!(settings.request_timeout(), Duration::from_secs(60));
        assert_eq!(settings.tile_zoom(), 15);
        assert_eq!(settings.max_tiles(), 400);
        assert_eq!(settings.max_ids_per_request(), 100);
        assert_eq!(settings.generator(), "osm-gtfs");
        assert_eq!(settings.http_identity(), HttpIdentity::default());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("OSM_GTFS_OVERPASS_URL", Some("http://localhost:12345/api/interpreter".to_owned())),
            ("OSM_GTFS_OSM_API_URL", None),
            ("OSM_GTFS_THROTTLE_MS", Some("250".to_owned())),
            ("OSM_GTFS_REQUEST_TIMEOUT_SECS", None),
            ("OSM_GTFS_USER_AGENT", Some("stop-audit/2.0".to_owned())),
            ("OSM_GTFS_CONTACT", Some("maps@example.org".to_owned())),
            ("OSM_GTFS_TILE_ZOOM", Some("14".to_owned())),
            ("OSM_GTFS_MAX_TILES", Some("50".to_owned())),
            ("OSM_GTFS_MAX_IDS_PER_REQUEST", Some("25".to_owned())),
            ("OSM_GTFS_GENERATOR", None),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.overpass_url(), "http://localhost:12345/api/interpreter");
        assert_eq!(settings.tile_zoom(), 14);
        assert_eq!(settings.max_tiles(), 50);
        assert_eq!(
            settings.query_queue_config(),
            QueryQueueConfig {
                cooldown: Duration::from_millis(250),
                max_ids_per_request: 25,
            }
        );
        assert_eq!(
            settings.http_identity(),
            HttpIdentity {
                user_agent: "stop-audit/2.0".to_owned(),
                contact: Some("maps@example.org".to_owned()),
            }
        );
    }

    #[rstest]
    fn blank_contact_is_not_sent() {
        let _guard = lock_env([("OSM_GTFS_CONTACT", Some("  ".to_owned()))]);

        let settings = load_from_empty_args();
        assert!(settings.http_identity().contact.is_none());
    }
}
