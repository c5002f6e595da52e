//! Configuration types for sprite-harvest
//!
//! A [`Config`] value is built once (from defaults, a JSON file, CLI overrides)
//! and handed to every component at construction. Nothing reads global state.

use crate::error::{Error, Result};
use crate::retry::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Browser profile sent with every request; the origin serves error pages to
/// clients that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration for a scrape run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listing page enumerating the categorized sprite sheets
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Site origin used to absolutize relative links (default: origin of `catalog_url`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Output root for images and the run report (default: "./sprites")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Pacing delay between entries; sections wait twice as long (default: 1000 ms)
    #[serde(default = "default_delay", with = "duration_ms_serde")]
    pub delay: Duration,

    /// Maximum retry attempts per download (default: 3)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay between download retries (default: 2000 ms)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub retry_delay: Duration,

    /// Multiplier applied to `retry_delay` after each retry; 1.0 keeps it fixed
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for exponential retry delays (default: 60000 ms)
    #[serde(default = "default_max_retry_delay", with = "duration_ms_serde")]
    pub max_retry_delay: Duration,

    /// Add random jitter to exponential retry delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// Concurrency ceiling for entries in flight (default: 1)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Download full sprite sheets (default: true)
    #[serde(default = "default_true")]
    pub download_images: bool,

    /// Download catalog icons next to the sheets (default: true)
    #[serde(default = "default_true")]
    pub download_icons: bool,

    /// Nest output by catalog section (default: true)
    #[serde(default = "default_true")]
    pub categorize: bool,

    /// Emit the run report (default: true)
    #[serde(default = "default_true")]
    pub save_metadata: bool,

    /// Prefix filenames with the numeric sheet id (default: true)
    #[serde(default = "default_true", rename = "includeID")]
    pub include_id: bool,

    /// Verbose logging (default: false)
    #[serde(default)]
    pub debug: bool,

    /// Per-request timeout (default: 30000 ms)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Stop after this many catalog sections (None = all)
    #[serde(default)]
    pub max_sections: Option<usize>,

    /// CSS selectors and link prefixes describing the site layout
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            base_url: None,
            output_dir: default_output_dir(),
            delay: default_delay(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_retry_delay: default_max_retry_delay(),
            jitter: false,
            max_concurrent: default_max_concurrent(),
            download_images: true,
            download_icons: true,
            categorize: true,
            save_metadata: true,
            include_id: true,
            debug: false,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            max_sections: None,
            selectors: SelectorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Check the configuration for values no component can work with
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.catalog_url)
            .map_err(|e| Error::config("catalogUrl", format!("invalid catalog URL: {e}")))?;
        self.site_origin()?;

        if self.max_concurrent == 0 {
            return Err(Error::config("maxConcurrent", "must be at least 1"));
        }
        if self.backoff_multiplier < 1.0 || !self.backoff_multiplier.is_finite() {
            return Err(Error::config(
                "backoffMultiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("requestTimeout", "must be greater than zero"));
        }

        crate::catalog::CatalogSelectors::compile(&self.selectors)?;
        crate::resolver::DetailSelectors::compile(&self.selectors)?;
        Ok(())
    }

    /// Origin used to absolutize relative links and build canonical download URLs
    pub fn site_origin(&self) -> Result<Url> {
        match &self.base_url {
            Some(base) => Url::parse(base)
                .map_err(|e| Error::config("baseUrl", format!("invalid base URL: {e}"))),
            None => {
                let catalog = Url::parse(&self.catalog_url).map_err(|e| {
                    Error::config("catalogUrl", format!("invalid catalog URL: {e}"))
                })?;
                let origin = catalog.origin().ascii_serialization();
                Url::parse(&origin).map_err(|e| {
                    Error::config("catalogUrl", format!("catalog URL has no origin: {e}"))
                })
            }
        }
    }

    /// Backoff policy for download retries
    pub fn backoff_policy(&self) -> BackoffPolicy {
        if self.backoff_multiplier > 1.0 {
            BackoffPolicy::Exponential {
                initial: self.retry_delay,
                multiplier: self.backoff_multiplier,
                max: self.max_retry_delay,
                jitter: self.jitter,
            }
        } else {
            BackoffPolicy::Fixed(self.retry_delay)
        }
    }
}

/// CSS selectors and link prefixes for the source site's page templates
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    /// Labeled container opening a catalog section
    pub section: String,
    /// Element inside the section container carrying the display name
    pub section_name: String,
    /// Attribute holding the section's display name
    pub section_name_attr: String,
    /// Sibling container holding a section's sprite icons
    pub icon_group: String,
    /// One sprite icon inside an icon group
    pub icon_container: String,
    /// Header text node holding the sheet title
    pub icon_title: String,
    /// Icon image inside an icon container
    pub icon_image: String,
    /// Image element inside the detail page's display region
    pub detail_image: String,
    /// Image element inside the fullview page's display region
    pub fullview_image: String,
    /// Rows of the detail page's metadata table
    pub metadata_row: String,
    /// Path prefix of download anchors
    pub download_prefix: String,
    /// Path prefix of fullview anchors
    pub fullview_prefix: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            section: "div.section".to_string(),
            section_name: "div.sect-name".to_string(),
            section_name_attr: "title".to_string(),
            icon_group: "div.updatesheeticons".to_string(),
            icon_container: "div.iconcontainer".to_string(),
            icon_title: "span.iconheadertext".to_string(),
            icon_image: "div.iconbody img".to_string(),
            detail_image: "div#sheet-container img".to_string(),
            fullview_image: "div#fullview-container img".to_string(),
            metadata_row: "table tr".to_string(),
            download_prefix: "/download/".to_string(),
            fullview_prefix: "/fullview/".to_string(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://www.spriters-resource.com/ds_dsi/digimonworldds/".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./sprites")
}

fn default_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent() -> usize {
    1
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

// Durations are stored as integer milliseconds on disk
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.delay, Duration::from_millis(1000));
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(2000));
        assert_eq!(config.max_concurrent, 1);
        assert!(config.categorize);
        assert!(config.save_metadata);
        assert!(config.include_id);
        assert!(!config.debug);
        assert_eq!(config.selectors.download_prefix, "/download/");
    }

    #[test]
    fn recognized_option_names_are_honored() {
        let json = r#"{
            "delay": 250,
            "retries": 5,
            "retryDelay": 100,
            "maxConcurrent": 2,
            "categorize": false,
            "saveMetadata": false,
            "includeID": false
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.retries, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
        assert_eq!(config.max_concurrent, 2);
        assert!(!config.categorize);
        assert!(!config.save_metadata);
        assert!(!config.include_id);
    }

    #[test]
    fn site_origin_defaults_to_catalog_origin() {
        let config = Config {
            catalog_url: "https://sprites.example.com/ds/game/".to_string(),
            ..Default::default()
        };
        let origin = config.site_origin().unwrap();
        assert_eq!(origin.as_str(), "https://sprites.example.com/");
    }

    #[test]
    fn explicit_base_url_wins() {
        let config = Config {
            catalog_url: "https://sprites.example.com/ds/game/".to_string(),
            base_url: Some("https://cdn.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.site_origin().unwrap().as_str(),
            "https://cdn.example.com/"
        );
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("maxConcurrent")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.selectors.icon_container = "div[[".to_string();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn multiplier_selects_backoff_policy() {
        let fixed = Config::default().backoff_policy();
        assert!(matches!(fixed, BackoffPolicy::Fixed(d) if d == Duration::from_millis(2000)));

        let config = Config {
            backoff_multiplier: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            config.backoff_policy(),
            BackoffPolicy::Exponential { multiplier, .. } if multiplier == 2.0
        ));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retries": 7, "outputDir": "/tmp/out"}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.retries, 7);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn from_file_reports_parse_errors_as_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(Error::Config { key: None, .. })
        ));
    }
}
