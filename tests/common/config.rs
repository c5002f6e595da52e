//! Test configuration helpers

use sprite_harvest::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Catalog path every mock site serves its listing from
pub const CATALOG_PATH: &str = "/ds/game/";

/// Config pointing at the mock site with pacing disabled and fast retries
pub fn test_config(server: &MockServer, output: &Path) -> Config {
    Config {
        catalog_url: format!("{}{}", server.uri(), CATALOG_PATH),
        output_dir: output.to_path_buf(),
        delay: Duration::ZERO,
        retries: 2,
        retry_delay: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
        download_icons: false,
        ..Default::default()
    }
}
