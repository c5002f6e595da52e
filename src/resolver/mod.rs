//! Detail page resolution
//!
//! The source site exposes the same sheet through several markup shapes
//! depending on the page template version. [`SheetResolver`] absorbs that by
//! running an ordered list of [`ResolveStrategy`] objects; the first one that
//! yields a URL wins.

mod strategies;

pub use strategies::{
    DirectImage, DownloadLink, FullviewLink, IdFallback, ResolveStrategy, default_chain,
};

use crate::catalog::compile_selector;
use crate::config::SelectorConfig;
use crate::error::Result;
use crate::http::PageClient;
use crate::types::{ResolutionStrategy, ResolvedImage, SheetEntry};
use scraper::Selector;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Compiled selectors and link prefixes for detail and fullview pages
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    /// Image inside the detail page's display region
    pub detail_image: Selector,
    /// Image inside the fullview page's display region
    pub fullview_image: Selector,
    /// Rows of the detail page's metadata table
    pub metadata_row: Selector,
    /// Path prefix of download anchors
    pub download_prefix: String,
    /// Path prefix of fullview anchors
    pub fullview_prefix: String,
}

impl DetailSelectors {
    /// Compile detail page selectors from configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`](crate::error::Error::Config) naming the selector that failed to parse
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            detail_image: compile_selector("selectors.detailImage", &config.detail_image)?,
            fullview_image: compile_selector("selectors.fullviewImage", &config.fullview_image)?,
            metadata_row: compile_selector("selectors.metadataRow", &config.metadata_row)?,
            download_prefix: normalize_prefix(&config.download_prefix),
            fullview_prefix: normalize_prefix(&config.fullview_prefix),
        })
    }
}

fn normalize_prefix(prefix: &str) -> String {
    format!("/{}/", prefix.trim_matches('/'))
}

/// Everything a strategy may look at while resolving one detail page
pub struct ResolveContext<'a> {
    /// Absolute URL of the detail page
    pub detail_url: &'a str,
    /// Detail page HTML
    pub detail_html: &'a str,
    /// Site origin for absolutizing links
    pub origin: &'a Url,
    /// Client for auxiliary fetches
    pub client: &'a PageClient,
    /// Compiled page selectors
    pub selectors: &'a DetailSelectors,
    /// Inter-entry pacing delay; auxiliary fetches wait half of it
    pub pacing: Duration,
}

/// Resolves an entry's detail page to a downloadable image URL
pub struct SheetResolver {
    client: PageClient,
    selectors: DetailSelectors,
    pacing: Duration,
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl SheetResolver {
    /// Create a resolver running the standard strategy chain
    pub fn new(client: PageClient, selectors: DetailSelectors, pacing: Duration) -> Self {
        Self::with_strategies(client, selectors, pacing, default_chain())
    }

    /// Create a resolver running a custom strategy chain, in the given order
    pub fn with_strategies(
        client: PageClient,
        selectors: DetailSelectors,
        pacing: Duration,
        strategies: Vec<Box<dyn ResolveStrategy>>,
    ) -> Self {
        Self {
            client,
            selectors,
            pacing,
            strategies,
        }
    }

    /// Fetch the entry's detail page and resolve its image
    ///
    /// Never fails: an unreachable detail page resolves to
    /// [`ResolutionStrategy::NotFound`].
    pub async fn resolve(&self, entry: &SheetEntry) -> ResolvedImage {
        match self.client.get_html(&entry.detail_url).await {
            Ok(html) => self.resolve_with_html(entry, &html).await,
            Err(e) => {
                warn!(url = %entry.detail_url, error = %e, "Detail page unavailable");
                not_found(entry)
            }
        }
    }

    /// Resolve an entry against already-fetched detail page HTML
    pub async fn resolve_with_html(&self, entry: &SheetEntry, html: &str) -> ResolvedImage {
        let ctx = ResolveContext {
            detail_url: &entry.detail_url,
            detail_html: html,
            origin: self.client.origin(),
            client: &self.client,
            selectors: &self.selectors,
            pacing: self.pacing,
        };

        for strategy in &self.strategies {
            if let Some(url) = strategy.attempt(&ctx).await {
                debug!(
                    title = %entry.title,
                    strategy = %strategy.kind(),
                    url = %url,
                    "Resolved sheet image"
                );
                return ResolvedImage {
                    source_entry: entry.clone(),
                    image_url: Some(url),
                    resolution_strategy: strategy.kind(),
                };
            }
        }

        debug!(title = %entry.title, "No resolution strategy matched");
        not_found(entry)
    }
}

fn not_found(entry: &SheetEntry) -> ResolvedImage {
    ResolvedImage {
        source_entry: entry.clone(),
        image_url: None,
        resolution_strategy: ResolutionStrategy::NotFound,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(origin: &str) -> SheetResolver {
        let config = Config {
            catalog_url: format!("{origin}/ds/game/"),
            ..Default::default()
        };
        let client = PageClient::new(&config).unwrap();
        let selectors = DetailSelectors::compile(&config.selectors).unwrap();
        SheetResolver::new(client, selectors, Duration::ZERO)
    }

    fn entry(detail_url: &str) -> SheetEntry {
        SheetEntry {
            title: "Agumon".to_string(),
            detail_url: detail_url.to_string(),
            icon_url: None,
            sheet_id: crate::utils::extract_sheet_id(detail_url),
            category: "Rookie".to_string(),
        }
    }

    const ORIGIN: &str = "https://www.example.com";

    #[tokio::test]
    async fn direct_image_wins_over_download_link() {
        let html = r#"
            <div id="sheet-container"><img src="/images/foo.png"></div>
            <a href="/download/999/">Download</a>
        "#;
        let resolved = resolver(ORIGIN)
            .resolve_with_html(&entry("https://www.example.com/ds/game/sheet/123/"), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::DirectImage);
        assert_eq!(
            resolved.image_url.as_deref(),
            Some("https://www.example.com/images/foo.png")
        );
    }

    #[tokio::test]
    async fn download_link_builds_canonical_url() {
        let html = r#"<div id="sheet-container"></div><a href="/download/456/">Download</a>"#;
        let resolved = resolver(ORIGIN)
            .resolve_with_html(&entry("https://www.example.com/ds/game/sheet/123/"), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::DownloadLink);
        assert_eq!(
            resolved.image_url.as_deref(),
            Some("https://www.example.com/download/456/")
        );
    }

    #[tokio::test]
    async fn image_without_src_falls_through() {
        let html = r#"<div id="sheet-container"><img alt="no source"></div>"#;
        let resolved = resolver(ORIGIN)
            .resolve_with_html(&entry("https://www.example.com/ds/game/sheet/77/"), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::IdFallback);
        assert_eq!(
            resolved.image_url.as_deref(),
            Some("https://www.example.com/download/77/")
        );
    }

    #[tokio::test]
    async fn fullview_page_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fullview/321/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div id="fullview-container"><img src="/media/sheets/321.png"></div>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let html = r#"<p>no image here</p><a href="/fullview/321/">Full view</a>"#;
        let resolved = resolver(&server.uri())
            .resolve_with_html(&entry(&format!("{}/ds/game/agumon/", server.uri())), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::FullviewLink);
        assert_eq!(
            resolved.image_url,
            Some(format!("{}/media/sheets/321.png", server.uri()))
        );
    }

    #[tokio::test]
    async fn fullview_fetch_waits_half_the_pacing_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fullview/321/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div id="fullview-container"><img src="/media/sheets/321.png"></div>"#,
            ))
            .mount(&server)
            .await;

        let config = Config {
            catalog_url: format!("{}/ds/game/", server.uri()),
            ..Default::default()
        };
        let client = PageClient::new(&config).unwrap();
        let selectors = DetailSelectors::compile(&config.selectors).unwrap();
        let pacing = Duration::from_millis(300);
        let resolver = SheetResolver::new(client, selectors, pacing);

        let html = r#"<a href="/fullview/321/">Full view</a>"#;
        let start = std::time::Instant::now();
        let resolved = resolver
            .resolve_with_html(&entry(&format!("{}/ds/game/agumon/", server.uri())), html)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::FullviewLink);
        assert!(elapsed >= pacing / 2, "waited only {elapsed:?}");
        assert!(elapsed < pacing, "waited the full delay: {elapsed:?}");
    }

    #[tokio::test]
    async fn pacing_is_skipped_without_fullview_fetch() {
        let config = Config {
            catalog_url: format!("{ORIGIN}/ds/game/"),
            ..Default::default()
        };
        let client = PageClient::new(&config).unwrap();
        let selectors = DetailSelectors::compile(&config.selectors).unwrap();
        let resolver = SheetResolver::new(client, selectors, Duration::from_secs(5));

        let html = r#"<div id="sheet-container"><img src="/images/foo.png"></div>"#;
        let start = std::time::Instant::now();
        let resolved = resolver
            .resolve_with_html(&entry("https://www.example.com/ds/game/sheet/1/"), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::DirectImage);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn broken_fullview_page_falls_back_to_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fullview/5/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let html = r#"<a href="/fullview/5/">Full view</a>"#;
        let resolved = resolver(&server.uri())
            .resolve_with_html(&entry(&format!("{}/ds/game/sheet/5/", server.uri())), html)
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::IdFallback);
        assert_eq!(resolved.image_url, Some(format!("{}/download/5/", server.uri())));
    }

    #[tokio::test]
    async fn nothing_recoverable_is_not_found() {
        let resolved = resolver(ORIGIN)
            .resolve_with_html(
                &entry("https://www.example.com/ds/game/agumon/"),
                "<html><body><p>Nothing</p></body></html>",
            )
            .await;

        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::NotFound);
        assert_eq!(resolved.image_url, None);
    }

    #[tokio::test]
    async fn resolving_twice_is_identical() {
        let html = r#"<a href="/download/42/">Download</a>"#;
        let resolver = resolver(ORIGIN);
        let entry = entry("https://www.example.com/ds/game/sheet/42/");

        let first = resolver.resolve_with_html(&entry, html).await;
        let second = resolver.resolve_with_html(&entry, html).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unreachable_detail_page_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolved = resolver(&server.uri())
            .resolve(&entry(&format!("{}/ds/game/sheet/9/", server.uri())))
            .await;
        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::NotFound);
        assert_eq!(resolved.image_url, None);
    }

    #[tokio::test]
    async fn resolve_fetches_detail_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ds/game/sheet/8/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div id="sheet-container"><img src="/images/8.png"></div>"#,
            ))
            .mount(&server)
            .await;

        let resolved = resolver(&server.uri())
            .resolve(&entry(&format!("{}/ds/game/sheet/8/", server.uri())))
            .await;
        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::DirectImage);
        assert_eq!(resolved.image_url, Some(format!("{}/images/8.png", server.uri())));
    }

    #[tokio::test]
    async fn custom_chain_order_is_respected() {
        let config = Config {
            catalog_url: format!("{ORIGIN}/ds/game/"),
            ..Default::default()
        };
        let client = PageClient::new(&config).unwrap();
        let selectors = DetailSelectors::compile(&config.selectors).unwrap();
        let resolver = SheetResolver::with_strategies(
            client,
            selectors,
            Duration::ZERO,
            vec![Box::new(DownloadLink), Box::new(DirectImage)],
        );

        let html = r#"
            <div id="sheet-container"><img src="/images/foo.png"></div>
            <a href="/download/999/">Download</a>
        "#;
        let resolved = resolver
            .resolve_with_html(&entry("https://www.example.com/ds/game/sheet/1/"), html)
            .await;
        assert_eq!(resolved.resolution_strategy, ResolutionStrategy::DownloadLink);
    }

    #[test]
    fn prefixes_are_normalized() {
        let mut config = SelectorConfig::default();
        config.download_prefix = "download".to_string();
        config.fullview_prefix = "/fullview".to_string();
        let selectors = DetailSelectors::compile(&config).unwrap();
        assert_eq!(selectors.download_prefix, "/download/");
        assert_eq!(selectors.fullview_prefix, "/fullview/");
    }
}
