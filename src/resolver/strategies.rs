//! Resolution strategies, tried in order by [`SheetResolver`](super::SheetResolver)
//!
//! Every strategy looks only at the detail page HTML, except the fullview
//! strategy which may make one auxiliary fetch. HTML parsing happens in plain
//! functions so no parsed document is held across an await point.

use super::ResolveContext;
use crate::types::ResolutionStrategy;
use crate::utils::{
    absolutize_url, canonical_download_url, extract_sheet_id, id_after_prefix, path_has_prefix,
};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// One way of turning a detail page into a concrete image URL
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Which strategy this is, recorded in the resolution result
    fn kind(&self) -> ResolutionStrategy;

    /// Try to resolve; `None` means "try the next strategy"
    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<String>;
}

/// Image element inside the detail page's display region
pub struct DirectImage;

#[async_trait]
impl ResolveStrategy for DirectImage {
    fn kind(&self) -> ResolutionStrategy {
        ResolutionStrategy::DirectImage
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<String> {
        first_image_src(ctx.detail_html, &ctx.selectors.detail_image, ctx.origin)
    }
}

/// Anchor into the download endpoint; the id is read from its href and the
/// canonical download URL rebuilt from it
pub struct DownloadLink;

#[async_trait]
impl ResolveStrategy for DownloadLink {
    fn kind(&self) -> ResolutionStrategy {
        ResolutionStrategy::DownloadLink
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<String> {
        let prefix = ctx.selectors.download_prefix.as_str();
        let id = anchor_hrefs(ctx.detail_html)
            .into_iter()
            .filter(|href| path_has_prefix(href, prefix, ctx.origin))
            .find_map(|href| id_after_prefix(&href, prefix, ctx.origin))?;
        canonical_download_url(ctx.origin, prefix, &id)
    }
}

/// Anchor to a fullview page, fetched after half the pacing delay and searched
/// for an image inside its display region
pub struct FullviewLink;

#[async_trait]
impl ResolveStrategy for FullviewLink {
    fn kind(&self) -> ResolutionStrategy {
        ResolutionStrategy::FullviewLink
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<String> {
        let prefix = ctx.selectors.fullview_prefix.as_str();
        let fullview_url = anchor_hrefs(ctx.detail_html)
            .into_iter()
            .filter(|href| path_has_prefix(href, prefix, ctx.origin))
            .find_map(|href| absolutize_url(&href, ctx.origin))?;

        if !ctx.pacing.is_zero() {
            tokio::time::sleep(ctx.pacing / 2).await;
        }

        let html = match ctx.client.get_html(&fullview_url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(url = %fullview_url, error = %e, "Fullview page unavailable");
                return None;
            }
        };
        first_image_src(&html, &ctx.selectors.fullview_image, ctx.origin)
    }
}

/// Canonical download URL synthesized from the id in the detail URL itself
pub struct IdFallback;

#[async_trait]
impl ResolveStrategy for IdFallback {
    fn kind(&self) -> ResolutionStrategy {
        ResolutionStrategy::IdFallback
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<String> {
        let id = extract_sheet_id(ctx.detail_url)?;
        canonical_download_url(ctx.origin, &ctx.selectors.download_prefix, &id)
    }
}

/// The standard chain: direct image, download link, fullview link, id fallback
pub fn default_chain() -> Vec<Box<dyn ResolveStrategy>> {
    vec![
        Box::new(DirectImage),
        Box::new(DownloadLink),
        Box::new(FullviewLink),
        Box::new(IdFallback),
    ]
}

fn first_image_src(html: &str, selector: &Selector, origin: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| absolutize_url(src, origin))
}

fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}
