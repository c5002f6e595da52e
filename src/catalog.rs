//! Catalog page retrieval and parsing
//!
//! The listing page is a flat run of labeled section containers, each followed
//! by a sibling container of sprite icons:
//!
//! ```html
//! <div class="section"><div class="sect-name" title="Rookie">Rookie</div></div>
//! <div class="updatesheeticons">
//!   <a href="/ds/game/sheet/123/">
//!     <div class="iconcontainer">
//!       <div class="iconheader"><span class="iconheadertext">Agumon</span></div>
//!       <div class="iconbody"><img src="/media/icons/123.png"></div>
//!     </div>
//!   </a>
//! </div>
//! ```
//!
//! Structure drift never fails the parse: a section without icons yields an
//! empty entry list and an icon without a detail link is skipped.

use crate::config::SelectorConfig;
use crate::error::{Error, Result};
use crate::http::PageClient;
use crate::types::{CatalogSection, SheetEntry};
use crate::utils::{absolutize_url, extract_sheet_id};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

#[allow(clippy::expect_used)]
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

const UNTITLED: &str = "Untitled";
const UNNAMED_SECTION: &str = "Uncategorized";

/// Compiled selectors for the catalog page
#[derive(Debug, Clone)]
pub struct CatalogSelectors {
    section: Selector,
    section_name: Selector,
    section_name_attr: String,
    icon_group: Selector,
    icon_container: Selector,
    icon_title: Selector,
    icon_image: Selector,
}

impl CatalogSelectors {
    /// Compile the catalog selectors from configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the selector that failed to parse
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            section: compile_selector("selectors.section", &config.section)?,
            section_name: compile_selector("selectors.sectionName", &config.section_name)?,
            section_name_attr: config.section_name_attr.clone(),
            icon_group: compile_selector("selectors.iconGroup", &config.icon_group)?,
            icon_container: compile_selector("selectors.iconContainer", &config.icon_container)?,
            icon_title: compile_selector("selectors.iconTitle", &config.icon_title)?,
            icon_image: compile_selector("selectors.iconImage", &config.icon_image)?,
        })
    }
}

/// Parse a CSS selector, reporting failures as configuration errors
pub(crate) fn compile_selector(key: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::config(key, format!("invalid selector '{css}': {e}")))
}

/// Joined, trimmed text content of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_string()
}

/// Retrieves the listing page and splits it into sections of entries
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: PageClient,
    selectors: CatalogSelectors,
}

impl CatalogFetcher {
    /// Create a catalog fetcher
    pub fn new(client: PageClient, selectors: CatalogSelectors) -> Self {
        Self { client, selectors }
    }

    /// Fetch and parse the catalog page
    ///
    /// # Errors
    /// Returns [`Error::Fetch`] if the page cannot be retrieved. Parse misses
    /// are never errors.
    pub async fn fetch(&self, catalog_url: &str) -> Result<Vec<CatalogSection>> {
        let html = self.client.get_html(catalog_url).await?;
        let sections = self.parse(&html);

        let entries: usize = sections.iter().map(|s| s.entries.len()).sum();
        info!(
            url = catalog_url,
            sections = sections.len(),
            entries,
            "Parsed catalog"
        );
        Ok(sections)
    }

    /// Parse catalog HTML into sections, preserving page order
    pub fn parse(&self, html: &str) -> Vec<CatalogSection> {
        let document = Html::parse_document(html);
        let origin = self.client.origin();

        document
            .select(&self.selectors.section)
            .map(|container| {
                let name = self.section_name(container);
                let entries = match self.icon_group_after(container) {
                    Some(group) => group
                        .select(&self.selectors.icon_container)
                        .filter_map(|icon| self.parse_entry(icon, &name, origin))
                        .collect(),
                    None => {
                        debug!(section = %name, "Section has no icon container");
                        Vec::new()
                    }
                };
                CatalogSection { name, entries }
            })
            .collect()
    }

    fn section_name(&self, container: ElementRef<'_>) -> String {
        let attr = self.selectors.section_name_attr.as_str();
        let labeled = container
            .select(&self.selectors.section_name)
            .next()
            .and_then(|label| label.value().attr(attr))
            .or_else(|| container.value().attr(attr))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        labeled
            .or_else(|| {
                let text = element_text(container);
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| UNNAMED_SECTION.to_string())
    }

    /// Nearest following sibling holding icons, stopping at the next section
    fn icon_group_after<'a>(&self, container: ElementRef<'a>) -> Option<ElementRef<'a>> {
        for sibling in container.next_siblings().filter_map(ElementRef::wrap) {
            if self.selectors.section.matches(&sibling) {
                return None;
            }
            if self.selectors.icon_group.matches(&sibling) {
                return Some(sibling);
            }
            if let Some(nested) = sibling.select(&self.selectors.icon_group).next() {
                return Some(nested);
            }
        }
        None
    }

    fn parse_entry(&self, icon: ElementRef<'_>, category: &str, origin: &Url) -> Option<SheetEntry> {
        let href = icon
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a" && el.value().attr("href").is_some())
            .or_else(|| icon.select(&LINK_SELECTOR).next())
            .and_then(|a| a.value().attr("href"))?;

        let Some(detail_url) = absolutize_url(href, origin) else {
            debug!(href, "Skipping icon with unusable detail link");
            return None;
        };

        let title = icon
            .select(&self.selectors.icon_title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let icon_url = icon
            .select(&self.selectors.icon_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| absolutize_url(src, origin));

        let sheet_id = extract_sheet_id(href);

        Some(SheetEntry {
            title,
            detail_url,
            icon_url,
            sheet_id,
            category: category.to_string(),
        })
    }
}
