//! Submitter attribution from detail pages
//!
//! Attribution is best-effort: any fetch or parse failure yields
//! [`UNKNOWN_SUBMITTER`] and the pipeline carries on.

use crate::catalog::element_text;
use crate::http::PageClient;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Submitter recorded when the detail page does not name one
pub const UNKNOWN_SUBMITTER: &str = "Unknown";

/// Label of the metadata row that holds the submitter
const SUBMITTER_LABEL: &str = "Submitter";

/// Decorations appended by the page template start at one of these
const SUBMITTER_SEPARATORS: [char; 3] = ['\n', '|', '•'];

#[allow(clippy::expect_used)]
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("cell selector is valid"));

/// Looks up who submitted a sheet
#[derive(Debug, Clone)]
pub struct AttributionFetcher {
    client: PageClient,
    row_selector: Selector,
}

impl AttributionFetcher {
    /// Create an attribution fetcher using the given metadata row selector
    pub fn new(client: PageClient, row_selector: Selector) -> Self {
        Self {
            client,
            row_selector,
        }
    }

    /// Fetch the detail page and return its submitter, or "Unknown"
    pub async fn fetch_submitter(&self, detail_url: &str) -> String {
        match self.client.get_html(detail_url).await {
            Ok(html) => self
                .parse_submitter(&html)
                .unwrap_or_else(|| UNKNOWN_SUBMITTER.to_string()),
            Err(e) => {
                debug!(url = detail_url, error = %e, "Attribution unavailable");
                UNKNOWN_SUBMITTER.to_string()
            }
        }
    }

    /// Extract the submitter from detail page HTML
    pub fn parse_submitter(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        document.select(&self.row_selector).find_map(|row| {
            let cells: Vec<_> = row.select(&CELL_SELECTOR).collect();
            let first = cells.first()?;
            if element_text(*first) != SUBMITTER_LABEL {
                return None;
            }
            let raw = cells.last().map(|cell| element_text(*cell))?;
            let name = raw
                .split(SUBMITTER_SEPARATORS)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            (!name.is_empty()).then_some(name)
        })
    }
}
