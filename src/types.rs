//! Core types for sprite-harvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One cataloged sprite sheet before resolution
///
/// Produced by the catalog fetcher and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetEntry {
    /// Sheet title as shown in the catalog
    pub title: String,
    /// Absolute URL of the sheet's detail page
    pub detail_url: String,
    /// Absolute URL of the catalog icon, if the entry had one
    pub icon_url: Option<String>,
    /// Numeric id parsed from `/sheet/<digits>/` in the detail URL
    pub sheet_id: Option<String>,
    /// Name of the catalog section the entry appeared under
    pub category: String,
}

/// A catalog section and its entries, in page order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Display name of the section
    pub name: String,
    /// Entries in the order they appear on the page
    pub entries: Vec<SheetEntry>,
}

/// Which resolution strategy produced an image URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Image element in the detail page's display region
    DirectImage,
    /// Anchor pointing at the download endpoint
    DownloadLink,
    /// Image found on the linked fullview page
    FullviewLink,
    /// Canonical download URL synthesized from the id in the detail URL
    IdFallback,
    /// Nothing worked
    NotFound,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResolutionStrategy::DirectImage => "direct_image",
            ResolutionStrategy::DownloadLink => "download_link",
            ResolutionStrategy::FullviewLink => "fullview_link",
            ResolutionStrategy::IdFallback => "id_fallback",
            ResolutionStrategy::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// Outcome of resolving an entry to a concrete image URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImage {
    /// The entry that was resolved
    pub source_entry: SheetEntry,
    /// Absolute image URL; `None` only when every strategy failed
    pub image_url: Option<String>,
    /// Strategy that produced `image_url`
    pub resolution_strategy: ResolutionStrategy,
}

/// Result of one download, across all of its retry attempts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// URL that was fetched
    pub url: String,
    /// Where the bytes were (or would have been) written
    pub destination_path: PathBuf,
    /// Whether the bytes were written
    pub success: bool,
    /// Attempts made, at least 1
    pub attempts: u32,
    /// Last failure, when `success` is false
    pub failure_reason: Option<String>,
}

/// Per-entry record persisted in the run report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteRecord {
    /// Numeric sheet id, if known
    pub id: Option<String>,
    /// Sheet title
    pub title: String,
    /// Detail page URL
    pub detail_url: String,
    /// Catalog section
    pub category: String,
    /// Submitter credited on the detail page, "Unknown" if unavailable
    pub submitter: String,
    /// Catalog icon URL
    pub icon_url: Option<String>,
    /// URL of the final full-image download attempt; `None` if nothing resolved
    pub full_image_url: Option<String>,
    /// Whether the full image was saved
    pub download_success: bool,
    /// When the record was assembled
    pub timestamp: DateTime<Utc>,
}

/// Aggregate record of one pipeline run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Catalog URL the run started from
    #[serde(rename = "source")]
    pub source_url: String,
    /// When the run finished
    pub scrape_date: DateTime<Utc>,
    /// Number of records
    pub total_sprites: usize,
    /// Records whose full image was saved
    pub successful_downloads: usize,
    /// Records in catalog order
    pub sprites: Vec<SpriteRecord>,
}

impl RunReport {
    /// Build a report from records, deriving the counters
    pub fn new(source_url: impl Into<String>, sprites: Vec<SpriteRecord>) -> Self {
        let successful_downloads = sprites.iter().filter(|s| s.download_success).count();
        Self {
            source_url: source_url.into(),
            scrape_date: Utc::now(),
            total_sprites: sprites.len(),
            successful_downloads,
            sprites,
        }
    }

    /// Fraction of records whose full image was saved (0.0 for an empty run)
    pub fn success_ratio(&self) -> f64 {
        if self.total_sprites == 0 {
            0.0
        } else {
            self.successful_downloads as f64 / self.total_sprites as f64
        }
    }
}

/// Processing stage of a single entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStage {
    /// Entry read from the catalog
    Discovered,
    /// Submitter looked up (or defaulted)
    AttributionResolved,
    /// Icon saved
    IconDownloaded,
    /// Full image URL resolved (or not)
    ImageResolved,
    /// Full image saved
    FullImageDownloaded,
    /// Full image could not be saved
    FullImageFailed,
    /// Record assembled
    Recorded,
}

impl std::fmt::Display for EntryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntryStage::Discovered => "discovered",
            EntryStage::AttributionResolved => "attribution_resolved",
            EntryStage::IconDownloaded => "icon_downloaded",
            EntryStage::ImageResolved => "image_resolved",
            EntryStage::FullImageDownloaded => "full_image_downloaded",
            EntryStage::FullImageFailed => "full_image_failed",
            EntryStage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

/// Events emitted by the pipeline
///
/// Consumers subscribe via [`PipelineOrchestrator::subscribe`](crate::pipeline::PipelineOrchestrator::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Catalog parsed, run starting
    RunStarted {
        /// Catalog URL
        source: String,
        /// Sections to process
        sections: usize,
        /// Entries across those sections
        entries: usize,
    },

    /// A section is about to be processed
    SectionStarted {
        /// Zero-based section index
        index: usize,
        /// Section display name
        name: String,
        /// Entries in the section
        entries: usize,
    },

    /// An entry's record was assembled
    EntryRecorded {
        /// Sheet id, if known
        id: Option<String>,
        /// Sheet title
        title: String,
        /// Catalog section
        category: String,
        /// Whether the full image was saved
        success: bool,
    },

    /// Periodic progress (every ten sections and at the end)
    Progress {
        /// Sections finished
        sections_done: usize,
        /// Sections in the run
        sections_total: usize,
        /// Records assembled so far
        sprites: usize,
        /// Full images saved so far
        successful: usize,
    },

    /// Run finished and the report (if enabled) was written
    RunFinished {
        /// Records in the report
        total: usize,
        /// Full images saved
        successful: usize,
    },
}
