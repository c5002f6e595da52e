//! Per-entry processing
//!
//! Stages: discovered, attribution resolved, icon downloaded (optional), image
//! resolved, full image downloaded or failed, recorded.
//!
//! The full image gets up to three URL paths: the resolver's result, the
//! canonical download URL for a catalog-known sheet id when the resolver found
//! nothing, and the canonical URL again when the resolved URL failed to
//! download.

use super::PipelineOrchestrator;
use crate::types::{EntryStage, Event, SheetEntry, SpriteRecord};
use crate::utils::{build_file_stem, canonical_download_url};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

impl PipelineOrchestrator {
    pub(super) async fn process_entry(&self, entry: &SheetEntry, dir: &Path) -> SpriteRecord {
        debug!(title = %entry.title, stage = %EntryStage::Discovered, "Entry stage");

        let submitter = self.attribution.fetch_submitter(&entry.detail_url).await;
        debug!(
            title = %entry.title,
            submitter = %submitter,
            stage = %EntryStage::AttributionResolved,
            "Entry stage"
        );

        let stem = build_file_stem(
            &entry.title,
            &submitter,
            entry.sheet_id.as_deref(),
            self.config.include_id,
        );

        if self.config.download_icons
            && let Some(icon_url) = &entry.icon_url
        {
            let icon_path = dir.join(format!("{stem}_icon.png"));
            let outcome = self.downloader.download(icon_url, &icon_path).await;
            if outcome.success {
                debug!(title = %entry.title, stage = %EntryStage::IconDownloaded, "Entry stage");
            }
        }

        let resolved = self.resolver.resolve(entry).await;
        debug!(
            title = %entry.title,
            strategy = %resolved.resolution_strategy,
            stage = %EntryStage::ImageResolved,
            "Entry stage"
        );

        let canonical = entry
            .sheet_id
            .as_deref()
            .and_then(|id| canonical_download_url(&self.origin, &self.download_prefix, id));
        let primary = resolved.image_url.clone().or_else(|| canonical.clone());

        let (full_image_url, success) = match primary {
            None => (None, false),
            Some(url) if !self.config.download_images => (Some(url), false),
            Some(url) => {
                let image_path = dir.join(format!("{stem}.png"));
                let outcome = self.downloader.download(&url, &image_path).await;
                match canonical {
                    Some(fallback) if !outcome.success && fallback != url => {
                        info!(
                            title = %entry.title,
                            url = %fallback,
                            "Retrying through canonical download URL"
                        );
                        let retry = self.downloader.download(&fallback, &image_path).await;
                        (Some(fallback), retry.success)
                    }
                    _ => (Some(url), outcome.success),
                }
            }
        };

        let stage = if success {
            EntryStage::FullImageDownloaded
        } else {
            EntryStage::FullImageFailed
        };
        debug!(title = %entry.title, stage = %stage, "Entry stage");

        let record = SpriteRecord {
            id: entry.sheet_id.clone(),
            title: entry.title.clone(),
            detail_url: entry.detail_url.clone(),
            category: entry.category.clone(),
            submitter,
            icon_url: entry.icon_url.clone(),
            full_image_url,
            download_success: success,
            timestamp: Utc::now(),
        };

        debug!(title = %entry.title, stage = %EntryStage::Recorded, "Entry stage");
        self.emit_event(Event::EntryRecorded {
            id: record.id.clone(),
            title: record.title.clone(),
            category: record.category.clone(),
            success,
        });
        record
    }
}
