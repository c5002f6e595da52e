//! Pipeline orchestration
//!
//! The orchestrator walks the catalog section by section and entry by entry:
//! - [`entry`] - per-entry flow (attribution, icon, resolution, download, record)
//!
//! Sections run strictly in page order. Within a section at most
//! `maxConcurrent` entries are in flight (1 by default) and records are
//! collected in catalog order regardless of completion order. A fatal error
//! (unreachable catalog, unwritable output) aborts the run; per-entry failures
//! are only counted.

mod entry;

use crate::attribution::AttributionFetcher;
use crate::catalog::{CatalogFetcher, CatalogSelectors};
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::http::PageClient;
use crate::report::RunReportWriter;
use crate::resolver::{DetailSelectors, SheetResolver};
use crate::types::{CatalogSection, Event, RunReport, SpriteRecord};
use crate::utils::sanitize_dir_name;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

/// Sections between progress reports
const PROGRESS_INTERVAL: usize = 10;

/// Directory used for sections whose name is not a usable directory
const UNNAMED_SECTION: &str = "Uncategorized";

/// Drives a complete scrape run
pub struct PipelineOrchestrator {
    config: Arc<Config>,
    catalog: CatalogFetcher,
    resolver: SheetResolver,
    attribution: AttributionFetcher,
    downloader: Downloader,
    report_writer: RunReportWriter,
    origin: Url,
    download_prefix: String,
    event_tx: broadcast::Sender<Event>,
}

impl PipelineOrchestrator {
    /// Build every component from one configuration value
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = PageClient::new(&config)?;
        let catalog_selectors = CatalogSelectors::compile(&config.selectors)?;
        let detail_selectors = DetailSelectors::compile(&config.selectors)?;

        let origin = client.origin().clone();
        let download_prefix = detail_selectors.download_prefix.clone();
        let attribution =
            AttributionFetcher::new(client.clone(), detail_selectors.metadata_row.clone());
        let resolver = SheetResolver::new(client.clone(), detail_selectors, config.delay);
        let downloader = Downloader::from_config(client.clone(), &config);
        let catalog = CatalogFetcher::new(client, catalog_selectors);
        let report_writer = RunReportWriter::new(&config.output_dir);
        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            catalog,
            resolver,
            attribution,
            downloader,
            report_writer,
            origin,
            download_prefix,
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this orchestrator was built with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Run the whole pipeline and return the report
    ///
    /// # Errors
    /// Returns error if the catalog cannot be fetched, the output tree cannot be
    /// created, or the report cannot be written
    pub async fn run(&self) -> Result<RunReport> {
        let catalog_url = self.config.catalog_url.as_str();
        let mut sections = self.catalog.fetch(catalog_url).await?;
        if let Some(max) = self.config.max_sections {
            sections.truncate(max);
        }

        let total_entries: usize = sections.iter().map(|s| s.entries.len()).sum();
        info!(
            source = catalog_url,
            sections = sections.len(),
            entries = total_entries,
            "Starting scrape run"
        );
        self.emit_event(Event::RunStarted {
            source: catalog_url.to_string(),
            sections: sections.len(),
            entries: total_entries,
        });

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut records: Vec<SpriteRecord> = Vec::with_capacity(total_entries);
        let mut created_dirs = HashSet::new();
        let total_sections = sections.len();

        for (index, section) in sections.iter().enumerate() {
            info!(
                section = %section.name,
                index = index + 1,
                total = total_sections,
                entries = section.entries.len(),
                "Processing section"
            );
            self.emit_event(Event::SectionStarted {
                index,
                name: section.name.clone(),
                entries: section.entries.len(),
            });

            if !section.entries.is_empty() {
                let dir = self.category_dir(&section.name, &mut created_dirs).await?;
                records.extend(self.process_section(section, &dir).await);
            }

            let done = index + 1;
            if done % PROGRESS_INTERVAL == 0 {
                self.report_progress(done, total_sections, &records);
            }
            if done < total_sections && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay * 2).await;
            }
        }

        if total_sections % PROGRESS_INTERVAL != 0 || total_sections == 0 {
            self.report_progress(total_sections, total_sections, &records);
        }

        let report = RunReport::new(catalog_url, records);
        if self.config.save_metadata {
            self.report_writer.write(&report).await?;
        }

        info!(
            total = report.total_sprites,
            successful = report.successful_downloads,
            "Scrape run finished"
        );
        self.emit_event(Event::RunFinished {
            total: report.total_sprites,
            successful: report.successful_downloads,
        });
        Ok(report)
    }

    /// Process one section's entries, returning records in catalog order
    async fn process_section(&self, section: &CatalogSection, dir: &Path) -> Vec<SpriteRecord> {
        let delay = self.config.delay;
        stream::iter(section.entries.iter().enumerate())
            .map(|(i, entry)| async move {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.process_entry(entry, dir).await
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await
    }

    /// Output directory for a section, created on first use
    async fn category_dir(&self, name: &str, created: &mut HashSet<PathBuf>) -> Result<PathBuf> {
        let dir = if self.config.categorize {
            self.config.output_dir.join(sanitize_dir_name(name, UNNAMED_SECTION))
        } else {
            self.config.output_dir.clone()
        };

        if created.insert(dir.clone()) && !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&dir).await?;
            debug!(path = %dir.display(), "Created category directory");
        }
        Ok(dir)
    }

    fn report_progress(&self, sections_done: usize, sections_total: usize, records: &[SpriteRecord]) {
        let successful = records.iter().filter(|r| r.download_success).count();
        info!(
            sections_done,
            sections_total,
            sprites = records.len(),
            successful,
            "Progress"
        );
        self.emit_event(Event::Progress {
            sections_done,
            sections_total,
            sprites: records.len(),
            successful,
        });
    }
}
