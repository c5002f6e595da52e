//! # sprite-harvest
//!
//! Sprite sheet acquisition pipeline: reads a categorized catalog page,
//! resolves each entry to a downloadable image across several page layouts,
//! downloads the images with retry and validation, and writes a JSON run report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sprite_harvest::{Config, PipelineOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         catalog_url: "https://www.spriters-resource.com/ds_dsi/digimonworldds/".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let pipeline = PipelineOrchestrator::new(config)?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = pipeline.run().await?;
//!     println!("{}/{} downloaded", report.successful_downloads, report.total_sprites);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Submitter attribution
pub mod attribution;
/// Catalog page parsing
pub mod catalog;
/// Configuration types
pub mod config;
/// Image downloads
pub mod downloader;
/// Error types
pub mod error;
/// Shared HTTP client
pub mod http;
/// Run orchestration
pub mod pipeline;
/// Run report persistence
pub mod report;
/// Detail page resolution strategies
pub mod resolver;
/// Retry logic with pluggable backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use attribution::{AttributionFetcher, UNKNOWN_SUBMITTER};
pub use catalog::CatalogFetcher;
pub use config::{Config, SelectorConfig};
pub use downloader::Downloader;
pub use error::{DownloadFailure, Error, Result};
pub use pipeline::PipelineOrchestrator;
pub use report::RunReportWriter;
pub use resolver::{ResolveStrategy, SheetResolver};
pub use retry::BackoffPolicy;
pub use types::{
    CatalogSection, DownloadOutcome, EntryStage, Event, ResolutionStrategy, ResolvedImage,
    RunReport, SheetEntry, SpriteRecord,
};
