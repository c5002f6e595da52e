//! Run report persistence

use crate::error::Result;
use crate::types::RunReport;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the run report under the output root
pub const REPORT_FILE_NAME: &str = "metadata.json";

/// Writes the aggregate run report as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct RunReportWriter {
    path: PathBuf,
}

impl RunReportWriter {
    /// Writer targeting `<output_dir>/metadata.json`
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(REPORT_FILE_NAME),
        }
    }

    /// Where the report will be written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and write the report, replacing any previous one
    ///
    /// # Errors
    /// Returns error if the report cannot be serialized or written
    pub async fn write(&self, report: &RunReport) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&self.path, json).await?;

        info!(
            path = %self.path.display(),
            total = report.total_sprites,
            successful = report.successful_downloads,
            "Wrote run report"
        );
        Ok(())
    }

    /// Read a previously written report
    ///
    /// # Errors
    /// Returns error if the file is missing or not a valid report
    pub async fn read(&self) -> Result<RunReport> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
