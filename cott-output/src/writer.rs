//! Filesystem delivery of the final report

use crate::error::{OutputError, OutputResult};
use cott_config::{ReportConfig, ReportFormat};
use cott_core::Report;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::info;

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Writes reports according to a [`ReportConfig`]
#[derive(Debug, Clone)]
pub struct ReportWriter {
    config: ReportConfig,
}

impl ReportWriter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Point the writer at another file, keeping format and directory policy
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.file_path = path.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.config.file_path
    }

    /// Serialize the report in the configured format
    pub fn format_report(&self, report: &Report) -> OutputResult<Vec<u8>> {
        match self.config.format {
            ReportFormat::Json => {
                serde_json::to_vec_pretty(report).map_err(|e| OutputError::Serialization {
                    format: "json".to_string(),
                    error: e.to_string(),
                })
            }
            ReportFormat::JsonCompact => {
                serde_json::to_vec(report).map_err(|e| OutputError::Serialization {
                    format: "json_compact".to_string(),
                    error: e.to_string(),
                })
            }
            ReportFormat::Yaml => serde_yaml::to_string(report)
                .map(String::into_bytes)
                .map_err(|e| OutputError::Serialization {
                    format: "yaml".to_string(),
                    error: e.to_string(),
                }),
        }
    }

    /// Serialize and write the report, replacing any existing file
    pub async fn write(&self, report: &Report) -> OutputResult<WriteSummary> {
        let start_time = Instant::now();
        let path = self.config.file_path.as_path();

        if self.config.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| OutputError::Filesystem {
                        path: parent.to_string_lossy().to_string(),
                        operation: "create_dirs".to_string(),
                        error: e.to_string(),
                    })?;
            }
        }

        let data = self.format_report(report)?;
        let size_bytes = data.len() as u64;

        fs::write(path, &data)
            .await
            .map_err(|e| OutputError::Filesystem {
                path: path.to_string_lossy().to_string(),
                operation: "write".to_string(),
                error: e.to_string(),
            })?;

        info!(
            path = %path.display(),
            size_bytes,
            cases = report.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Report written"
        );

        Ok(WriteSummary {
            path: path.to_path_buf(),
            size_bytes,
        })
    }
}
