//! Report output configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Where and how the final report is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub file_path: PathBuf,

    pub format: ReportFormat,

    /// Create missing parent directories before writing
    #[serde(default = "crate::domains::utils::default_true")]
    pub create_dirs: bool,
}

/// Serialization format of the report file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Single-line JSON
    JsonCompact,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "json_compact" | "json-compact" => Ok(ReportFormat::JsonCompact),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            _ => Err(format!("Invalid report format: {}", s)),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("report.json"),
            format: ReportFormat::Json,
            create_dirs: true,
        }
    }
}

impl Validatable for ReportConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(
            &self.file_path.to_string_lossy(),
            "file_path",
            self.domain_name(),
        )?;
        if self.file_path.file_name().is_none() {
            return Err(self.validation_error("file_path must name a file"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "report"
    }
}
