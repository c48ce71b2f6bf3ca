//! Analytics configuration (YAML)

use crate::aggregate::YearPolicy;
use crate::error::{StatementError, StatementResult};
use crate::sheets::DuplicateSheetPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Directory of fiscal-year workbooks
    pub data_dir: PathBuf,
    /// Accepted workbook extensions, without the dot
    pub extensions: Vec<String>,
    pub year_policy: YearPolicy,
    pub duplicate_sheet_policy: DuplicateSheetPolicy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extensions: vec!["xlsx".to_string(), "xlsm".to_string()],
            year_policy: YearPolicy::default(),
            duplicate_sheet_policy: DuplicateSheetPolicy::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_yaml_str(yaml: &str) -> StatementResult<Self> {
        let config: AnalyticsConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A relative `data_dir` is taken relative to the file.
    pub fn load(path: &Path) -> StatementResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        if config.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data_dir = parent.join(&config.data_dir);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> StatementResult<()> {
        if self.extensions.is_empty() {
            return Err(StatementError::Validation(
                "At least one workbook extension is required".to_string(),
            ));
        }
        for ext in &self.extensions {
            let bare = ext.trim_start_matches('.');
            if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(StatementError::Validation(format!(
                    "Invalid workbook extension '{}'",
                    ext
                )));
            }
        }
        Ok(())
    }

    /// Config file (or defaults) with an optional data directory override.
    pub fn resolve(config: Option<&Path>, data_dir: Option<PathBuf>) -> StatementResult<Self> {
        let mut resolved = match config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(dir) = data_dir {
            resolved.data_dir = dir;
        }
        Ok(resolved)
    }
}
