use thiserror::Error;

pub type StatementResult<T> = Result<T, StatementError>;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Sheet '{sheet}' has no column matching {wanted}")]
    MissingColumn { sheet: String, wanted: String },

    #[error("Workbook {path} has no sheet for {key}")]
    MissingSheet { path: String, key: String },

    #[error("No 20xx fiscal year in file name '{0}'")]
    FilenameYear(String),

    #[error("Sheets '{first}' and '{second}' both map to {key}")]
    DuplicateSheet {
        key: String,
        first: String,
        second: String,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl StatementError {
    /// Whether this error means "no data for this workbook" rather than a malformed input.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, StatementError::MissingSheet { .. })
    }
}

impl From<calamine::Error> for StatementError {
    fn from(e: calamine::Error) -> Self {
        StatementError::Workbook(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for StatementError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        StatementError::Export(e.to_string())
    }
}
