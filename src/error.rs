use thiserror::Error;

pub type SinapiResult<T> = Result<T, SinapiError>;

#[derive(Error, Debug)]
pub enum SinapiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Failed to read sheet '{sheet}': {message}")]
    SheetRead { sheet: String, message: String },

    #[error("Metadata extraction failed: {0}")]
    Metadata(String),

    #[error("No header row found in any price sheet: {0}")]
    NoHeaderFound(String),

    #[error("Data source '{0}' is not supported")]
    UnsupportedSource(String),

    #[error("Unsupported file '{0}': expected .xls or .xlsx")]
    UnsupportedFile(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Persistence error on table '{table}': {message}")]
    Persistence { table: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SinapiError {
    /// Whether the failure was caused by the uploaded input rather than by this service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SinapiError::WorkbookOpen(_)
                | SinapiError::Metadata(_)
                | SinapiError::NoHeaderFound(_)
                | SinapiError::UnsupportedSource(_)
                | SinapiError::UnsupportedFile(_)
        )
    }
}

/// Why a sheet contributed no records. Never fatal to an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    HeaderNotFound,
    NoDataRows,
    ReadFailed(String),
}

impl SkipReason {
    /// Short reason code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::HeaderNotFound => "header_not_found",
            SkipReason::NoDataRows => "no_data_rows",
            SkipReason::ReadFailed(_) => "read_failed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::HeaderNotFound => write!(f, "no header row found"),
            SkipReason::NoDataRows => write!(f, "no data rows below header"),
            SkipReason::ReadFailed(msg) => write!(f, "sheet could not be read: {}", msg),
        }
    }
}
