use thiserror::Error;

/// Errors raised while loading one of the three input feeds.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot open Excel file: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("No data found in {0}")]
    Empty(String),

    #[error("Required column `{0}` is missing")]
    MissingColumn(String),

    #[error("Duplicate FIPS code {0}")]
    DuplicateFips(u32),

    #[error("Invalid topology: {0}")]
    Topology(String),

    #[error("Invalid analysis result: {0}")]
    Analysis(String),
}
