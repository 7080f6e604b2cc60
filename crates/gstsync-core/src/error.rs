//! Error types for the gstsync-core library.

use thiserror::Error;

/// Main error type for the gstsync library.
#[derive(Error, Debug)]
pub enum GstError {
    /// Input document could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Remote sheets error.
    #[error("sheets error: {0}")]
    Sheets(#[from] SheetsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Records cannot be addressed to the requested rows.
    #[error("invalid target: {0}")]
    Target(String),
}

/// Errors raised while reading a return file.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed or mis-shaped JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column or key is absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A numeric field could not be read as a decimal.
    #[error("invalid number for {field} on line {line}: {value:?}")]
    InvalidNumber {
        field: String,
        value: String,
        line: u64,
    },
}

/// Errors from the Google Sheets API or its authentication.
#[derive(Error, Debug)]
pub enum SheetsError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Access token could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The configured API base is not a usable URL.
    #[error("invalid API base URL: {0}")]
    BaseUrl(String),

    /// Service account key is unreadable or invalid.
    #[error("invalid service account key: {0}")]
    Key(String),
}

/// Result type for the gstsync library.
pub type Result<T> = std::result::Result<T, GstError>;
