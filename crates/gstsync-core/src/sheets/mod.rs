//! Google Sheets access: authentication, the values API and the row writer.

mod auth;
mod client;
mod writer;

pub use auth::{ServiceAccountKey, TokenProvider, SHEETS_SCOPE};
pub use client::{SheetsClient, DEFAULT_API_BASE};
pub use writer::{Backoff, Delivery, RetryPolicy, RowWriter};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

/// Result type for sheets operations.
pub type Result<T> = std::result::Result<T, SheetsError>;

/// Summary returned by a values update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: Option<u32>,
    pub updated_columns: Option<u32>,
    pub updated_cells: Option<u32>,
}

/// The one remote operation the writer needs.
///
/// `SheetsClient` talks to Google; tests substitute their own.
pub trait ValuesApi {
    /// Overwrite `range` with a single row of `values`, letting the
    /// service interpret types as if typed by a user.
    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[String],
    ) -> impl Future<Output = Result<UpdateValuesResponse>> + Send;
}
