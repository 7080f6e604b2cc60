//! Core library for syncing GST return data into Google Sheets.
//!
//! This crate provides:
//! - GSTR-2A (CSV) and GSTR-2B (JSON) line item extraction
//! - A Google Sheets values client authenticated with a service account
//! - A row writer with deterministic exponential backoff

pub mod error;
pub mod models;
pub mod extract;
pub mod sheets;

pub use error::{GstError, Result};
pub use models::record::{CellRange, GstType, InvoiceLineRecord};
pub use extract::{Extraction, ExtractionStats, SkippedItem, SourceFormat, SheetTarget, MAX_SHEET_ROWS};
pub use sheets::{Delivery, RetryPolicy, RowWriter, SheetsClient, ValuesApi};
