//! Extraction of invoice line records from GST return files.

mod gstr2a;
mod gstr2b;

pub use gstr2a::Gstr2aRecords;
pub use gstr2b::Gstr2bRecords;

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GstError, ParseError};
use crate::models::record::{CellRange, InvoiceLineRecord};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Supported return file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// GSTR-2A invoice export (CSV).
    Gstr2a,
    /// GSTR-2B return document (JSON).
    Gstr2b,
}

impl SourceFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Gstr2a),
            "json" => Some(SourceFormat::Gstr2b),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Gstr2a => write!(f, "GSTR-2A"),
            SourceFormat::Gstr2b => write!(f, "GSTR-2B"),
        }
    }
}

/// Highest row a sheet can hold (Sheets caps a spreadsheet at ten million cells).
pub const MAX_SHEET_ROWS: u32 = 10_000_000;

/// Sheet and first row that extracted records are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub sheet_name: String,
    pub start_row: u32,
}

impl SheetTarget {
    pub fn new(sheet_name: impl Into<String>, start_row: u32) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            start_row,
        }
    }
}

/// Hands out consecutive rows. Only emitted records advance it.
#[derive(Debug, Clone)]
pub(crate) struct RowCursor {
    sheet: String,
    next_row: u32,
}

impl RowCursor {
    pub(crate) fn new(target: &SheetTarget) -> Self {
        Self {
            sheet: target.sheet_name.clone(),
            next_row: target.start_row,
        }
    }

    pub(crate) fn advance(&mut self) -> CellRange {
        let range = CellRange::new(self.sheet.clone(), self.next_row);
        self.next_row = self.next_row.saturating_add(1);
        range
    }
}

/// A line item that was counted but not emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub supplier_id: String,
    pub supplier_name: String,
    pub invoice_number: String,
}

/// Counters kept while iterating a return file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Line items read from the source.
    pub seen: usize,
    /// Records handed to the caller.
    pub emitted: usize,
    /// Zero-rated items that were passed over.
    pub skipped: Vec<SkippedItem>,
}

impl ExtractionStats {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Lazy record stream over a return file.
pub enum Extraction {
    Gstr2a(Gstr2aRecords<File>),
    Gstr2b(Gstr2bRecords),
}

impl Extraction {
    /// Open `path` as `format`, addressing records from `target.start_row` on.
    ///
    /// GSTR-2B documents are read and shape-checked in full here; GSTR-2A
    /// rows are read one at a time as the iterator advances.
    pub fn open(path: &Path, format: SourceFormat, target: &SheetTarget) -> crate::Result<Self> {
        debug!("Opening {} as {}", path.display(), format);

        if target.start_row == 0 || target.start_row > MAX_SHEET_ROWS {
            return Err(GstError::Target(format!(
                "start row {} is outside 1..={}",
                target.start_row, MAX_SHEET_ROWS
            )));
        }

        let file = File::open(path).map_err(GstError::Io)?;
        let extraction = match format {
            SourceFormat::Gstr2a => Extraction::Gstr2a(Gstr2aRecords::new(file, target)?),
            SourceFormat::Gstr2b => Extraction::Gstr2b(Gstr2bRecords::from_reader(file, target)?),
        };

        Ok(extraction)
    }

    /// Counters so far.
    pub fn stats(&self) -> &ExtractionStats {
        match self {
            Extraction::Gstr2a(records) => records.stats(),
            Extraction::Gstr2b(records) => records.stats(),
        }
    }
}

impl Iterator for Extraction {
    type Item = Result<InvoiceLineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Extraction::Gstr2a(records) => records.next(),
            Extraction::Gstr2b(records) => records.next().map(Ok),
        }
    }
}

/// Parse a decimal from return-file text, tolerating thousands separators.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("GSTR2A-INVOICE.CSV")),
            Some(SourceFormat::Gstr2a)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("returns_R2B.json")),
            Some(SourceFormat::Gstr2b)
        );
        assert_eq!(SourceFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(SourceFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 1,250.50 "), Decimal::from_str("1250.50").ok());
        assert_eq!(parse_decimal("18"), Some(Decimal::from(18)));
        assert_eq!(parse_decimal("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/a"), None);
    }

    #[test]
    fn test_row_cursor_is_contiguous() {
        let mut cursor = RowCursor::new(&SheetTarget::new("Sheet1", 8));
        let rows: Vec<u32> = (0..3).map(|_| cursor.advance().row).collect();
        assert_eq!(rows, vec![8, 9, 10]);
    }

    #[test]
    fn test_row_cursor_saturates_at_last_row() {
        let mut cursor = RowCursor::new(&SheetTarget::new("Sheet1", u32::MAX));
        assert_eq!(cursor.advance().row, u32::MAX);
        assert_eq!(cursor.advance().row, u32::MAX);
    }

    #[test]
    fn test_open_rejects_rows_outside_sheet() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();

        for start_row in [0, MAX_SHEET_ROWS + 1, u32::MAX] {
            let target = SheetTarget::new("Sheet1", start_row);
            let result = Extraction::open(file.path(), SourceFormat::Gstr2b, &target);
            assert!(
                matches!(result, Err(GstError::Target(_))),
                "start row {} accepted",
                start_row
            );
        }
    }

    #[test]
    fn test_open_dispatches_on_format() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "GSTIN of supplier,Rate (%),Taxable Value,Integrated Tax").unwrap();
        writeln!(file, "22AAAAA0000A1Z5,18,100,18").unwrap();

        let target = SheetTarget::new("Sheet1", 2);
        let extraction = Extraction::open(file.path(), SourceFormat::Gstr2a, &target).unwrap();
        let records: Vec<_> = extraction.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_cell_range.to_a1(), "Sheet1!A2:D2");
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let target = SheetTarget::new("Sheet1", 2);
        let result = Extraction::open(Path::new("/nonexistent/r2b.json"), SourceFormat::Gstr2b, &target);
        assert!(matches!(result, Err(GstError::Io(_))));
    }
}
