//! Normalized invoice line records and their target cell ranges.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of columns written per row (A through D).
pub const ROW_WIDTH: usize = 4;

/// Whether a supply crossed a state border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GstType {
    /// Intra-state supply (CGST + SGST).
    Intra,
    /// Inter-state supply (IGST).
    Inter,
}

impl GstType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GstType::Intra => "INTRA",
            GstType::Inter => "INTER",
        }
    }
}

impl fmt::Display for GstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-row `A:D` range on a named sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    /// Sheet (tab) name.
    pub sheet: String,
    /// 1-based row number.
    pub row: u32,
}

impl CellRange {
    pub fn new(sheet: impl Into<String>, row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
        }
    }

    /// Render the range in A1 notation, e.g. `'January 2022'!A8:D8`.
    pub fn to_a1(&self) -> String {
        format!(
            "{}!A{row}:D{row}",
            quote_sheet_name(&self.sheet),
            row = self.row
        )
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Quote a sheet name for A1 notation when it is not a bare identifier.
fn quote_sheet_name(name: &str) -> String {
    let bare = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if bare {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// One invoice line ready to be written to the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineRecord {
    /// Supplier GSTIN.
    pub supplier_id: String,

    /// Supplier trade name (empty for GSTR-2A rows).
    #[serde(default)]
    pub supplier_name: String,

    /// Intra- or inter-state supply.
    pub gst_type: GstType,

    /// Tax rate in percent.
    pub gst_rate: Decimal,

    /// Taxable value, excluding tax.
    pub taxable_value: Decimal,

    /// Invoice number, when the source carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Where this record lands on the sheet.
    pub target_cell_range: CellRange,
}

impl InvoiceLineRecord {
    /// Label for column A: GSTIN followed by the trade name.
    pub fn display_label(&self) -> String {
        format!("{}  {}", self.supplier_id, self.supplier_name)
    }

    /// Cell values in column order: label, rate, type, taxable value.
    pub fn row_values(&self) -> [String; ROW_WIDTH] {
        [
            self.display_label(),
            self.gst_rate.normalize().to_string(),
            self.gst_type.to_string(),
            self.taxable_value.normalize().to_string(),
        ]
    }
}
