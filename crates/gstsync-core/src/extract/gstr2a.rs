//! GSTR-2A invoice export (CSV) reader.

use std::io::Read;

use csv::{Reader, ReaderBuilder, StringRecord};
use serde::Deserialize;

use crate::error::ParseError;
use crate::models::record::{GstType, InvoiceLineRecord};

use super::{parse_decimal, ExtractionStats, Result, RowCursor, SheetTarget};

const COL_GSTIN: &str = "GSTIN of supplier";
const COL_RATE: &str = "Rate (%)";
const COL_TAXABLE: &str = "Taxable Value";
const COL_IGST: &str = "Integrated Tax";

const REQUIRED_COLUMNS: [&str; 4] = [COL_GSTIN, COL_RATE, COL_TAXABLE, COL_IGST];

/// The columns of a GSTR-2A row this tool reads. Others are ignored.
#[derive(Debug, Deserialize)]
struct Gstr2aRow {
    #[serde(rename = "GSTIN of supplier")]
    gstin: String,
    #[serde(rename = "Rate (%)")]
    rate: String,
    #[serde(rename = "Taxable Value")]
    taxable_value: String,
    #[serde(rename = "Integrated Tax")]
    integrated_tax: String,
}

/// Streams one record per CSV row.
pub struct Gstr2aRecords<R> {
    reader: Reader<R>,
    headers: StringRecord,
    buf: StringRecord,
    cursor: RowCursor,
    stats: ExtractionStats,
    done: bool,
}

impl<R: Read> Gstr2aRecords<R> {
    /// Wrap a reader, checking the header row up front.
    pub fn new(input: R, target: &SheetTarget) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ParseError::MissingField(column.to_string()));
            }
        }

        Ok(Self {
            reader,
            headers,
            buf: StringRecord::new(),
            cursor: RowCursor::new(target),
            stats: ExtractionStats::default(),
            done: false,
        })
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    fn read_next(&mut self) -> Result<Option<InvoiceLineRecord>> {
        if !self.reader.read_record(&mut self.buf)? {
            return Ok(None);
        }

        let line = self.buf.position().map(|p| p.line()).unwrap_or_default();
        let row: Gstr2aRow = self.buf.deserialize(Some(&self.headers))?;

        let number = |field: &str, value: &str| {
            parse_decimal(value).ok_or_else(|| ParseError::InvalidNumber {
                field: field.to_string(),
                value: value.to_string(),
                line,
            })
        };

        let gst_rate = number(COL_RATE, &row.rate)?;
        let taxable_value = number(COL_TAXABLE, &row.taxable_value)?;
        let gst_type = gst_type_for(&row.integrated_tax);

        self.stats.seen += 1;
        self.stats.emitted += 1;

        Ok(Some(InvoiceLineRecord {
            supplier_id: row.gstin,
            supplier_name: String::new(),
            gst_type,
            gst_rate,
            taxable_value,
            invoice_number: None,
            target_cell_range: self.cursor.advance(),
        }))
    }
}

/// The export writes a literal `0` for intra-state rows.
fn gst_type_for(integrated_tax: &str) -> GstType {
    if integrated_tax == "0" {
        GstType::Intra
    } else {
        GstType::Inter
    }
}

impl<R: Read> Iterator for Gstr2aRecords<R> {
    type Item = Result<InvoiceLineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
