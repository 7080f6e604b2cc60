//! GSTR-2B return document (JSON) reader.

use std::io::Read;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::info;

use crate::models::record::{GstType, InvoiceLineRecord};

use super::{parse_decimal, ExtractionStats, Result, RowCursor, SheetTarget, SkippedItem};

/// Top level of a GSTR-2B download: `data.docdata.b2b[]`.
#[derive(Debug, Deserialize)]
struct Gstr2bDocument {
    data: Gstr2bData,
}

#[derive(Debug, Deserialize)]
struct Gstr2bData {
    docdata: DocData,
}

#[derive(Debug, Deserialize)]
struct DocData {
    b2b: Vec<B2bSupplier>,
}

#[derive(Debug, Deserialize)]
struct B2bSupplier {
    ctin: String,
    trdnm: String,
    inv: Vec<B2bInvoice>,
}

#[derive(Debug, Deserialize)]
struct B2bInvoice {
    inum: String,
    items: Vec<B2bItem>,
}

#[derive(Debug, Deserialize)]
struct B2bItem {
    #[serde(deserialize_with = "decimal_number")]
    rt: Decimal,
    #[serde(deserialize_with = "decimal_number")]
    txval: Decimal,
    #[serde(default, deserialize_with = "optional_decimal_number")]
    igst: Option<Decimal>,
}

fn number_to_decimal<E: de::Error>(number: serde_json::Number) -> std::result::Result<Decimal, E> {
    parse_decimal(&number.to_string())
        .ok_or_else(|| E::custom(format!("number out of range: {number}")))
}

fn decimal_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Decimal, D::Error> {
    number_to_decimal(serde_json::Number::deserialize(deserializer)?)
}

fn optional_decimal_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error> {
    Option::<serde_json::Number>::deserialize(deserializer)?
        .map(number_to_decimal::<D::Error>)
        .transpose()
}

/// Walks suppliers, invoices and items in document order.
///
/// The whole document is deserialized up front so a shape error surfaces
/// before any row is written.
pub struct Gstr2bRecords {
    suppliers: std::vec::IntoIter<B2bSupplier>,
    invoices: std::vec::IntoIter<B2bInvoice>,
    items: std::vec::IntoIter<B2bItem>,
    supplier_id: String,
    supplier_name: String,
    invoice_number: String,
    cursor: RowCursor,
    stats: ExtractionStats,
}

impl Gstr2bRecords {
    pub fn from_reader<R: Read>(input: R, target: &SheetTarget) -> Result<Self> {
        let document: Gstr2bDocument = serde_json::from_reader(input)?;
        Ok(Self::from_document(document, target))
    }

    pub fn from_slice(input: &[u8], target: &SheetTarget) -> Result<Self> {
        let document: Gstr2bDocument = serde_json::from_slice(input)?;
        Ok(Self::from_document(document, target))
    }

    fn from_document(document: Gstr2bDocument, target: &SheetTarget) -> Self {
        Self {
            suppliers: document.data.docdata.b2b.into_iter(),
            invoices: Vec::new().into_iter(),
            items: Vec::new().into_iter(),
            supplier_id: String::new(),
            supplier_name: String::new(),
            invoice_number: String::new(),
            cursor: RowCursor::new(target),
            stats: ExtractionStats::default(),
        }
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    fn skip(&mut self) {
        info!(
            "Skipping zero-rated item on invoice {} from {} ({})",
            self.invoice_number, self.supplier_name, self.supplier_id
        );
        self.stats.skipped.push(SkippedItem {
            supplier_id: self.supplier_id.clone(),
            supplier_name: self.supplier_name.clone(),
            invoice_number: self.invoice_number.clone(),
        });
    }
}

impl Iterator for Gstr2bRecords {
    type Item = InvoiceLineRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.items.next() {
                self.stats.seen += 1;

                if item.rt.is_zero() {
                    self.skip();
                    continue;
                }

                let gst_type = match item.igst {
                    Some(igst) if igst > Decimal::ZERO => GstType::Inter,
                    _ => GstType::Intra,
                };

                self.stats.emitted += 1;
                return Some(InvoiceLineRecord {
                    supplier_id: self.supplier_id.clone(),
                    supplier_name: self.supplier_name.clone(),
                    gst_type,
                    gst_rate: item.rt,
                    taxable_value: item.txval,
                    invoice_number: Some(self.invoice_number.clone()),
                    target_cell_range: self.cursor.advance(),
                });
            }

            if let Some(invoice) = self.invoices.next() {
                self.invoice_number = invoice.inum;
                self.items = invoice.items.into_iter();
                continue;
            }

            let supplier = self.suppliers.next()?;
            self.supplier_id = supplier.ctin;
            self.supplier_name = supplier.trdnm;
            self.invoices = supplier.inv.into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const SAMPLE: &str = include_str!("../../tests/fixtures/gstr2b_sample.json");

    fn target() -> SheetTarget {
        SheetTarget::new("January 2022", 8)
    }

    #[test]
    fn test_sample_skips_zero_rate() {
        let mut records = Gstr2bRecords::from_slice(SAMPLE.as_bytes(), &target()).unwrap();
        let emitted: Vec<InvoiceLineRecord> = records.by_ref().collect();

        assert_eq!(emitted.len(), 2);
        assert_eq!(records.stats().seen, 3);
        assert_eq!(records.stats().emitted, 2);
        assert_eq!(records.stats().skipped_count(), 1);

        let skipped = &records.stats().skipped[0];
        assert_eq!(skipped.supplier_id, "29AABCT1332L1ZT");
        assert_eq!(skipped.invoice_number, "TS/0042");
    }

    #[test]
    fn test_sample_fields_and_rows() {
        let records: Vec<_> = Gstr2bRecords::from_slice(SAMPLE.as_bytes(), &target())
            .unwrap()
            .collect();

        assert_eq!(records[0].supplier_id, "22AAICA7413H1ZX");
        assert_eq!(records[0].supplier_name, "ACME STEEL PVT LTD");
        assert_eq!(records[0].gst_type, GstType::Intra);
        assert_eq!(records[0].gst_rate, Decimal::from(18));
        assert_eq!(records[0].taxable_value, Decimal::from_str("15000.5").unwrap());
        assert_eq!(records[0].invoice_number.as_deref(), Some("AS/101"));
        assert_eq!(records[0].target_cell_range.to_a1(), "'January 2022'!A8:D8");

        assert_eq!(records[1].gst_type, GstType::Inter);
        assert_eq!(records[1].invoice_number.as_deref(), Some("AS/102"));
        assert_eq!(records[1].target_cell_range.row, 9);
    }

    #[test]
    fn test_skipped_item_does_not_consume_row() {
        let json = r#"{"data":{"docdata":{"b2b":[{"ctin":"A","trdnm":"One","inv":[
            {"inum":"1","items":[{"rt":5,"txval":10},{"rt":0,"txval":3},{"rt":12,"txval":7,"igst":0.84}]}
        ]}]}}}"#;

        let rows: Vec<u32> = Gstr2bRecords::from_slice(json.as_bytes(), &target())
            .unwrap()
            .map(|r| r.target_cell_range.row)
            .collect();
        assert_eq!(rows, vec![8, 9]);
    }

    #[test]
    fn test_igst_decides_type() {
        let json = r#"{"data":{"docdata":{"b2b":[{"ctin":"A","trdnm":"","inv":[
            {"inum":"1","items":[
                {"rt":5,"txval":10,"igst":0},
                {"rt":5,"txval":10,"igst":null},
                {"rt":5,"txval":10},
                {"rt":5,"txval":10,"igst":0.5}
            ]}
        ]}]}}}"#;

        let types: Vec<GstType> = Gstr2bRecords::from_slice(json.as_bytes(), &target())
            .unwrap()
            .map(|r| r.gst_type)
            .collect();
        assert_eq!(types, vec![GstType::Intra, GstType::Intra, GstType::Intra, GstType::Inter]);
    }

    #[test]
    fn test_empty_invoice_lists() {
        let json = r#"{"data":{"docdata":{"b2b":[
            {"ctin":"A","trdnm":"","inv":[]},
            {"ctin":"B","trdnm":"","inv":[{"inum":"1","items":[]}]},
            {"ctin":"C","trdnm":"","inv":[{"inum":"2","items":[{"rt":28,"txval":1}]}]}
        ]}}}"#;

        let mut records = Gstr2bRecords::from_slice(json.as_bytes(), &target()).unwrap();
        let only = records.next().unwrap();
        assert_eq!(only.supplier_id, "C");
        assert!(records.next().is_none());
        assert_eq!(records.stats().seen, 1);
    }

    #[test]
    fn test_missing_key_is_parse_error() {
        let json = r#"{"data":{"docdata":{"b2b":[{"ctin":"A","inv":[]}]}}}"#;
        let result = Gstr2bRecords::from_slice(json.as_bytes(), &target());
        assert!(matches!(result, Err(ParseError::Json(_))));

        let json = r#"{"data":{"docdata":{}}}"#;
        let result = Gstr2bRecords::from_slice(json.as_bytes(), &target());
        assert!(matches!(result, Err(ParseError::Json(_))));
    }

    #[test]
    fn test_item_without_rate_is_parse_error() {
        let json = r#"{"data":{"docdata":{"b2b":[{"ctin":"A","trdnm":"","inv":[
            {"inum":"1","items":[{"txval":10}]}
        ]}]}}}"#;
        assert!(Gstr2bRecords::from_slice(json.as_bytes(), &target()).is_err());
    }
}
