//! Preview command - show the rows a return file would produce.

use std::path::PathBuf;

use clap::Args;
use console::style;

use gstsync_core::{Extraction, ExtractionStats, InvoiceLineRecord, SheetTarget};

use super::{load_config, resolve_format, FormatArg};

/// Arguments for the preview command.
#[derive(Args)]
pub struct PreviewArgs {
    /// GSTR-2A CSV or GSTR-2B JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Input format (default: from file extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Sheet (tab) name used for ranges
    #[arg(short, long)]
    sheet: Option<String>,

    /// First row
    #[arg(short = 'r', long)]
    start_row: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned table with a summary
    Text,
    /// CSV rows
    Csv,
    /// JSON array of records
    Json,
}

pub fn run(args: PreviewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let format = resolve_format(&args.input, args.format)?;

    let target = SheetTarget::new(
        args.sheet.unwrap_or(config.sheet.sheet_name),
        args.start_row.unwrap_or(config.sheet.start_row),
    );

    let mut extraction = Extraction::open(&args.input, format, &target)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", args.input.display(), e))?;
    let records = extraction.by_ref().collect::<Result<Vec<_>, _>>()?;
    let stats = extraction.stats();

    let output = match args.output {
        OutputFormat::Text => format_text(&records, stats),
        OutputFormat::Csv => format_csv(&records)?,
        OutputFormat::Json => serde_json::to_string_pretty(&records)?,
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }

    Ok(())
}

fn format_text(records: &[InvoiceLineRecord], stats: &ExtractionStats) -> String {
    let mut output = String::new();

    let ranges: Vec<String> = records.iter().map(|r| r.target_cell_range.to_a1()).collect();
    let labels: Vec<String> = records.iter().map(|r| r.display_label()).collect();
    let range_width = ranges.iter().map(|r| r.len()).max().unwrap_or(0).max(5);
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(8);

    output.push_str(&format!(
        "{:<rw$}  {:<lw$}  {:>6}  {:<5}  {:>14}\n",
        "RANGE",
        "SUPPLIER",
        "RATE",
        "TYPE",
        "TAXABLE VALUE",
        rw = range_width,
        lw = label_width
    ));

    for ((record, range), label) in records.iter().zip(&ranges).zip(&labels) {
        let [_, rate, gst_type, value] = record.row_values();
        output.push_str(&format!(
            "{:<rw$}  {:<lw$}  {:>6}  {:<5}  {:>14}\n",
            range,
            label,
            rate,
            gst_type,
            value,
            rw = range_width,
            lw = label_width
        ));
    }

    output.push('\n');
    output.push_str(&format!(
        "{} {} entries, {} rows, {} skipped\n",
        style("ℹ").blue(),
        stats.seen,
        stats.emitted,
        stats.skipped_count()
    ));

    for item in &stats.skipped {
        output.push_str(&format!(
            "  - skipped invoice {} from {} ({}): zero rate\n",
            item.invoice_number, item.supplier_name, item.supplier_id
        ));
    }

    output
}

fn format_csv(records: &[InvoiceLineRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["range", "label", "rate", "type", "taxable_value", "invoice_number"])?;

    for record in records {
        let [label, rate, gst_type, value] = record.row_values();
        wtr.write_record([
            record.target_cell_range.to_a1(),
            label,
            rate,
            gst_type,
            value,
            record.invoice_number.clone().unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
