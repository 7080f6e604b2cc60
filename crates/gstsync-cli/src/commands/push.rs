//! Push command - write a return file's line items to the sheet.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use gstsync_core::{
    Delivery, Extraction, ExtractionStats, InvoiceLineRecord, RowWriter, SheetTarget, SheetsClient,
};

use super::{load_config, resolve_format, FormatArg};

/// Arguments for the push command.
#[derive(Args)]
pub struct PushArgs {
    /// GSTR-2A CSV or GSTR-2B JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Input format (default: from file extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Target spreadsheet ID
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Target sheet (tab) name
    #[arg(short, long)]
    sheet: Option<String>,

    /// First row to write
    #[arg(short = 'r', long)]
    start_row: Option<u32>,

    /// Service account key file
    #[arg(short, long)]
    key_file: Option<PathBuf>,

    /// Seconds of backoff to allow per row before giving up
    #[arg(long)]
    deadline: Option<u64>,
}

/// A record whose retries ran out.
struct Undelivered {
    record: InvoiceLineRecord,
    attempts: u32,
    error: String,
}

pub async fn run(args: PushArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    let format = resolve_format(&args.input, args.format)?;

    // Command line wins over the config file
    if let Some(id) = args.spreadsheet_id {
        config.sheet.spreadsheet_id = id;
    }
    if let Some(sheet) = args.sheet {
        config.sheet.sheet_name = sheet;
    }
    if let Some(row) = args.start_row {
        config.sheet.start_row = row;
    }
    if let Some(key_file) = args.key_file {
        config.credentials.key_file = key_file;
    }

    if config.sheet.spreadsheet_id.is_empty() {
        anyhow::bail!(
            "No spreadsheet ID configured. Pass --spreadsheet-id or run \
             'gstsync config set sheet.spreadsheet_id <ID>'."
        );
    }

    let mut policy = config.retry.policy_for(format);
    if let Some(deadline) = args.deadline {
        policy.deadline = deadline;
    }

    let target = SheetTarget::new(&config.sheet.sheet_name, config.sheet.start_row);
    let mut extraction = Extraction::open(&args.input, format, &target)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", args.input.display(), e))?;

    let client = SheetsClient::from_key_file(&config.credentials.key_file)?
        .with_api_base(config.credentials.api_base.clone());
    debug!("Authenticating as {}", client.client_email());

    info!(
        "Pushing {} file {} to sheet '{}' from row {}",
        format,
        args.input.display(),
        target.sheet_name,
        target.start_row
    );

    let writer = RowWriter::new(client, &config.sheet.spreadsheet_id, policy);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut written = 0usize;
    let mut undelivered = Vec::new();
    let mut reported_skips = 0usize;

    while let Some(record) = extraction.next() {
        let record = record?;
        report_skips(&pb, extraction.stats(), &mut reported_skips);

        let range = record.target_cell_range.to_a1();
        pb.set_message(format!("Writing {} ({})", range, record.supplier_id));

        match writer.write(&record).await {
            Delivery::Written {
                updated_cells,
                attempts,
            } => {
                written += 1;
                let retries = if attempts > 1 {
                    format!(" after {} attempts", attempts)
                } else {
                    String::new()
                };
                pb.suspend(|| {
                    println!(
                        "{} {} {} cells updated{}",
                        style("✓").green(),
                        range,
                        updated_cells.unwrap_or_default(),
                        retries
                    )
                });
            }
            Delivery::Exhausted {
                attempts,
                last_error,
                ..
            } => {
                pb.suspend(|| {
                    println!(
                        "{} {} gave up after {} attempts",
                        style("✗").red(),
                        range,
                        attempts
                    )
                });
                undelivered.push(Undelivered {
                    record,
                    attempts,
                    error: last_error,
                });
            }
        }
    }

    // Zero-rated items after the last written record
    report_skips(&pb, extraction.stats(), &mut reported_skips);
    pb.finish_and_clear();

    let stats = extraction.stats();

    println!();
    println!(
        "{} Read {} entries, wrote {} rows in {:?}",
        style("✓").green(),
        stats.seen,
        written,
        start.elapsed()
    );
    println!(
        "   {} skipped (zero rate), {} failed",
        style(stats.skipped_count()).yellow(),
        style(undelivered.len()).red()
    );

    if !stats.skipped.is_empty() {
        println!();
        println!("{}", style("Skipped items:").yellow());
        for item in &stats.skipped {
            println!(
                "  - invoice {} from {} ({})",
                item.invoice_number, item.supplier_name, item.supplier_id
            );
        }
    }

    if !undelivered.is_empty() {
        println!();
        println!("{}", style("Rows not written:").red());
        for failed in &undelivered {
            println!(
                "  - {} {} ({} attempts): {}",
                failed.record.target_cell_range,
                failed.record.display_label().trim_end(),
                failed.attempts,
                failed.error
            );
        }

        anyhow::bail!("{} rows could not be written", undelivered.len());
    }

    Ok(())
}

/// Print a line for each item skipped since the last call.
fn report_skips(pb: &ProgressBar, stats: &ExtractionStats, reported: &mut usize) {
    for item in stats.skipped.iter().skip(*reported) {
        pb.suspend(|| {
            println!(
                "{} invoice {} from {} ({}) is zero-rated, no row used",
                style("-").yellow(),
                item.invoice_number,
                item.supplier_name,
                item.supplier_id
            )
        });
    }
    *reported = stats.skipped.len();
}
