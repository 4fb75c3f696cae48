use std::path::PathBuf;

use clap::Args;
use comfy_table::{Cell, Color, Table};
use hlscan_core::models::processing::{ProcessingRecord, ProcessingStatus};
use hlscan_onboard::ledger::read_ledger;

#[derive(Args)]
pub struct ReportArgs {
    /// CSV ledger written by `hlscan onboard`
    ledger: PathBuf,
}

pub fn run(args: ReportArgs) -> anyhow::Result<()> {
    let records = read_ledger(&args.ledger)?;
    if records.is_empty() {
        println!("Ledger {} has no records.", args.ledger.display());
        return Ok(());
    }
    print_records(&records);
    Ok(())
}

/// Print records as a table followed by status totals.
pub fn print_records(records: &[ProcessingRecord]) {
    let mut table = Table::new();
    table.set_header(vec!["APPLICATION", "STATUS", "REASON", "START", "END", "MINUTES"]);

    for r in records {
        let color = match r.status {
            ProcessingStatus::Passed => Color::Green,
            ProcessingStatus::Failed => Color::Red,
            ProcessingStatus::Skipped => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(r.status.to_string()).fg(color),
            Cell::new(&r.reason),
            Cell::new(&r.timing.start),
            Cell::new(&r.timing.end),
            Cell::new(&r.timing.elapsed_minutes),
        ]);
    }

    let count = |s: ProcessingStatus| records.iter().filter(|r| r.status == s).count();
    println!("{table}");
    println!(
        "Summary: {} passed | {} failed | {} skipped",
        count(ProcessingStatus::Passed),
        count(ProcessingStatus::Failed),
        count(ProcessingStatus::Skipped)
    );
}
