use hlscan_core::config::{Mode, OnboardSettings};

use super::report::print_records;
use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let props = ctx.properties()?;
    let settings = OnboardSettings::from_properties(&props)?;
    ctx.open_run_log(&settings.log_folder, Mode::Onboard)?;

    let summary = hlscan_onboard::run(&settings)?;
    if summary.records.is_empty() {
        println!("No applications listed in {}.", settings.applications_file.display());
    } else {
        print_records(&summary.records);
    }
    println!("Ran {} batch(es)", summary.batches);
    if summary.failed_batches > 0 {
        println!("  {} batch(es) did not complete, see the thread logs", summary.failed_batches);
    }
    if summary.unrecorded > 0 {
        println!("  {} record(s) missing from the ledger", summary.unrecorded);
    }
    println!("  ledger: {}", summary.csv_ledger.display());
    println!("  mirror: {}", summary.txt_ledger.display());
    Ok(())
}
