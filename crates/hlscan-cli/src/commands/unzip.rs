use hlscan_core::config::{Mode, UnzipSettings};
use hlscan_fetch::unzip::extract_all;

use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let props = ctx.properties()?;
    let settings = UnzipSettings::from_properties(&props)?;
    ctx.open_run_log(&settings.logs_dir, Mode::Unzip)?;

    let summary = extract_all(&settings)?;
    println!(
        "Extracted {} | skipped {} | failed {}",
        summary.extracted, summary.skipped, summary.failed
    );
    println!("  log: {}", summary.execution_log.display());
    Ok(())
}
