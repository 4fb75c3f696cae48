use hlscan_core::config::{LayoutSettings, Mode};
use hlscan_layout::reorganize::reorganize;

use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let props = ctx.properties()?;
    let settings = LayoutSettings::from_properties(&props)?;
    ctx.open_run_log(&settings.logs_dir, Mode::Reorganize)?;

    let summary = reorganize(&settings)?;
    println!(
        "Moved {} | failed {} | skipped {} | wrappers removed {}",
        summary.moved, summary.failed, summary.skipped, summary.wrappers_removed
    );
    println!("  summary: {}", summary.summary_log.display());
    Ok(())
}
