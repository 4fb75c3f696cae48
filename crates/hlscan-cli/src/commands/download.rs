use clap::Args;
use comfy_table::Table;
use hlscan_core::config::{DownloadSettings, Mode};
use hlscan_fetch::download::{download_batch, DownloadLogs};
use hlscan_fetch::select::{batch_counts, read_assignments, select_batch};
use hlscan_host::github::GitHubProvider;

use super::Context;

#[derive(Args)]
pub struct DownloadArgs {
    /// Batch identifier, matched as text against the summary's batch column
    #[arg(long, required_unless_present = "list")]
    batch: Option<String>,

    /// List the batches in the summary instead of downloading
    #[arg(long)]
    list: bool,
}

pub async fn run(args: DownloadArgs, ctx: &Context) -> anyhow::Result<()> {
    let props = ctx.properties()?;
    let settings = DownloadSettings::from_properties(&props)?;
    let rows = read_assignments(&settings.github.summary_path())?;

    let batch = match args.batch {
        Some(b) if !args.list => b,
        _ => {
            let mut table = Table::new();
            table.set_header(vec!["BATCH", "REPOS"]);
            for (batch, count) in batch_counts(&rows) {
                let label = if batch.is_empty() { "(none)".to_string() } else { batch };
                table.add_row(vec![label, count.to_string()]);
            }
            println!("{table}");
            return Ok(());
        }
    };

    ctx.open_run_log(&settings.github.logs_dir, Mode::Download)?;
    let selected = select_batch(&rows, &batch);
    if selected.is_empty() {
        println!("No repositories assigned to batch '{batch}'.");
        return Ok(());
    }
    tracing::info!("downloading {} repositories for batch {batch}", selected.len());

    let logs = DownloadLogs::for_batch(&settings.github.logs_dir, &batch)?;
    let provider = GitHubProvider::new(settings.github.api_url.clone(), &settings.github.token)?;
    let summary = download_batch(&provider, &selected, &settings.src_dir, &logs).await?;

    println!(
        "Batch {batch}: {} downloaded | {} skipped | {} empty | {} failed",
        summary.downloaded, summary.skipped, summary.empty, summary.failed
    );
    println!("  status: {}", logs.status.display());
    println!("  timing: {}", logs.timing.display());
    Ok(())
}
