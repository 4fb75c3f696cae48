use hlscan_core::config::{GitHubSettings, Mode};
use hlscan_fetch::metadata::fetch_metadata;
use hlscan_host::github::GitHubProvider;

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let props = ctx.properties()?;
    let settings = GitHubSettings::from_properties(&props)?;
    ctx.open_run_log(&settings.logs_dir, Mode::Metadata)?;

    let provider = GitHubProvider::new(settings.api_url.clone(), &settings.token)?;
    let outcome = fetch_metadata(&provider, &settings).await?;

    println!("{} repositories in {}", outcome.repo_count, settings.org);
    println!("  metadata: {}", outcome.metadata_path.display());
    println!("  summary:  {}", outcome.summary_path.display());
    println!("Add a Batch column to the summary before running `hlscan download`.");
    Ok(())
}
