mod commands;
mod logging;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "hlscan",
    version,
    about = "Bulk GitHub download, source regrouping and CAST Highlight onboarding"
)]
struct Cli {
    /// Properties file (default: ~/.hlscan/config.properties)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let run_log = logging::init(cli.verbose)?;

    let ctx = commands::Context {
        config: cli.config,
        run_log,
    };
    commands::run(cli.command, &ctx).await
}
