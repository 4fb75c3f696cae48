pub mod auth;
pub mod config;
pub mod download;
pub mod metadata;
pub mod onboard;
pub mod reorganize;
pub mod report;
pub mod unzip;

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Subcommand;
use hlscan_auth::{fill_tokens, KeyringStore};
use hlscan_core::clock::run_stamp;
use hlscan_core::config::{Mode, Properties};

use crate::logging::RunLog;

#[derive(Subcommand)]
pub enum Command {
    /// Create or show the properties file
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// Store or remove tokens in the OS keychain
    Auth {
        #[command(subcommand)]
        action: auth::AuthAction,
    },
    /// Fetch repository metadata for the GitHub organization
    Metadata,
    /// Download repository archives for one batch
    Download(download::DownloadArgs),
    /// Extract downloaded archives
    Unzip,
    /// Regroup extracted repositories under application folders
    Reorganize,
    /// Run the Highlight scanner for every listed application
    Onboard,
    /// Show a result ledger from a previous onboarding run
    Report(report::ReportArgs),
}

/// What every command needs from the command line.
pub struct Context {
    pub config: Option<PathBuf>,
    pub run_log: RunLog,
}

impl Context {
    /// Load the properties file and fill blank tokens from the keychain.
    pub fn properties(&self) -> anyhow::Result<Properties> {
        let mut props = Properties::load(self.config.as_deref())?;
        if let Err(e) = fill_tokens(&mut props, &KeyringStore::new()) {
            tracing::warn!("could not read stored tokens: {e}");
        }
        Ok(props)
    }

    /// Start writing this run's log to `<dir>/<mode>_log_<timestamp>.log`.
    pub fn open_run_log(&self, dir: &Path, mode: Mode) -> anyhow::Result<()> {
        let path = dir.join(format!("{mode}_log_{}.log", run_stamp(&Local::now())));
        self.run_log.open(&path)?;
        tracing::info!("logging to {}", path.display());
        Ok(())
    }
}

pub async fn run(cmd: Command, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        Command::Config { action } => config::run(action, ctx),
        Command::Auth { action } => auth::run(action),
        Command::Metadata => metadata::run(ctx).await,
        Command::Download(args) => download::run(args, ctx).await,
        Command::Unzip => unzip::run(ctx),
        Command::Reorganize => reorganize::run(ctx),
        Command::Onboard => onboard::run(ctx),
        Command::Report(args) => report::run(args),
    }
}
