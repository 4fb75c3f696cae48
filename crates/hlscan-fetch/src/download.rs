use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};

use hlscan_core::clock::{format_elapsed, format_instant};
use hlscan_core::error::HlError;
use hlscan_core::models::repository::BatchAssignment;
use hlscan_core::textlog;
use hlscan_host::{ArchiveResponse, HostProvider};

/// Terminal state of one repository download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    /// The zip was already on disk; no request was made.
    Skipped,
    /// The archive downloaded fine but has no entries.
    Empty,
    Failed(String),
}

impl DownloadOutcome {
    /// Text written to the status log.
    pub fn status_text(&self) -> String {
        match self {
            DownloadOutcome::Downloaded => "Successful".to_string(),
            DownloadOutcome::Skipped => "Skipped: ZIP file already exists".to_string(),
            DownloadOutcome::Empty => "Repo is empty".to_string(),
            DownloadOutcome::Failed(reason) => format!("Failed: {reason}"),
        }
    }
}

/// The two per-batch text logs of a download run.
#[derive(Debug, Clone)]
pub struct DownloadLogs {
    pub timing: PathBuf,
    pub status: PathBuf,
}

impl DownloadLogs {
    /// `Timetodownload_<batch>.txt` and `StatusLog_<batch>.txt`, emptied.
    pub fn for_batch(logs_dir: &Path, batch: &str) -> Result<Self, HlError> {
        let logs = Self {
            timing: logs_dir.join(format!("Timetodownload_{batch}.txt")),
            status: logs_dir.join(format!("StatusLog_{batch}.txt")),
        };
        textlog::reset(&logs.timing)?;
        textlog::reset(&logs.status)?;
        Ok(logs)
    }

    fn record_status(&self, name: &str, outcome: &DownloadOutcome) -> Result<(), HlError> {
        textlog::append_line(&self.status, &format!("{name} | {}", outcome.status_text()))
    }

    fn record_timing(
        &self,
        name: &str,
        start: &DateTime<Local>,
        end: &DateTime<Local>,
    ) -> Result<(), HlError> {
        textlog::append_line(
            &self.timing,
            &format!(
                "{name} | {} | {} | {} |",
                format_instant(start),
                format_instant(end),
                format_elapsed(*end - *start)
            ),
        )
    }
}

/// Counts per outcome for one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
}

impl DownloadSummary {
    fn add(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Empty => self.empty += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Where the zip of `name` lives: `<root>/<name>/<name>.zip`.
pub fn zip_path(dest_root: &Path, name: &str) -> PathBuf {
    dest_root.join(name).join(format!("{name}.zip"))
}

/// Download one repository archive.
///
/// An existing zip counts as done and is never re-validated. Every failure
/// is logged and returned as an outcome rather than an error, so one bad
/// repository never stops the batch; only log-file IO errors propagate.
pub async fn download_repo(
    provider: &dyn HostProvider,
    name: &str,
    url: &str,
    dest_root: &Path,
    logs: &DownloadLogs,
) -> Result<DownloadOutcome, HlError> {
    let target = zip_path(dest_root, name);

    if target.exists() {
        tracing::info!("skipping {name}: {} already exists", target.display());
        let outcome = DownloadOutcome::Skipped;
        logs.record_status(name, &outcome)?;
        return Ok(outcome);
    }

    let start = Local::now();
    let outcome = match fetch_to(provider, url, &target).await {
        Ok(outcome) => outcome,
        Err(e) => DownloadOutcome::Failed(e.to_string()),
    };
    let end = Local::now();

    match &outcome {
        DownloadOutcome::Downloaded => {
            tracing::info!("{name} downloaded to {}", target.display())
        }
        DownloadOutcome::Empty => tracing::warn!("{name}: repository is empty"),
        DownloadOutcome::Failed(reason) => tracing::error!("{name}: download failed: {reason}"),
        DownloadOutcome::Skipped => {}
    }

    if outcome != DownloadOutcome::Empty {
        logs.record_timing(name, &start, &end)?;
    }
    logs.record_status(name, &outcome)?;
    Ok(outcome)
}

async fn fetch_to(
    provider: &dyn HostProvider,
    url: &str,
    target: &Path,
) -> Result<DownloadOutcome, HlError> {
    let bytes = match provider.download_archive(url).await? {
        ArchiveResponse::Body(bytes) => bytes,
        ArchiveResponse::Rejected { status } => {
            return Ok(DownloadOutcome::Failed(format!("HTTP {status}")))
        }
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, &bytes)?;

    let archive = zip::ZipArchive::new(File::open(target)?).map_err(|e| HlError::Archive {
        message: format!("{}: {e}", target.display()),
    })?;
    if archive.is_empty() {
        Ok(DownloadOutcome::Empty)
    } else {
        Ok(DownloadOutcome::Downloaded)
    }
}

/// Download every selected repository in order, one at a time.
pub async fn download_batch(
    provider: &dyn HostProvider,
    rows: &[&BatchAssignment],
    dest_root: &Path,
    logs: &DownloadLogs,
) -> Result<DownloadSummary, HlError> {
    let pb = ProgressBar::new(rows.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style);
    }

    let mut summary = DownloadSummary::default();
    for row in rows {
        pb.set_message(row.repo_name.clone());
        let outcome =
            download_repo(provider, &row.repo_name, &row.download_url, dest_root, logs).await?;
        summary.add(&outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(summary)
}
