use std::path::{Path, PathBuf};

use chrono::Local;
use walkdir::WalkDir;

use hlscan_core::clock::run_stamp;
use hlscan_core::config::LayoutSettings;
use hlscan_core::error::HlError;
use hlscan_core::models::mapping::{sanitize_folder_name, AppRepoMapping};
use hlscan_core::textlog;

use crate::hoist::hoist_wrappers;
use crate::mapping::read_mapping;

/// Counts for one reorganization run.
#[derive(Debug, Default)]
pub struct ReorganizeSummary {
    pub moved: usize,
    pub failed: usize,
    /// Rows without an application.
    pub skipped: usize,
    pub wrappers_removed: usize,
    pub summary_log: PathBuf,
}

/// Read the mapping table and regroup repositories under application
/// folders.
pub fn reorganize(settings: &LayoutSettings) -> Result<ReorganizeSummary, HlError> {
    let rows = read_mapping(&settings.mapping_file)?;
    let summary_log = settings
        .logs_dir
        .join(format!("summary_log_{}.txt", run_stamp(&Local::now())));
    textlog::reset(&summary_log)?;
    let summary = apply_mapping(&rows, settings, summary_log)?;
    tracing::info!(
        "migration process completed: {} moved, {} failed, {} skipped",
        summary.moved,
        summary.failed,
        summary.skipped
    );
    Ok(summary)
}

/// Apply mapping rows in order. Each row appends `app;repo;Passed|Failed`
/// to the summary log, except rows without an application.
pub fn apply_mapping(
    rows: &[AppRepoMapping],
    settings: &LayoutSettings,
    summary_log: PathBuf,
) -> Result<ReorganizeSummary, HlError> {
    let mut summary = ReorganizeSummary {
        summary_log,
        ..Default::default()
    };

    for (idx, row) in rows.iter().enumerate() {
        let Some(app) = row.application.as_deref() else {
            tracing::warn!("skipping row {}: application name is missing", idx + 1);
            summary.skipped += 1;
            continue;
        };
        if row.repo_name.is_empty() {
            tracing::warn!("skipping row {}: repository name is missing", idx + 1);
            summary.skipped += 1;
            continue;
        }

        let app_dir = settings.output_root.join(sanitize_folder_name(app));
        if app_dir.is_dir() {
            tracing::info!("application folder '{app}' already exists");
        } else {
            std::fs::create_dir_all(&app_dir)?;
            tracing::info!("application folder '{app}' created");
        }

        let source = settings.repo_root.join(&row.repo_name);
        let target = app_dir.join(&row.repo_name);
        let passed = if !source.exists() {
            tracing::warn!(
                "repository '{}' does not exist for application '{app}'",
                row.repo_name
            );
            false
        } else if target.exists() {
            tracing::warn!(
                "repository '{}' is already present in application '{app}'",
                row.repo_name
            );
            false
        } else {
            match move_dir(&source, &target) {
                Ok(()) => {
                    tracing::info!(
                        "repository '{}' moved to application folder '{app}'",
                        row.repo_name
                    );
                    let report = hoist_wrappers(&target, &settings.wrapper_prefix);
                    summary.wrappers_removed += report.removed;
                    true
                }
                Err(e) => {
                    tracing::error!("failed to move {}: {e}", source.display());
                    false
                }
            }
        };

        let status = if passed {
            summary.moved += 1;
            "Passed"
        } else {
            summary.failed += 1;
            "Failed"
        };
        textlog::append_line(
            &summary.summary_log,
            &format!("{app};{};{status}", row.repo_name),
        )?;
    }

    Ok(summary)
}

/// Rename `from` to `to`, copying across filesystems when a rename is not
/// possible.
fn move_dir(from: &Path, to: &Path) -> Result<(), HlError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    move_dir_by_copy(from, to)
}

/// Copy `from` to `to`, then remove `from`. A failed copy removes whatever
/// was written under `to` and leaves `from` alone.
fn move_dir_by_copy(from: &Path, to: &Path) -> Result<(), HlError> {
    if let Err(e) = copy_tree(from, to) {
        if let Err(cleanup) = std::fs::remove_dir_all(to) {
            tracing::warn!("could not remove partial copy {}: {cleanup}", to.display());
        }
        return Err(e);
    }
    std::fs::remove_dir_all(from)?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), HlError> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| HlError::Other(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| HlError::Other(e.to_string()))?;
        let dest = to.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Links are recreated as links, pointing at the same target.
#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> Result<(), HlError> {
    std::os::unix::fs::symlink(std::fs::read_link(from)?, to)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_link(from: &Path, to: &Path) -> Result<(), HlError> {
    std::fs::copy(from, to)?;
    Ok(())
}
