use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;

use hlscan_core::clock::{format_elapsed, format_instant, run_stamp};
use hlscan_core::config::UnzipSettings;
use hlscan_core::error::HlError;
use hlscan_core::textlog;

use crate::download::zip_path;

#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub execution_log: PathBuf,
    pub timing_log: PathBuf,
}

/// Extract `<src>/<name>/<name>.zip` for every repository folder under
/// `SRC_DIR` into `<UNZIP_DIR>/<name>/`.
pub fn extract_all(settings: &UnzipSettings) -> Result<ExtractSummary, HlError> {
    let stamp = run_stamp(&Local::now());
    let mut summary = ExtractSummary {
        execution_log: settings.logs_dir.join(format!("Unzip_Execution{stamp}.log")),
        timing_log: settings.logs_dir.join(format!("Unzip_Time{stamp}.log")),
        ..Default::default()
    };
    textlog::reset(&summary.execution_log)?;
    textlog::reset(&summary.timing_log)?;
    std::fs::create_dir_all(&settings.unzip_dir)?;

    let mut names: Vec<String> = std::fs::read_dir(&settings.src_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    for name in names {
        let archive = zip_path(&settings.src_dir, &name);
        if !archive.is_file() {
            tracing::debug!("{name}: no archive at {}", archive.display());
            continue;
        }
        let dest = settings.unzip_dir.join(&name);
        if dest.exists() {
            summary.skipped += 1;
            textlog::append_line(
                &summary.execution_log,
                &format!("{name} | Skipped: already extracted"),
            )?;
            continue;
        }

        let start = Local::now();
        let result = extract_one(&archive, &dest);
        let end = Local::now();

        let status = match result {
            Ok(()) => {
                summary.extracted += 1;
                tracing::info!("{name} extracted to {}", dest.display());
                "Extracted".to_string()
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("{name}: extraction failed: {e}");
                format!("Failed: {e}")
            }
        };
        textlog::append_line(&summary.execution_log, &format!("{name} | {status}"))?;
        textlog::append_line(
            &summary.timing_log,
            &format!(
                "{name} | {} | {} | {} |",
                format_instant(&start),
                format_instant(&end),
                format_elapsed(end - start)
            ),
        )?;
    }

    Ok(summary)
}

/// Unpack one archive. A partially written destination is removed.
pub fn extract_one(archive: &Path, dest: &Path) -> Result<(), HlError> {
    let result = File::open(archive)
        .map_err(HlError::from)
        .and_then(|file| {
            zip::ZipArchive::new(file).map_err(|e| HlError::Archive {
                message: format!("{}: {e}", archive.display()),
            })
        })
        .and_then(|mut zip| {
            std::fs::create_dir_all(dest)?;
            zip.extract(dest).map_err(|e| HlError::Archive {
                message: format!("{}: {e}", archive.display()),
            })
        });
    if result.is_err() && dest.exists() {
        if let Err(e) = std::fs::remove_dir_all(dest) {
            tracing::warn!("could not remove partial extraction {}: {e}", dest.display());
        }
    }
    result
}
