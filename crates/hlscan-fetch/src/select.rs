use std::path::Path;

use hlscan_core::error::HlError;
use hlscan_core::models::repository::{BatchAssignment, DOWNLOAD_URL_COLUMN};

use crate::csv_err;

/// Read the summary rows together with their batch identifiers.
///
/// The batch column is the one headed `batch` (any case); without such a
/// header, the column right after `repo_archive_download_api` is used.
pub fn read_assignments(summary: &Path) -> Result<Vec<BatchAssignment>, HlError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(summary)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let missing = |what: &str| HlError::Csv(format!("{} has no {what} column", summary.display()));
    let name_idx = headers
        .iter()
        .position(|h| h == "name")
        .ok_or_else(|| missing("'name'"))?;
    let url_idx = headers
        .iter()
        .position(|h| h == DOWNLOAD_URL_COLUMN)
        .ok_or_else(|| missing(&format!("'{DOWNLOAD_URL_COLUMN}'")))?;
    let batch_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("batch"))
        .unwrap_or(url_idx + 1);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        rows.push(BatchAssignment {
            repo_name: cell(name_idx),
            download_url: cell(url_idx),
            batch: cell(batch_idx),
        });
    }
    Ok(rows)
}

/// Rows whose batch identifier equals `batch`, compared as text, in order.
pub fn select_batch<'a>(rows: &'a [BatchAssignment], batch: &str) -> Vec<&'a BatchAssignment> {
    rows.iter().filter(|r| r.batch == batch).collect()
}

/// Distinct batch identifiers in first-seen order with their row counts.
pub fn batch_counts(rows: &[BatchAssignment]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in rows {
        match counts.iter_mut().find(|(b, _)| *b == row.batch) {
            Some((_, n)) => *n += 1,
            None => counts.push((row.batch.clone(), 1)),
        }
    }
    counts
}
