use std::path::Path;

use hlscan_core::error::HlError;
use hlscan_core::models::mapping::AppRepoMapping;

const REPO_COLUMN: &str = "Repo Name";
const APPLICATION_COLUMN: &str = "Application";

/// Read the mapping table: a CSV with `Repo Name` and `Application`
/// columns. Other columns are ignored; a short row leaves the application
/// unset.
pub fn read_mapping(path: &Path) -> Result<Vec<AppRepoMapping>, HlError> {
    let csv_err = |e: csv::Error| HlError::Csv(format!("{}: {e}", path.display()));
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| HlError::Csv(format!("{} has no '{name}' column", path.display())))
    };
    let repo_idx = column(REPO_COLUMN)?;
    let app_idx = column(APPLICATION_COLUMN)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(AppRepoMapping::new(
            record.get(repo_idx).unwrap_or_default(),
            record.get(app_idx),
        ));
    }
    Ok(rows)
}
