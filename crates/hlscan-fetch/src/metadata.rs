use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Deserialize;
use serde_json::Value;

use hlscan_core::clock::{format_elapsed, format_instant};
use hlscan_core::config::GitHubSettings;
use hlscan_core::error::HlError;
use hlscan_core::models::repository::{
    derive_download_url, RepoRecord, DOWNLOAD_URL_COLUMN, SUMMARY_COLUMNS,
};
use hlscan_core::textlog;
use hlscan_host::HostProvider;

use crate::csv_err;

/// Files produced by a successful metadata fetch.
#[derive(Debug)]
pub struct MetadataOutcome {
    pub repo_count: usize,
    pub metadata_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Deserialize)]
struct GhRepo {
    id: Option<u64>,
    name: Option<String>,
    default_branch: Option<String>,
    size: Option<u64>,
    updated_at: Option<String>,
    clone_url: Option<String>,
    archive_url: Option<String>,
}

impl From<GhRepo> for RepoRecord {
    fn from(r: GhRepo) -> Self {
        RepoRecord {
            id: r.id.unwrap_or_default(),
            name: r.name.unwrap_or_default(),
            default_branch: r.default_branch.unwrap_or_default(),
            size: r.size.unwrap_or_default(),
            updated_at: r.updated_at,
            clone_url: r.clone_url.unwrap_or_default(),
            archive_url: r.archive_url.unwrap_or_default(),
        }
    }
}

/// Fetch every repository of the organization and write the JSON snapshot,
/// the summary CSV and the fetch log.
///
/// The log always gets start, end and total time plus the outcome. On a
/// failed fetch nothing else is written and the error is returned.
pub async fn fetch_metadata(
    provider: &dyn HostProvider,
    settings: &GitHubSettings,
) -> Result<MetadataOutcome, HlError> {
    std::fs::create_dir_all(&settings.output_dir)?;
    std::fs::create_dir_all(&settings.logs_dir)?;

    let start = Local::now();
    let fetched = provider.list_org_repos(&settings.org).await;
    let persisted = match fetched {
        Ok(repos) => write_snapshot(&repos, &settings.metadata_path()).map(|()| repos),
        Err(e) => Err(e),
    };
    let end = Local::now();

    let message = match &persisted {
        Ok(_) => format!(
            "Metadata for all repositories in organization {} downloaded successfully.",
            settings.org
        ),
        Err(e) => format!("Error: {e}"),
    };

    let log = settings.metadata_log_path();
    textlog::append_line(&log, &format!("Start Time: {}", format_instant(&start)))?;
    textlog::append_line(&log, &format!("End Time: {}", format_instant(&end)))?;
    textlog::append_line(&log, &format!("Total Time Taken: {}", format_elapsed(end - start)))?;
    textlog::append_line(&log, &message)?;

    let repos = persisted.inspect_err(|e| tracing::error!("metadata fetch failed: {e}"))?;
    tracing::info!("{} repositories listed for {}", repos.len(), settings.org);

    let records = records_from_json(&repos)?;
    let summary_path = settings.summary_path();
    write_summary(&records, &summary_path)?;
    derive_download_urls(&summary_path)?;

    Ok(MetadataOutcome {
        repo_count: records.len(),
        metadata_path: settings.metadata_path(),
        summary_path,
    })
}

fn write_snapshot(repos: &[Value], path: &Path) -> Result<(), HlError> {
    let json =
        serde_json::to_string_pretty(repos).map_err(|e| HlError::Serialization(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Project raw repository objects onto the summary columns. One record per
/// object, in input order.
pub fn records_from_json(repos: &[Value]) -> Result<Vec<RepoRecord>, HlError> {
    repos
        .iter()
        .map(|v| {
            serde_json::from_value::<GhRepo>(v.clone())
                .map(RepoRecord::from)
                .map_err(|e| HlError::Serialization(e.to_string()))
        })
        .collect()
}

/// Write the fixed-column summary.
pub fn write_summary(records: &[RepoRecord], path: &Path) -> Result<(), HlError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(SUMMARY_COLUMNS).map_err(csv_err)?;
    for record in records {
        writer.write_record(record.summary_row()).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rewrite the summary in place, adding (or refreshing) the
/// `repo_archive_download_api` column from each row's `archive_url` and
/// `default_branch`. Any extra columns, such as a batch column added by
/// hand, are kept. Returns the number of data rows.
pub fn derive_download_urls(path: &Path) -> Result<usize, HlError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let mut headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| HlError::Csv(format!("{} has no '{name}' column", path.display())))
    };
    let template_idx = column("archive_url")?;
    let branch_idx = column("default_branch")?;
    let url_idx = match headers.iter().position(|h| h == DOWNLOAD_URL_COLUMN) {
        Some(idx) => idx,
        None => {
            headers.push(DOWNLOAD_URL_COLUMN.to_string());
            headers.len() - 1
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        let url = derive_download_url(
            row.get(template_idx).map(String::as_str).unwrap_or_default(),
            row.get(branch_idx).map(String::as_str).unwrap_or_default(),
        );
        if row.len() <= url_idx {
            row.resize(url_idx + 1, String::new());
        }
        row[url_idx] = url;
        rows.push(row);
    }
    drop(reader);

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(&headers).map_err(csv_err)?;
    for row in &rows {
        writer.write_record(row).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeHost;
    use serde_json::json;

    fn gh_repo(id: u64, name: &str, branch: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "default_branch": branch,
            "size": id * 10,
            "updated_at": "2024-03-01T10:00:00Z",
            "clone_url": format!("https://github.com/acme/{name}.git"),
            "archive_url": format!("https://api.github.com/repos/acme/{name}/{{archive_format}}{{/ref}}"),
            "private": true,
        })
    }

    fn settings(root: &Path) -> GitHubSettings {
        GitHubSettings {
            org: "acme".into(),
            token: "t".into(),
            api_url: url::Url::parse("https://api.github.com").unwrap(),
            output_dir: root.join("output"),
            logs_dir: root.join("logs"),
        }
    }

    fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (headers, rows)
    }

    #[tokio::test]
    async fn test_fetch_writes_snapshot_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let host = FakeHost::with_pages(vec![
            vec![gh_repo(1, "sd-foo", "main"), gh_repo(2, "sd-bar", "master")],
            vec![gh_repo(3, "sd-baz", "develop")],
        ]);

        let outcome = fetch_metadata(&host, &settings).await.unwrap();
        assert_eq!(outcome.repo_count, 3);

        let snapshot: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&outcome.metadata_path).unwrap())
                .unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0]["private"], json!(true));

        let (headers, rows) = read_rows(&outcome.summary_path);
        assert_eq!(headers.len(), SUMMARY_COLUMNS.len() + 1);
        assert_eq!(headers.last().unwrap(), DOWNLOAD_URL_COLUMN);
        assert_eq!(rows.len(), snapshot.len());
        assert_eq!(rows[1][1], "sd-bar");
        assert_eq!(
            rows[1][7],
            "https://api.github.com/repos/acme/sd-bar/zipball/master"
        );

        let log = std::fs::read_to_string(settings.metadata_log_path()).unwrap();
        assert!(log.starts_with("Start Time: "));
        assert!(log.contains("Total Time Taken: "));
        assert!(log.contains("organization acme downloaded successfully"));
    }

    #[tokio::test]
    async fn test_fetch_failure_persists_nothing() {
        struct Broken;

        #[async_trait::async_trait]
        impl HostProvider for Broken {
            async fn list_org_repos_page(
                &self,
                _org: &str,
                page: u32,
                _per_page: u32,
            ) -> Result<Vec<Value>, HlError> {
                if page == 1 {
                    Ok(vec![gh_repo(1, "sd-foo", "main")])
                } else {
                    Err(HlError::ApiError {
                        status: 0,
                        message: "connection reset".into(),
                    })
                }
            }

            async fn download_archive(
                &self,
                _url: &str,
            ) -> Result<hlscan_host::ArchiveResponse, HlError> {
                unreachable!()
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        assert!(fetch_metadata(&Broken, &settings).await.is_err());
        assert!(!settings.metadata_path().exists());
        assert!(!settings.summary_path().exists());
        let log = std::fs::read_to_string(settings.metadata_log_path()).unwrap();
        assert!(log.contains("Error: API error (0): connection reset"));
    }

    #[test]
    fn test_derive_download_urls_keeps_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        std::fs::write(
            &path,
            "id,name,default_branch,size,updated_at,clone_url,archive_url,repo_archive_download_api,Batch\n\
             1,sd-foo,main,10,,u,https://api.github.com/repos/acme/sd-foo/{archive_format}{/ref},stale,2\n",
        )
        .unwrap();

        assert_eq!(derive_download_urls(&path).unwrap(), 1);
        let (headers, rows) = read_rows(&path);
        assert_eq!(headers.len(), 9);
        assert_eq!(rows[0][7], "https://api.github.com/repos/acme/sd-foo/zipball/main");
        assert_eq!(rows[0][8], "2");
    }

    #[test]
    fn test_records_from_json_tolerates_nulls() {
        let repos = vec![json!({ "id": 5, "name": "empty-repo", "default_branch": null })];
        let records = records_from_json(&repos).unwrap();
        assert_eq!(records[0].name, "empty-repo");
        assert_eq!(records[0].default_branch, "");
    }
}
