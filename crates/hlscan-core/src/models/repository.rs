/// Columns of the repository summary, in order.
pub const SUMMARY_COLUMNS: &[&str] = &[
    "id",
    "name",
    "default_branch",
    "size",
    "updated_at",
    "clone_url",
    "archive_url",
];

/// Column added to the summary once download URLs are derived.
pub const DOWNLOAD_URL_COLUMN: &str = "repo_archive_download_api";

/// Archive format substituted into GitHub's `archive_url` template.
pub const ARCHIVE_FORMAT: &str = "zipball/";

/// A repository as listed by the organization API.
///
/// Only the summary columns are kept; the full JSON is persisted separately.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoRecord {
    pub id: u64,
    pub name: String,
    pub default_branch: String,
    pub size: u64,
    pub updated_at: Option<String>,
    pub clone_url: String,
    pub archive_url: String,
}

impl RepoRecord {
    /// Summary row in `SUMMARY_COLUMNS` order.
    pub fn summary_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.default_branch.clone(),
            self.size.to_string(),
            self.updated_at.clone().unwrap_or_default(),
            self.clone_url.clone(),
            self.archive_url.clone(),
        ]
    }
}

/// Turn an `archive_url` template such as
/// `https://api.github.com/repos/acme/app/{archive_format}{/ref}` into the
/// concrete zipball URL for `branch`.
pub fn derive_download_url(template: &str, branch: &str) -> String {
    template
        .replace("{archive_format}", ARCHIVE_FORMAT)
        .replace("{/ref}", branch)
}

/// A summary row bound to its externally assigned batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAssignment {
    pub repo_name: String,
    pub download_url: String,
    /// Kept as text; compared literally against the requested batch.
    pub batch: String,
}
