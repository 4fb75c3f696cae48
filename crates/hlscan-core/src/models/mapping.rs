/// Characters replaced with `_` when an application name becomes a folder.
const FORBIDDEN_CHARS: &[char] = &[
    '\\', '/', ':', '*', '?', '"', '<', '>', '|', '(', ')', ',',
];

/// One row of the application/repository mapping sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRepoMapping {
    pub repo_name: String,
    /// `None` when the sheet leaves the application cell blank.
    pub application: Option<String>,
}

impl AppRepoMapping {
    pub fn new(repo_name: impl Into<String>, application: Option<&str>) -> Self {
        Self {
            repo_name: repo_name.into().trim().to_string(),
            application: application
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        }
    }
}

/// Replace characters that are not allowed in directory names.
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
