use std::path::Path;

use hlscan_core::error::HlError;
use hlscan_core::models::application::Application;

/// Read the application list: a header line, then one `name;id` per line.
/// Blank lines are ignored; fields past the second are ignored.
pub fn read_applications(path: &Path) -> Result<Vec<Application>, HlError> {
    let content = std::fs::read_to_string(path)?;
    parse_applications(&content, path)
}

fn parse_applications(content: &str, path: &Path) -> Result<Vec<Application>, HlError> {
    let mut apps = Vec::new();
    for (idx, line) in content.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(';').map(str::trim);
        match (fields.next(), fields.next()) {
            (Some(name), Some(id)) if !name.is_empty() && !id.is_empty() => {
                apps.push(Application::new(name, id))
            }
            _ => {
                return Err(HlError::MalformedInput {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: format!("expected 'name;id', got '{line}'"),
                })
            }
        }
    }
    Ok(apps)
}

/// Fail when an application identifier appears more than once. Each
/// duplicated identifier is reported once.
pub fn check_duplicates(apps: &[Application]) -> Result<(), HlError> {
    let mut seen = std::collections::HashSet::new();
    let mut dups: Vec<String> = Vec::new();
    for app in apps {
        if !seen.insert(app.id.as_str()) && !dups.contains(&app.id) {
            dups.push(app.id.clone());
        }
    }
    if dups.is_empty() {
        Ok(())
    } else {
        for id in &dups {
            tracing::error!("duplicate application ID - {id}");
        }
        Err(HlError::DuplicateAppIds { ids: dups })
    }
}
