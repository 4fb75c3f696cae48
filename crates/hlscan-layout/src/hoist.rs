use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// What one hoisting pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HoistReport {
    /// Wrapper directories emptied and removed.
    pub removed: usize,
    /// Items that could not be moved, plus wrappers that could not be removed.
    pub errors: usize,
}

/// Find directories under `root` whose name starts with `prefix`.
///
/// A matched wrapper is not descended into, so wrappers nested inside one
/// another only surface the outermost.
pub fn find_wrappers(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            found.push(entry.into_path());
            walker.skip_current_dir();
        }
    }
    found
}

/// Move the contents of every wrapper directory under `root` up into the
/// wrapper's parent, then remove the emptied wrapper.
///
/// Per-item failures are logged and counted; the pass always continues.
pub fn hoist_wrappers(root: &Path, prefix: &str) -> HoistReport {
    let mut report = HoistReport::default();

    for wrapper in find_wrappers(root, prefix) {
        let Some(parent) = wrapper.parent() else {
            continue;
        };
        let children = match std::fs::read_dir(&wrapper) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::error!("failed to read {}: {e}", wrapper.display());
                report.errors += 1;
                continue;
            }
        };

        for child in children.filter_map(|c| c.ok()) {
            let from = child.path();
            let to = parent.join(child.file_name());
            if to.exists() {
                tracing::error!(
                    "failed to move {}: {} already exists",
                    from.display(),
                    to.display()
                );
                report.errors += 1;
                continue;
            }
            if let Err(e) = std::fs::rename(&from, &to) {
                tracing::error!("failed to move {}: {e}", from.display());
                report.errors += 1;
            }
        }

        match std::fs::remove_dir(&wrapper) {
            Ok(()) => {
                tracing::debug!("removed wrapper {}", wrapper.display());
                report.removed += 1;
            }
            Err(e) => {
                tracing::error!("failed to remove directory {}: {e}", wrapper.display());
                report.errors += 1;
            }
        }
    }

    report
}
