use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::HlError;

/// Append one line to a plain-text log, creating the file if needed.
pub fn append_line(path: &Path, line: &str) -> Result<(), HlError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Create or empty a log file, creating its directory first.
pub fn reset(path: &Path) -> Result<(), HlError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"")?;
    Ok(())
}
