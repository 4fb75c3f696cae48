use std::path::Path;

use chrono::NaiveDateTime;

use hlscan_core::error::HlError;
use hlscan_core::models::processing::ScanTiming;

/// Scanner log lines start with e.g. `2024-05-01 14:03:59,123`.
const LOG_STAMP_LEN: usize = 23;
const LOG_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
const LEDGER_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Start, end and elapsed minutes from the first and last lines of a
/// scanner log.
pub fn timing_from_log(path: &Path) -> Result<ScanTiming, HlError> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().ok_or_else(|| malformed(path, "log is empty"))?;
    let last = lines.last().unwrap_or(first);

    let start = parse_stamp(first).ok_or_else(|| malformed(path, "no timestamp on first line"))?;
    let end = parse_stamp(last).ok_or_else(|| malformed(path, "no timestamp on last line"))?;

    let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    Ok(ScanTiming {
        start: start.format(LEDGER_FORMAT).to_string(),
        end: end.format(LEDGER_FORMAT).to_string(),
        elapsed_minutes: format_minutes(minutes),
    })
}

/// Like [`timing_from_log`], but an unreadable log is logged and yields
/// empty fields.
pub fn timing_or_unknown(path: &Path) -> ScanTiming {
    timing_from_log(path).unwrap_or_else(|e| {
        tracing::error!("error reading log file {}: {e}", path.display());
        ScanTiming::unknown()
    })
}

fn parse_stamp(line: &str) -> Option<NaiveDateTime> {
    let stamp = line.get(..LOG_STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, LOG_STAMP_FORMAT).ok()
}

/// Minutes rounded to two decimals, keeping at least one.
fn format_minutes(minutes: f64) -> String {
    let rounded = (minutes * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}

fn malformed(path: &Path, message: &str) -> HlError {
    HlError::Scanner {
        message: format!("{}: {message}", path.display()),
    }
}
