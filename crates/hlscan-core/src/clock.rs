use chrono::{DateTime, Local, TimeDelta};

/// Timestamp used in per-run file names, e.g. `2024-05-01_14-03-59`.
pub fn run_stamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Wall-clock time as written in the text logs.
pub fn format_instant(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Elapsed time as `H:MM:SS.ffffff`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let secs = micros / 1_000_000;
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        micros % 1_000_000
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(TimeDelta::milliseconds(1_500)), "0:00:01.500000");
        assert_eq!(format_elapsed(TimeDelta::seconds(3_725)), "1:02:05.000000");
        assert_eq!(format_elapsed(TimeDelta::seconds(-3)), "0:00:00.000000");
    }

    #[test]
    fn test_run_stamp() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 59).unwrap();
        assert_eq!(run_stamp(&at), "2024-05-01_14-03-59");
        assert_eq!(format_instant(&at), "2024-05-01 14:03:59.000000");
    }
}
