use std::path::PathBuf;

/// Header of the CSV ledger and its text mirror.
pub const LEDGER_HEADER: [&str; 7] = [
    "Application Name",
    "Status",
    "Reason",
    "Log File Path",
    "Start Time",
    "End Time",
    "Total Time in Minutes",
];

/// Placeholder written when an application never reached the scanner.
pub const NOT_APPLICABLE: &str = "N/A";

/// Outcome of one application in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStatus::Passed => write!(f, "Passed"),
            ProcessingStatus::Failed => write!(f, "Failed"),
            ProcessingStatus::Skipped => write!(f, "Skipped"),
        }
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Passed" => Ok(ProcessingStatus::Passed),
            "Failed" => Ok(ProcessingStatus::Failed),
            "Skipped" => Ok(ProcessingStatus::Skipped),
            _ => Err(format!("unknown processing status: {s}")),
        }
    }
}

/// Start, end and elapsed minutes of a scan, as shown in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTiming {
    pub start: String,
    pub end: String,
    pub elapsed_minutes: String,
}

impl ScanTiming {
    pub fn not_applicable() -> Self {
        Self {
            start: NOT_APPLICABLE.into(),
            end: NOT_APPLICABLE.into(),
            elapsed_minutes: NOT_APPLICABLE.into(),
        }
    }

    /// Used when the scanner ran but its log could not be read.
    pub fn unknown() -> Self {
        Self {
            start: String::new(),
            end: String::new(),
            elapsed_minutes: String::new(),
        }
    }
}

/// One ledger row. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRecord {
    pub name: String,
    pub status: ProcessingStatus,
    pub reason: String,
    pub log_path: PathBuf,
    pub timing: ScanTiming,
}

impl ProcessingRecord {
    pub fn to_row(&self) -> [String; 7] {
        [
            self.name.clone(),
            self.status.to_string(),
            self.reason.clone(),
            self.log_path.to_string_lossy().to_string(),
            self.timing.start.clone(),
            self.timing.end.clone(),
            self.timing.elapsed_minutes.clone(),
        ]
    }

    /// Rebuild a record from a ledger row, e.g. for reporting.
    pub fn from_row(row: &[String]) -> Result<Self, String> {
        if row.len() != LEDGER_HEADER.len() {
            return Err(format!(
                "expected {} columns, found {}",
                LEDGER_HEADER.len(),
                row.len()
            ));
        }
        Ok(Self {
            name: row[0].clone(),
            status: row[1].parse()?,
            reason: row[2].clone(),
            log_path: PathBuf::from(&row[3]),
            timing: ScanTiming {
                start: row[4].clone(),
                end: row[5].clone(),
                elapsed_minutes: row[6].clone(),
            },
        })
    }
}
