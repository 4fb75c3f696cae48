use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hlscan_core::error::HlError;
use hlscan_core::models::processing::{ProcessingRecord, LEDGER_HEADER};

fn csv_err(e: csv::Error) -> HlError {
    HlError::Csv(e.to_string())
}

struct Writers {
    csv: csv::Writer<File>,
    txt: csv::Writer<File>,
}

/// Per-run result ledger: `summary_<ts>.csv` plus its `summary_<ts>.txt`
/// mirror. Shared by all batch threads; appends are serialized.
pub struct Ledger {
    pub csv_path: PathBuf,
    pub txt_path: PathBuf,
    writers: Mutex<Writers>,
}

impl Ledger {
    /// Create both files in `folder` and write their headers.
    pub fn create(folder: &Path, stamp: &str) -> Result<Self, HlError> {
        let csv_path = folder.join(format!("summary_{stamp}.csv"));
        let txt_path = folder.join(format!("summary_{stamp}.txt"));
        let mut writers = Writers {
            csv: csv::Writer::from_path(&csv_path).map_err(csv_err)?,
            txt: csv::Writer::from_path(&txt_path).map_err(csv_err)?,
        };
        for w in [&mut writers.csv, &mut writers.txt] {
            w.write_record(LEDGER_HEADER).map_err(csv_err)?;
            w.flush()?;
        }
        Ok(Self {
            csv_path,
            txt_path,
            writers: Mutex::new(writers),
        })
    }

    /// Append one record to both files and flush.
    pub fn append(&self, record: &ProcessingRecord) -> Result<(), HlError> {
        let row = record.to_row();
        let mut guard = self
            .writers
            .lock()
            .map_err(|_| HlError::Other("ledger lock poisoned".into()))?;
        let writers = &mut *guard;
        for w in [&mut writers.csv, &mut writers.txt] {
            w.write_record(&row).map_err(csv_err)?;
            w.flush()?;
        }
        Ok(())
    }
}

/// Read every record of a CSV ledger.
pub fn read_ledger(path: &Path) -> Result<Vec<ProcessingRecord>, HlError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row: Vec<String> = row.map_err(csv_err)?.iter().map(str::to_string).collect();
        let record = ProcessingRecord::from_row(&row).map_err(|message| HlError::MalformedInput {
            path: path.to_path_buf(),
            line: idx + 2,
            message,
        })?;
        records.push(record);
    }
    Ok(records)
}
