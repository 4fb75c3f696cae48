pub mod download;
pub mod metadata;
pub mod select;
pub mod unzip;

use hlscan_core::error::HlError;

pub(crate) fn csv_err(e: csv::Error) -> HlError {
    HlError::Csv(e.to_string())
}
