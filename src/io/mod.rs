//! Export of validation products: CSV tables and JSON archives.

mod archive;
mod csv_export;

pub use archive::{ArchiveRecord, ArrayField, DeferredArray};
pub use csv_export::{
    read_benchmark_csv, write_benchmark_csv, write_coefficient_csv, write_harmonic_error_csv,
    CoefficientSide,
};

use std::str::FromStr;

use crate::error::ValidationError;

/// Supported export formats for [`crate::run::ValidationRun::save_as`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// One CSV file per table.
    Csv,
    /// A single self-contained JSON archive.
    Archive,
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    /// Parse a format name; rejected before any I/O is attempted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "archive" => Ok(Self::Archive),
            other => Err(ValidationError::InvalidExportFormat {
                format: other.to_string(),
            }),
        }
    }
}
