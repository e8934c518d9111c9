//! Error types for the validation engine.
//!
//! The aggregator's partial-failure policy is encoded here: exactly the
//! variants for which [`ValidationError::is_recoverable`] returns `true`
//! cause a single observation source to be skipped during a multi-source
//! run; every other variant aborts the whole run.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::MeasurementKind;

/// Errors produced by the validation pipeline.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No comparison routine is registered for the measurement kind.
    ///
    /// Fatal for a single-source call, recoverable at the aggregator.
    #[error("no comparison routine registered for measurement kind {kind}")]
    UnsupportedMeasurementKind {
        /// The offending kind.
        kind: MeasurementKind,
    },

    /// Aggregation produced zero usable rows across all sources.
    #[error("no matching measurement: zero benchmark rows were produced")]
    NoMatchingMeasurement,

    /// A requested coefficient attribute is absent from one side's
    /// harmonic decomposition.
    ///
    /// Catches schema mismatches (e.g. velocity attributes requested
    /// against an elevation decomposition) before any arithmetic.
    #[error("missing harmonic {attribute} attribute on the {side} side")]
    MissingHarmonicComponent {
        /// Coefficient attribute that was requested (e.g. "A", "Lsmaj").
        attribute: String,
        /// Which side lacks it ("observed" or "simulated").
        side: &'static str,
    },

    /// A field could not be materialized for serialization.
    ///
    /// Fatal; the exporter must not leave a partial file behind.
    #[error("cannot materialize field \"{field}\" for serialization: {reason}")]
    SerializationCapacity {
        /// Name of the field that failed to materialize.
        field: String,
        /// Human-readable cause.
        reason: String,
    },

    /// An unrecognized export format was requested.
    ///
    /// Reported before any I/O is attempted.
    #[error("unrecognized export format \"{format}\" (expected \"csv\" or \"archive\")")]
    InvalidExportFormat {
        /// The requested format string.
        format: String,
    },

    /// A variable's array length disagrees with its time axis.
    #[error("series \"{variable}\" has {got} samples but its time axis has {expected}")]
    MisalignedSeries {
        /// Variable name.
        variable: String,
        /// Length of the time axis.
        expected: usize,
        /// Length of the value array.
        got: usize,
    },

    /// Two series compared point-by-point have different lengths.
    #[error("cannot compare series point-by-point: {observed} observed vs {simulated} simulated samples")]
    SeriesLengthMismatch {
        /// Samples on the observed side.
        observed: usize,
        /// Samples on the simulated side.
        simulated: usize,
    },

    /// A variable's array is empty where data is required.
    #[error("series \"{variable}\" is empty")]
    EmptySeries {
        /// Variable name.
        variable: String,
    },

    /// Too few samples to fit the requested harmonic constituents.
    #[error("not enough samples for harmonic fit: need at least {needed}, got {got}")]
    InsufficientData {
        /// Minimum number of samples required.
        needed: usize,
        /// Number of samples supplied.
        got: usize,
    },

    /// Parse error while re-reading an exported table.
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// File being parsed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying CSV failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ValidationError {
    /// Whether the aggregator may skip the current source and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMeasurementKind { .. } | Self::NoMatchingMeasurement
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let e = ValidationError::UnsupportedMeasurementKind {
            kind: MeasurementKind::Drifter,
        };
        assert!(e.is_recoverable());
        assert!(ValidationError::NoMatchingMeasurement.is_recoverable());
    }

    #[test]
    fn test_fatal_kinds() {
        let e = ValidationError::SerializationCapacity {
            field: "el".into(),
            reason: "backing store unavailable".into(),
        };
        assert!(!e.is_recoverable());

        let e = ValidationError::InvalidExportFormat {
            format: "matlab".into(),
        };
        assert!(!e.is_recoverable());

        // Directly comparing mismatched series is a caller error, not a
        // skippable source condition.
        let e = ValidationError::SeriesLengthMismatch {
            observed: 3,
            simulated: 2,
        };
        assert!(!e.is_recoverable());
        assert!(e.to_string().contains("3 observed"));
        assert!(e.to_string().contains("2 simulated"));
    }

    #[test]
    fn test_error_messages_name_the_offender() {
        let e = ValidationError::UnsupportedMeasurementKind {
            kind: MeasurementKind::Drifter,
        };
        assert!(e.to_string().contains("Drifter"));

        let e = ValidationError::MisalignedSeries {
            variable: "el".into(),
            expected: 100,
            got: 99,
        };
        assert!(e.to_string().contains("el"));
        assert!(e.to_string().contains("99"));
    }
}
