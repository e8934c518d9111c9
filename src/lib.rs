//! # tideval
//!
//! A validation engine for coastal hydrodynamic model output.
//!
//! This crate provides the building blocks for scoring a simulation against
//! field measurements:
//! - Kind-based dispatch of observation sources to comparison routines
//! - Benchmark tables of named skill metrics (RMSE, bias, correlation, ...)
//! - Tidal harmonic decomposition, constituent matching, and per-constituent
//!   percentage errors
//! - Multi-source aggregation with per-source recoverable skips
//! - CSV and JSON-archive export with forced materialization of lazy arrays

pub mod aligned;
pub mod benchmark;
pub mod error;
pub mod harmonic;
pub mod io;
pub mod metrics;
pub mod run;
pub mod suites;
pub mod types;

pub use aligned::{AlignedLoader, AlignedVariableSet, SeriesLoader};
pub use benchmark::{BenchmarkRow, BenchmarkTable, BenchmarkTableBuilder};
pub use error::{Result, ValidationError};
pub use harmonic::{
    compute_error, match_constituents, DecompositionOptions, HarmonicCoefficientSet,
    HarmonicErrorTable, HarmonicQuantity, HarmonicSolver, MatchedConstituentSet, MatchedPair,
    OlsHarmonicSolver,
};
pub use io::{
    read_benchmark_csv, write_benchmark_csv, write_coefficient_csv, write_harmonic_error_csv,
    ArchiveRecord, ArrayField, CoefficientSide, DeferredArray, ExportFormat,
};
pub use metrics::{AdcpComparator, ComparisonMetrics, DrifterComparator, TideGaugeComparator};
pub use run::{
    QuantityHarmonics, SourceHarmonics, ValidationRun, DEFAULT_COMPARISON_DEPTH,
};
pub use suites::{
    ComparisonSuiteRunner, MetricSuite, MetricValue, SuiteComparator, SuiteOptions,
};
pub use types::{FlowMode, MeasurementKind, MeasurementSource, SimulationSource};
