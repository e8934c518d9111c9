//! JSON archive export of a whole validation run.
//!
//! The archive is a single self-contained document: run history, the
//! benchmark table, per-source harmonic products, and any raw arrays the
//! caller wants preserved. Arrays may be backed by a lazy store (a mapped
//! file, an on-demand reader); every array is materialized in memory before
//! a single byte is written, so a materialization failure can never leave a
//! partial archive behind. The document is written to a temporary sibling
//! and renamed into place for the same reason.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::benchmark::BenchmarkTable;
use crate::error::{Result, ValidationError};
use crate::harmonic::HarmonicCoefficientSet;
use crate::run::{QuantityHarmonics, SourceHarmonics};
use crate::suites::MetricValue;

/// An array whose values live behind a lazy backing store.
pub trait DeferredArray {
    /// Force the full array into memory.
    ///
    /// The error string describes why the backing store could not produce
    /// the values (closed file, exhausted reader, ...).
    fn realize(&self) -> std::result::Result<Vec<f64>, String>;
}

/// A raw array destined for the archive: already in memory, or deferred.
pub enum ArrayField {
    /// Values held in memory.
    Owned(Vec<f64>),
    /// Values produced on demand by a backing store.
    Deferred(Box<dyn DeferredArray>),
}

impl ArrayField {
    /// Materialize the array, naming the field on failure.
    pub fn snapshot(&self, field: &str) -> Result<Vec<f64>> {
        match self {
            Self::Owned(values) => Ok(values.clone()),
            Self::Deferred(backing) => {
                backing
                    .realize()
                    .map_err(|reason| ValidationError::SerializationCapacity {
                        field: field.to_string(),
                        reason,
                    })
            }
        }
    }
}

#[derive(Serialize)]
struct RowDoc {
    variable: String,
    source: String,
    cells: BTreeMap<String, MetricValue>,
}

#[derive(Serialize)]
struct BenchmarkDoc {
    columns: Vec<String>,
    rows: Vec<RowDoc>,
}

impl BenchmarkDoc {
    fn from_table(table: &BenchmarkTable) -> Self {
        let rows = table
            .rows()
            .iter()
            .map(|row| RowDoc {
                variable: row.variable.clone(),
                source: row.source.clone(),
                cells: table
                    .columns()
                    .iter()
                    .filter_map(|c| row.cell(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
            })
            .collect();
        Self {
            columns: table.columns().to_vec(),
            rows,
        }
    }
}

#[derive(Serialize)]
struct CoefficientDoc {
    constituents: Vec<String>,
    attributes: BTreeMap<String, Vec<f64>>,
}

impl CoefficientDoc {
    fn from_set(set: &HarmonicCoefficientSet) -> Self {
        Self {
            constituents: set.names().to_vec(),
            attributes: set
                .attribute_names()
                .into_iter()
                .filter_map(|name| set.attribute(name).map(|v| (name.to_string(), v.to_vec())))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ErrorDoc {
    constituents: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
    n_undefined: usize,
}

#[derive(Serialize)]
struct QuantityDoc {
    observed: CoefficientDoc,
    simulated: CoefficientDoc,
    errors: ErrorDoc,
    unmatched: Vec<String>,
}

impl QuantityDoc {
    fn from_harmonics(q: &QuantityHarmonics) -> Self {
        let n_rows = q.errors.constituents().len();
        let n_cols = q.errors.columns().len();
        let cells = (0..n_rows)
            .map(|row| (0..n_cols).map(|col| q.errors.cell(row, col)).collect())
            .collect();
        Self {
            observed: CoefficientDoc::from_set(&q.observed),
            simulated: CoefficientDoc::from_set(&q.simulated),
            errors: ErrorDoc {
                constituents: q.errors.constituents().to_vec(),
                columns: q.errors.columns().to_vec(),
                cells,
                n_undefined: q.errors.n_undefined(),
            },
            unmatched: q.unmatched.clone(),
        }
    }
}

#[derive(Serialize)]
struct SourceDoc {
    label: String,
    origin: String,
    elevation: Option<QuantityDoc>,
    velocity: Option<QuantityDoc>,
}

#[derive(Serialize)]
struct ArchiveDoc {
    history: Vec<String>,
    benchmarks: Option<BenchmarkDoc>,
    harmonics: Vec<SourceDoc>,
    arrays: BTreeMap<String, Vec<f64>>,
}

/// Everything destined for one archive file.
#[derive(Default)]
pub struct ArchiveRecord {
    history: Vec<String>,
    benchmarks: Option<BenchmarkDoc>,
    harmonics: Vec<SourceDoc>,
    arrays: Vec<(String, ArrayField)>,
}

impl ArchiveRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the run history.
    pub fn with_history(mut self, history: &[String]) -> Self {
        self.history = history.to_vec();
        self
    }

    /// Attach the benchmark table.
    pub fn with_benchmarks(mut self, table: &BenchmarkTable) -> Self {
        self.benchmarks = Some(BenchmarkDoc::from_table(table));
        self
    }

    /// Attach per-source harmonic products.
    pub fn with_harmonics(mut self, harmonics: &[SourceHarmonics]) -> Self {
        self.harmonics = harmonics
            .iter()
            .map(|s| SourceDoc {
                label: s.label.clone(),
                origin: s.origin.clone(),
                elevation: s.elevation.as_ref().map(QuantityDoc::from_harmonics),
                velocity: s.velocity.as_ref().map(QuantityDoc::from_harmonics),
            })
            .collect();
        self
    }

    /// Attach a named raw array, owned or deferred.
    pub fn with_array(mut self, name: impl Into<String>, field: ArrayField) -> Self {
        self.arrays.push((name.into(), field));
        self
    }

    /// Materialize every array and write the archive to `path`.
    ///
    /// Returns the path written. Nothing is written if any array fails to
    /// materialize.
    pub fn write(self, path: &Path) -> Result<PathBuf> {
        let mut arrays = BTreeMap::new();
        for (name, field) in &self.arrays {
            arrays.insert(name.clone(), field.snapshot(name)?);
        }

        let doc = ArchiveDoc {
            history: self.history,
            benchmarks: self.benchmarks,
            harmonics: self.harmonics,
            arrays,
        };
        let json =
            serde_json::to_string_pretty(&doc).map_err(|e| ValidationError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        info!(path = %path.display(), "archive written");
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::MetricSuite;

    struct FailingBacking;

    impl DeferredArray for FailingBacking {
        fn realize(&self) -> std::result::Result<Vec<f64>, String> {
            Err("backing store closed".to_string())
        }
    }

    struct CountingBacking(usize);

    impl DeferredArray for CountingBacking {
        fn realize(&self) -> std::result::Result<Vec<f64>, String> {
            Ok((0..self.0).map(|i| i as f64).collect())
        }
    }

    fn sample_benchmarks() -> BenchmarkTable {
        let mut suite = MetricSuite::new();
        suite.push_scalar("RMSE", 0.1);
        let mut table = BenchmarkTable::new();
        table.push_row("el", "gauge.nc", &suite);
        table
    }

    #[test]
    fn test_archive_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_validation.json");

        let written = ArchiveRecord::new()
            .with_history(&["created".to_string()])
            .with_benchmarks(&sample_benchmarks())
            .with_array("el", ArrayField::Owned(vec![0.0, 0.5]))
            .with_array("time", ArrayField::Deferred(Box::new(CountingBacking(2))))
            .write(&path)
            .unwrap();

        assert_eq!(written, path);
        // No temporary file left behind.
        assert!(!path.with_extension("json.tmp").exists());

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["arrays"]["time"][1], 1.0);
        assert_eq!(doc["benchmarks"]["rows"][0]["variable"], "el");
        assert_eq!(doc["history"][0], "created");
    }

    #[test]
    fn test_materialization_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_validation.json");

        let err = ArchiveRecord::new()
            .with_array("el", ArrayField::Deferred(Box::new(FailingBacking)))
            .write(&path)
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::SerializationCapacity { .. }
        ));
        assert!(err.to_string().contains("el"));
        assert!(!path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_missing_cells_absent_from_document() {
        let mut table = BenchmarkTable::new();
        let mut a = MetricSuite::new();
        a.push_scalar("RMSE", 0.1);
        table.push_row("el", "s", &a);
        let mut b = MetricSuite::new();
        b.push_scalar("bias", 0.2);
        table.push_row("ua", "s", &b);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        ArchiveRecord::new()
            .with_benchmarks(&table)
            .write(&path)
            .unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc["benchmarks"]["rows"][0]["cells"].get("bias").is_none());
        assert!(doc["benchmarks"]["rows"][1]["cells"].get("RMSE").is_none());
    }
}
