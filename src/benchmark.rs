//! Benchmark tables: the flattened, tabular form of metric suites.
//!
//! Rows are variables (row labels may repeat, e.g. one row per depth bin or
//! per observation source); columns are the union of all metric names seen so
//! far, in first-seen emission order. A metric missing for a given row is an
//! explicit missing cell, never a zero.

use std::collections::HashMap;
use std::fmt;

use crate::aligned::AlignedVariableSet;
use crate::suites::{MetricSuite, MetricValue};

/// One row of a benchmark table.
#[derive(Clone, Debug)]
pub struct BenchmarkRow {
    /// Variable name this row describes (not unique across the table).
    pub variable: String,
    /// Origin identifier of the observation source that produced the row.
    pub source: String,
    cells: HashMap<String, MetricValue>,
}

impl BenchmarkRow {
    /// Value of a metric for this row, if present.
    pub fn cell(&self, metric: &str) -> Option<&MetricValue> {
        self.cells.get(metric)
    }
}

/// Row-indexed table of benchmark metrics.
///
/// Append-only within one validation pass; rebuilt from scratch by each new
/// `validate_data` invocation.
#[derive(Clone, Debug, Default)]
pub struct BenchmarkTable {
    columns: Vec<String>,
    rows: Vec<BenchmarkRow>,
}

impl BenchmarkTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metric names, in first-seen emission order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in insertion order.
    pub fn rows(&self) -> &[BenchmarkRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one row built from a metric suite.
    ///
    /// New metric names extend the column set in the suite's emission order;
    /// duplicate row labels are preserved, not merged.
    pub fn push_row(&mut self, variable: impl Into<String>, source: impl Into<String>, suite: &MetricSuite) {
        let mut cells = HashMap::with_capacity(suite.len());
        for (name, value) in suite.iter() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.to_string());
            }
            cells.insert(name.to_string(), value.clone());
        }
        self.rows.push(BenchmarkRow {
            variable: variable.into(),
            source: source.into(),
            cells,
        });
    }

    /// Append all rows of another table, merging its columns.
    pub fn concat(&mut self, other: BenchmarkTable) {
        for column in other.columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }
}

impl fmt::Display for BenchmarkTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable\tsource")?;
        for column in &self.columns {
            write!(f, "\t{column}")?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{}\t{}", row.variable, row.source)?;
            for column in &self.columns {
                match row.cell(column) {
                    Some(MetricValue::Scalar(v)) => write!(f, "\t{v:.4}")?,
                    Some(MetricValue::Array(vs)) => write!(f, "\t[{} values]", vs.len())?,
                    None => write!(f, "\t-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Flattens the metric suites of one source into a benchmark table.
pub struct BenchmarkTableBuilder;

impl BenchmarkTableBuilder {
    /// Build a table from one source's suites.
    ///
    /// One row per suite entry; provenance (the observation origin) is
    /// carried on every row.
    pub fn build(
        aligned: &AlignedVariableSet,
        source_origin: &str,
        suites: &[(String, MetricSuite)],
    ) -> BenchmarkTable {
        let _ = aligned; // row shape depends only on the suites themselves
        let mut table = BenchmarkTable::new();
        for (variable, suite) in suites {
            table.push_row(variable.clone(), source_origin, suite);
        }
        table
    }
}
