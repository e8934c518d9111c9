//! CSV export (and re-import) of benchmark and harmonic tables.
//!
//! File names are derived from a caller-supplied base path:
//! `{base}_val.csv` for the benchmark table,
//! `{base}_{el|vel}_harmo_error.csv` for harmonic error tables, and
//! `{base}_{obs|sim}_{el|velo}_harmo_coef.csv` for coefficient sets.
//! Scalars are written with `f64`'s shortest round-trip formatting; array
//! cells are `;`-joined; a missing cell is an empty field, never a zero.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::benchmark::BenchmarkTable;
use crate::error::{Result, ValidationError};
use crate::harmonic::{HarmonicCoefficientSet, HarmonicErrorTable, HarmonicQuantity};
use crate::suites::{MetricSuite, MetricValue};

/// Which side of the comparison a coefficient file describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoefficientSide {
    /// Fitted to the observed series.
    Observed,
    /// Fitted to the simulated series.
    Simulated,
}

impl CoefficientSide {
    /// Label used in file names ("obs" / "sim").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Observed => "obs",
            Self::Simulated => "sim",
        }
    }
}

/// Write the benchmark table to `{base}_val.csv`.
pub fn write_benchmark_csv(table: &BenchmarkTable, base: &str) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{base}_val.csv"));
    let mut writer = csv::Writer::from_path(&path)?;

    let mut header = vec!["variable".to_string(), "source".to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![row.variable.clone(), row.source.clone()];
        for column in table.columns() {
            record.push(match row.cell(column) {
                Some(MetricValue::Scalar(v)) => v.to_string(),
                Some(MetricValue::Array(vs)) => vs
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(";"),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), n_rows = table.n_rows(), "benchmark table written");
    Ok(path)
}

/// Read a benchmark table back from a file produced by
/// [`write_benchmark_csv`].
pub fn read_benchmark_csv(path: &Path) -> Result<BenchmarkTable> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.len() < 2 || headers[0] != "variable" || headers[1] != "source" {
        return Err(ValidationError::ParseError {
            path: path.to_path_buf(),
            message: "expected a header starting with \"variable,source\"".to_string(),
        });
    }

    let mut table = BenchmarkTable::new();
    for record in reader.records() {
        let record = record?;
        let variable = record.get(0).unwrap_or("").to_string();
        let source = record.get(1).unwrap_or("").to_string();

        let mut suite = MetricSuite::new();
        for (metric, cell) in headers[2..].iter().zip(record.iter().skip(2)) {
            if cell.is_empty() {
                continue;
            }
            suite.push(metric.clone(), parse_cell(path, metric, cell)?);
        }
        table.push_row(variable, source, &suite);
    }
    Ok(table)
}

fn parse_cell(path: &Path, metric: &str, cell: &str) -> Result<MetricValue> {
    let parse = |s: &str| {
        s.parse::<f64>().map_err(|e| ValidationError::ParseError {
            path: path.to_path_buf(),
            message: format!("bad value \"{s}\" in column \"{metric}\": {e}"),
        })
    };
    if cell.contains(';') {
        let values: Result<Vec<f64>> = cell.split(';').map(parse).collect();
        Ok(MetricValue::Array(values?))
    } else {
        Ok(MetricValue::Scalar(parse(cell)?))
    }
}

/// Write a harmonic error table to `{base}_{el|vel}_harmo_error.csv`.
///
/// Undefined cells (observed value was zero) are written as empty fields.
pub fn write_harmonic_error_csv(
    table: &HarmonicErrorTable,
    base: &str,
    quantity: HarmonicQuantity,
) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{base}_{}_harmo_error.csv", quantity.error_label()));
    let mut writer = csv::Writer::from_path(&path)?;

    let mut header = vec!["constituent".to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for (row, constituent) in table.constituents().iter().enumerate() {
        let mut record = vec![constituent.clone()];
        for col in 0..table.columns().len() {
            record.push(match table.cell(row, col) {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), "harmonic error table written");
    Ok(path)
}

/// Write a coefficient set to `{base}_{obs|sim}_{el|velo}_harmo_coef.csv`.
pub fn write_coefficient_csv(
    set: &HarmonicCoefficientSet,
    base: &str,
    side: CoefficientSide,
    quantity: HarmonicQuantity,
) -> Result<PathBuf> {
    let path = PathBuf::from(format!(
        "{base}_{}_{}_harmo_coef.csv",
        side.label(),
        quantity.coefficient_label()
    ));
    let mut writer = csv::Writer::from_path(&path)?;

    let mut header = vec!["constituent"];
    header.extend(set.attribute_names());
    writer.write_record(&header)?;

    for (i, name) in set.names().iter().enumerate() {
        let mut record = vec![name.clone()];
        for attribute in set.attribute_names() {
            record.push(match set.value(attribute, i) {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), "coefficient set written");
    Ok(path)
}
