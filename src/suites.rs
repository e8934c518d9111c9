//! Metric suites and kind-based dispatch to comparison routines.
//!
//! A [`MetricSuite`] is the normalized output of one comparison routine call:
//! an ordered collection of named benchmark values for one variable. The
//! [`ComparisonSuiteRunner`] dispatches an aligned variable set to the
//! comparator registered for its measurement kind and passes suite contents
//! through uninterpreted.

use serde::Serialize;
use tracing::debug;

use crate::aligned::AlignedVariableSet;
use crate::error::{Result, ValidationError};
use crate::types::{FlowMode, MeasurementKind};

/// A benchmark value: a scalar or a small array (e.g. per-depth-bin).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum MetricValue {
    /// Single scalar metric.
    Scalar(f64),
    /// Small array metric.
    Array(Vec<f64>),
}

impl MetricValue {
    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Array(_) => None,
        }
    }
}

/// Ordered collection of named benchmark metrics for one variable.
///
/// Insertion order is the comparison routine's emission order and is
/// preserved all the way into the benchmark table's column ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricSuite {
    entries: Vec<(String, MetricValue)>,
}

impl MetricSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named metric, preserving emission order.
    pub fn push(&mut self, name: impl Into<String>, value: MetricValue) {
        self.entries.push((name.into(), value));
    }

    /// Append a scalar metric.
    pub fn push_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.push(name, MetricValue::Scalar(value));
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate metrics in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the suite holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Options forwarded to comparison routines.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuiteOptions {
    /// Flow mode selected for this validation run.
    pub flow: FlowMode,
}

/// A type-specific comparison routine.
///
/// Given an aligned variable set (plus the resolved comparison depth and
/// options), produces one metric suite per evaluated variable, named by that
/// variable. The suite contents are opaque to the dispatcher.
pub trait SuiteComparator {
    /// Compare observed against simulated series.
    fn compare(
        &self,
        aligned: &AlignedVariableSet,
        depth: f64,
        options: &SuiteOptions,
    ) -> Result<Vec<(String, MetricSuite)>>;
}

/// Dispatches aligned variable sets to the comparator registered for their
/// measurement kind.
///
/// One slot per [`MeasurementKind`] variant; a kind with no registered
/// comparator fails with [`ValidationError::UnsupportedMeasurementKind`],
/// which is recoverable at the aggregator level.
pub struct ComparisonSuiteRunner {
    tide_gauge: Option<Box<dyn SuiteComparator>>,
    adcp: Option<Box<dyn SuiteComparator>>,
    drifter: Option<Box<dyn SuiteComparator>>,
}

impl ComparisonSuiteRunner {
    /// Runner with no registered comparators.
    pub fn empty() -> Self {
        Self {
            tide_gauge: None,
            adcp: None,
            drifter: None,
        }
    }

    /// Register a comparator for a kind, replacing any existing one.
    pub fn with_comparator(
        mut self,
        kind: MeasurementKind,
        comparator: Box<dyn SuiteComparator>,
    ) -> Self {
        *self.slot(kind) = Some(comparator);
        self
    }

    /// Deregister the comparator for a kind.
    pub fn without_comparator(mut self, kind: MeasurementKind) -> Self {
        *self.slot(kind) = None;
        self
    }

    fn slot(&mut self, kind: MeasurementKind) -> &mut Option<Box<dyn SuiteComparator>> {
        match kind {
            MeasurementKind::TideGauge => &mut self.tide_gauge,
            MeasurementKind::Adcp => &mut self.adcp,
            MeasurementKind::Drifter => &mut self.drifter,
        }
    }

    /// Run the comparator registered for `aligned.kind`.
    ///
    /// Returns one suite per evaluated variable, in the comparator's
    /// emission order.
    pub fn run(
        &self,
        aligned: &AlignedVariableSet,
        depth: f64,
        options: &SuiteOptions,
    ) -> Result<Vec<(String, MetricSuite)>> {
        let comparator = match aligned.kind {
            MeasurementKind::TideGauge => self.tide_gauge.as_deref(),
            MeasurementKind::Adcp => self.adcp.as_deref(),
            MeasurementKind::Drifter => self.drifter.as_deref(),
        };

        let comparator = comparator.ok_or(ValidationError::UnsupportedMeasurementKind {
            kind: aligned.kind,
        })?;

        let suites = comparator.compare(aligned, depth, options)?;
        debug!(kind = %aligned.kind, n_suites = suites.len(), "comparison suites computed");
        Ok(suites)
    }
}

impl Default for ComparisonSuiteRunner {
    /// Runner with the crate's default comparator for every kind.
    fn default() -> Self {
        Self {
            tide_gauge: Some(Box::new(crate::metrics::TideGaugeComparator)),
            adcp: Some(Box::new(crate::metrics::AdcpComparator)),
            drifter: Some(Box::new(crate::metrics::DrifterComparator)),
        }
    }
}
