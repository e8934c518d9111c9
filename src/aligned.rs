//! Time/space-aligned variable sets for one (observation, simulation) pair.
//!
//! An [`AlignedVariableSet`] is the common structure every comparison routine
//! consumes: the variables present in both the observed and simulated series,
//! on their respective time axes. It is created fresh per source and never
//! stored as shared mutable engine state, so per-source pipeline runs are
//! independent of each other.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::types::{FlowMode, MeasurementKind, MeasurementSource, SimulationSource};

/// Variable names recognized as the eastward velocity component.
pub const U_COMPONENTS: [&str; 2] = ["ua", "u"];

/// Variable names recognized as the northward velocity component.
pub const V_COMPONENTS: [&str; 2] = ["va", "v"];

/// Surface elevation variable name.
pub const ELEVATION: &str = "el";

/// Common time/space-aligned observed and simulated variables for one
/// observation source versus one simulation.
///
/// Invariants (checked on construction):
/// - every common variable is present in both series maps;
/// - each array has the same length as its time axis.
#[derive(Clone, Debug)]
pub struct AlignedVariableSet {
    /// Measurement kind of the observation side.
    pub kind: MeasurementKind,
    /// Whether the simulation side resolves the vertical dimension.
    pub is_3d: bool,
    /// Variables present on both sides, in deterministic (sorted) order.
    pub common_variables: Vec<String>,
    /// Observed timestamps (seconds).
    pub observed_time: Vec<f64>,
    /// Simulated timestamps (seconds).
    pub simulated_time: Vec<f64>,
    /// Observed latitude (degrees North).
    pub observed_latitude: f64,
    /// Simulated latitude (degrees North).
    pub simulated_latitude: f64,
    /// Observed variable arrays, parallel to `observed_time`.
    pub observed_series: BTreeMap<String, Vec<f64>>,
    /// Simulated variable arrays, parallel to `simulated_time`.
    pub simulated_series: BTreeMap<String, Vec<f64>>,
}

impl AlignedVariableSet {
    /// Build an aligned set, validating the length invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: MeasurementKind,
        is_3d: bool,
        observed_time: Vec<f64>,
        simulated_time: Vec<f64>,
        observed_latitude: f64,
        simulated_latitude: f64,
        observed_series: BTreeMap<String, Vec<f64>>,
        simulated_series: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self> {
        check_lengths(&observed_series, observed_time.len())?;
        check_lengths(&simulated_series, simulated_time.len())?;

        // BTreeMap keys are sorted, so the intersection is deterministic
        // regardless of insertion order.
        let common_variables: Vec<String> = observed_series
            .keys()
            .filter(|name| simulated_series.contains_key(*name))
            .cloned()
            .collect();

        debug!(kind = %kind, n_common = common_variables.len(), "aligned variable set built");

        Ok(Self {
            kind,
            is_3d,
            common_variables,
            observed_time,
            simulated_time,
            observed_latitude,
            simulated_latitude,
            observed_series,
            simulated_series,
        })
    }

    /// Whether surface elevation is present on both sides.
    pub fn has_elevation(&self) -> bool {
        self.common_variables.iter().any(|v| v == ELEVATION)
    }

    /// The (u, v) velocity component names present on both sides, if any.
    ///
    /// Depth-averaged names (`ua`/`va`) take precedence over 3D names
    /// (`u`/`v`) when both are available.
    pub fn velocity_pair(&self) -> Option<(&str, &str)> {
        let u = U_COMPONENTS
            .iter()
            .find(|c| self.common_variables.iter().any(|v| v == *c))?;
        let v = V_COMPONENTS
            .iter()
            .find(|c| self.common_variables.iter().any(|v| v == *c))?;
        Some((u, v))
    }

    /// Observed array for a common variable.
    pub fn observed(&self, variable: &str) -> Option<&[f64]> {
        self.observed_series.get(variable).map(Vec::as_slice)
    }

    /// Simulated array for a common variable.
    pub fn simulated(&self, variable: &str) -> Option<&[f64]> {
        self.simulated_series.get(variable).map(Vec::as_slice)
    }
}

fn check_lengths(series: &BTreeMap<String, Vec<f64>>, time_len: usize) -> Result<()> {
    for (name, values) in series {
        if values.len() != time_len {
            return Err(ValidationError::MisalignedSeries {
                variable: name.clone(),
                expected: time_len,
                got: values.len(),
            });
        }
    }
    Ok(())
}

/// Builds the aligned set for one (observation, simulation) pair.
///
/// The loader owns time/space alignment; the validation engine only consumes
/// its output. Implementations interpolate, subset, or slice vertically as
/// the flow mode requires.
pub trait AlignedLoader {
    /// Load and align one observation source against the simulation.
    fn load(
        &self,
        observation: &MeasurementSource,
        simulation: &SimulationSource,
        flow: FlowMode,
    ) -> Result<AlignedVariableSet>;
}

/// Loader for sources whose series already share the simulation's time axis.
///
/// Takes the variables present on both sides verbatim. Fails with
/// [`ValidationError::NoMatchingMeasurement`] when the two sides share no
/// variables, which the aggregator treats as a recoverable per-source skip.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeriesLoader;

impl AlignedLoader for SeriesLoader {
    fn load(
        &self,
        observation: &MeasurementSource,
        simulation: &SimulationSource,
        flow: FlowMode,
    ) -> Result<AlignedVariableSet> {
        // Depth-averaged comparison degrades a 3D simulation to 2D semantics.
        let is_3d = simulation.is_3d && flow != FlowMode::DepthAveraged;

        let set = AlignedVariableSet::new(
            observation.kind,
            is_3d,
            observation.time.clone(),
            simulation.time.clone(),
            observation.latitude,
            simulation.latitude,
            observation.series.clone(),
            simulation.series.clone(),
        )?;

        if set.common_variables.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }
        Ok(set)
    }
}
