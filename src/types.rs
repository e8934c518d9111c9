//! Core value types: measurement kinds, flow modes, and data sources.
//!
//! Observation and simulation sources are owned by the caller and only
//! borrowed by the validation engine. Both are immutable once loaded.

use std::collections::BTreeMap;
use std::fmt;

/// Kind of field measurement instrument.
///
/// A closed set: adding a new kind is a compile-time-checked addition, and
/// every dispatch site must handle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// Coastal tide gauge recording surface elevation.
    TideGauge,
    /// Acoustic Doppler current profiler recording velocity.
    Adcp,
    /// Lagrangian surface drifter.
    Drifter,
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TideGauge => "TideGauge",
            Self::Adcp => "ADCP",
            Self::Drifter => "Drifter",
        };
        write!(f, "{name}")
    }
}

/// Which vertical slice of a 3D simulation to compare against an observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlowMode {
    /// Use the simulation's native 3D/2D behavior.
    Native,
    /// Surface flow.
    Surface,
    /// Depth-averaged flow.
    DepthAveraged,
    /// Flow at a fixed depth below the surface (meters, non-negative).
    AtDepth(f64),
}

impl FlowMode {
    /// Fixed-depth mode from a depth in meters.
    ///
    /// A negative input is normalized by sign-flip, not rejected.
    pub fn at_depth(depth: f64) -> Self {
        Self::AtDepth(depth.abs())
    }

    /// The fixed depth, if this mode carries one.
    pub fn fixed_depth(&self) -> Option<f64> {
        match self {
            Self::AtDepth(d) => Some(*d),
            _ => None,
        }
    }
}

impl Default for FlowMode {
    fn default() -> Self {
        Self::Native
    }
}

/// One observation source: a measurement instrument and its raw series.
///
/// Immutable once loaded; referenced, not owned, by the engine.
#[derive(Clone, Debug)]
pub struct MeasurementSource {
    /// Instrument kind.
    pub kind: MeasurementKind,
    /// Origin identifier (file, station name, deployment id).
    pub origin: String,
    /// Latitude in degrees North.
    pub latitude: f64,
    /// Ordered timestamps (seconds).
    pub time: Vec<f64>,
    /// Variable name → value array, parallel-indexed to `time`.
    pub series: BTreeMap<String, Vec<f64>>,
}

impl MeasurementSource {
    /// Create a source with an empty series map.
    pub fn new(kind: MeasurementKind, origin: impl Into<String>, latitude: f64) -> Self {
        Self {
            kind,
            origin: origin.into(),
            latitude,
            time: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    /// Set the time axis.
    pub fn with_time(mut self, time: Vec<f64>) -> Self {
        self.time = time;
        self
    }

    /// Add a named variable series.
    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.insert(name.into(), values);
        self
    }
}

/// One hydrodynamic simulation output.
///
/// Read-only and safely shared across all per-source computations.
#[derive(Clone, Debug)]
pub struct SimulationSource {
    /// Origin identifier (output file, run name).
    pub origin: String,
    /// Whether the simulation resolves the vertical dimension.
    pub is_3d: bool,
    /// Latitude in degrees North at the comparison location.
    pub latitude: f64,
    /// Ordered timestamps (seconds).
    pub time: Vec<f64>,
    /// Variable name → value array, parallel-indexed to `time`.
    pub series: BTreeMap<String, Vec<f64>>,
}

impl SimulationSource {
    /// Create a simulation source with an empty series map.
    pub fn new(origin: impl Into<String>, is_3d: bool, latitude: f64) -> Self {
        Self {
            origin: origin.into(),
            is_3d,
            latitude,
            time: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    /// Set the time axis.
    pub fn with_time(mut self, time: Vec<f64>) -> Self {
        self.time = time;
        self
    }

    /// Add a named variable series.
    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.insert(name.into(), values);
        self
    }
}
