//! Harmonic coefficient sets and their per-quantity attribute schemas.

use crate::error::{Result, ValidationError};

/// Coefficient attributes for a surface-elevation decomposition, in export
/// column order: amplitude, phase, and their confidence intervals.
pub const ELEVATION_ATTRIBUTES: [&str; 4] = ["A", "g", "A_ci", "g_ci"];

/// Coefficient attributes for a velocity decomposition, in export column
/// order: ellipse semi-major/semi-minor axes, inclination, phase, and their
/// confidence intervals.
pub const VELOCITY_ATTRIBUTES: [&str; 7] = [
    "Lsmaj", "g", "theta_ci", "Lsmin_ci", "Lsmaj_ci", "theta", "g_ci",
];

/// Physical quantity a decomposition describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarmonicQuantity {
    /// Surface elevation (scalar).
    Elevation,
    /// Horizontal velocity (vector; ellipse parameters).
    Velocity,
}

impl HarmonicQuantity {
    /// The coefficient attributes this quantity carries, in column order.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Elevation => &ELEVATION_ATTRIBUTES,
            Self::Velocity => &VELOCITY_ATTRIBUTES,
        }
    }

    /// Label used in export file names ("el" / "velo").
    pub fn coefficient_label(&self) -> &'static str {
        match self {
            Self::Elevation => "el",
            Self::Velocity => "velo",
        }
    }

    /// Label used in error-table file names ("el" / "vel").
    pub fn error_label(&self) -> &'static str {
        match self {
            Self::Elevation => "el",
            Self::Velocity => "vel",
        }
    }
}

/// Fixed analysis options for a harmonic decomposition.
///
/// Defaults follow the standard validation configuration: automatic
/// constituent selection, no trend removal, a minimum Rayleigh separation
/// factor of 0.95, ordinary-least-squares fitting, linear confidence
/// intervals.
#[derive(Clone, Copy, Debug)]
pub struct DecompositionOptions {
    /// Select constituents automatically from the record length.
    pub auto_constituents: bool,
    /// Remove a linear trend before fitting.
    pub trend: bool,
    /// Minimum Rayleigh separation factor for constituent selection.
    pub rayleigh_min: f64,
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            auto_constituents: true,
            trend: false,
            rayleigh_min: 0.95,
        }
    }
}

/// Harmonic coefficients for one (source, quantity) pair.
///
/// A sequence of constituent names plus parallel per-attribute value
/// columns. Immutable once produced by a decomposition call.
#[derive(Clone, Debug, Default)]
pub struct HarmonicCoefficientSet {
    names: Vec<String>,
    attributes: Vec<(String, Vec<f64>)>,
}

impl HarmonicCoefficientSet {
    /// Create a set for the given constituent names.
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            attributes: Vec::new(),
        }
    }

    /// Add a named attribute column parallel to the constituent names.
    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.names.len() {
            return Err(ValidationError::MisalignedSeries {
                variable: name,
                expected: self.names.len(),
                got: values.len(),
            });
        }
        self.attributes.push((name, values));
        Ok(self)
    }

    /// Constituent names, in decomposition order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Attribute names, in column order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Full value column for an attribute.
    pub fn attribute(&self, name: &str) -> Option<&[f64]> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// A single value by attribute name and constituent index.
    pub fn value(&self, attribute: &str, index: usize) -> Option<f64> {
        self.attribute(attribute)?.get(index).copied()
    }

    /// Number of constituents.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set holds no constituents.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
