//! Tidal harmonic decomposition products, constituent matching, and
//! per-constituent error tables.
//!
//! The decomposition itself is consumed through the [`HarmonicSolver`]
//! trait; a least-squares default is provided. The matching/error logic is
//! the heart of `validate_harmonics`: constituents are matched by exact name
//! between an observed and a simulated coefficient set, and a percentage
//! error is computed per matched constituent and coefficient attribute.

mod coefficients;
mod matcher;
mod solver;

pub use coefficients::{
    DecompositionOptions, HarmonicCoefficientSet, HarmonicQuantity, ELEVATION_ATTRIBUTES,
    VELOCITY_ATTRIBUTES,
};
pub use matcher::{
    compute_error, match_constituents, HarmonicErrorTable, MatchedConstituentSet, MatchedPair,
};
pub use solver::{constituent_period, HarmonicSolver, OlsHarmonicSolver};

use std::f64::consts::PI;

/// Wrap a phase angle in degrees to the range [0, 360).
pub fn wrap_degrees(phase: f64) -> f64 {
    let mut p = phase % 360.0;
    if p < 0.0 {
        p += 360.0;
    }
    p
}

/// Wrap a phase angle in radians to the range [0, 2π).
pub fn wrap_phase(phase: f64) -> f64 {
    let mut p = phase % (2.0 * PI);
    if p < 0.0 {
        p += 2.0 * PI;
    }
    p
}
