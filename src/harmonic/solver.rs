//! Least-squares tidal harmonic decomposition.
//!
//! The signal is modeled as
//!
//! ```text
//! y(t) = y₀ + Σᵢ [Aᵢ cos(ωᵢt) + Bᵢ sin(ωᵢt)]
//! ```
//!
//! and solved as a linear least-squares problem via the normal equations.
//! Amplitude and phase are recovered as Hᵢ = √(Aᵢ² + Bᵢ²),
//! φᵢ = atan2(-Bᵢ, Aᵢ). For vector quantities the two fitted components are
//! combined into tidal ellipse parameters (semi-major/semi-minor axis,
//! inclination, Greenwich phase).
//!
//! Constituent selection is automatic: starting from the standard candidate
//! list, a constituent is retained only when the record is long enough to
//! separate it from every previously retained one under the Rayleigh
//! criterion, scaled by the configured minimum separation factor.

use faer::{linalg::solvers::Solve, Mat};
use tracing::debug;

use super::coefficients::{DecompositionOptions, HarmonicCoefficientSet};
use super::{wrap_degrees, wrap_phase};
use crate::error::{Result, ValidationError};

/// Standard tidal constituents, ordered by typical energy content.
///
/// Periods in seconds.
const CANDIDATE_CONSTITUENTS: [(&str, f64); 8] = [
    ("M2", 12.420_601_2 * 3600.0),
    ("S2", 12.0 * 3600.0),
    ("N2", 12.658_347_51 * 3600.0),
    ("K1", 23.934_472_13 * 3600.0),
    ("O1", 25.819_338_71 * 3600.0),
    ("P1", 24.065_887_66 * 3600.0),
    ("K2", 11.967_236_06 * 3600.0),
    ("Q1", 26.868_350_0 * 3600.0),
];

/// Period in seconds of a named constituent, if known.
pub fn constituent_period(name: &str) -> Option<f64> {
    CANDIDATE_CONSTITUENTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
}

/// Produces a harmonic coefficient set from a time series.
///
/// Implementations take the series, an optional second component (for vector
/// quantities), the station latitude, and fixed analysis options.
pub trait HarmonicSolver {
    /// Decompose a time series into constituent harmonics.
    ///
    /// With `second` present the result carries velocity (ellipse)
    /// attributes; otherwise elevation attributes.
    fn decompose(
        &self,
        times: &[f64],
        values: &[f64],
        second: Option<&[f64]>,
        latitude: f64,
        options: &DecompositionOptions,
    ) -> Result<HarmonicCoefficientSet>;
}

/// Ordinary-least-squares harmonic solver.
///
/// Nodal corrections are not applied; the latitude argument is accepted for
/// interface compatibility with solvers that do apply them.
#[derive(Clone, Copy, Debug, Default)]
pub struct OlsHarmonicSolver;

/// Cosine/sine coefficient pair for one fitted constituent.
#[derive(Clone, Copy, Debug)]
struct FittedComponent {
    a: f64,
    b: f64,
}

struct ComponentFit {
    components: Vec<FittedComponent>,
    /// Residual variance of the fit.
    sigma2: f64,
}

impl OlsHarmonicSolver {
    /// Select constituents the record can separate (Rayleigh criterion).
    fn select_constituents(
        duration: f64,
        options: &DecompositionOptions,
    ) -> Vec<(&'static str, f64)> {
        if !options.auto_constituents {
            return CANDIDATE_CONSTITUENTS.to_vec();
        }

        let mut selected: Vec<(&'static str, f64)> = Vec::new();
        for &(name, period) in &CANDIDATE_CONSTITUENTS {
            let f1 = 1.0 / period;
            let separable = selected.iter().all(|&(_, other)| {
                let df = (f1 - 1.0 / other).abs();
                df > 1e-12 && duration >= options.rayleigh_min / df
            });
            if separable {
                selected.push((name, period));
            }
        }
        selected
    }

    /// Fit cosine/sine coefficients for one scalar component.
    fn fit_component(
        times: &[f64],
        values: &[f64],
        periods: &[f64],
    ) -> Result<ComponentFit> {
        let n_data = times.len();
        let n_constituents = periods.len();
        let n_unknowns = 1 + 2 * n_constituents; // mean + (A, B) per constituent

        if n_data < n_unknowns {
            return Err(ValidationError::InsufficientData {
                needed: n_unknowns,
                got: n_data,
            });
        }

        // Design matrix A = [1, cos(ω₁t), sin(ω₁t), cos(ω₂t), sin(ω₂t), ...]
        let mut a = Mat::<f64>::zeros(n_data, n_unknowns);
        for (i, &t) in times.iter().enumerate() {
            a[(i, 0)] = 1.0; // mean
            for (j, &period) in periods.iter().enumerate() {
                let omega = 2.0 * std::f64::consts::PI / period;
                a[(i, 1 + 2 * j)] = (omega * t).cos();
                a[(i, 2 + 2 * j)] = (omega * t).sin();
            }
        }

        // Normal equations: (A'A) x = A'y
        let mut ata = Mat::<f64>::zeros(n_unknowns, n_unknowns);
        for i in 0..n_unknowns {
            for j in 0..n_unknowns {
                let mut sum = 0.0;
                for k in 0..n_data {
                    sum += a[(k, i)] * a[(k, j)];
                }
                ata[(i, j)] = sum;
            }
        }

        let mut aty = Mat::<f64>::zeros(n_unknowns, 1);
        for i in 0..n_unknowns {
            let mut sum = 0.0;
            for k in 0..n_data {
                sum += a[(k, i)] * values[k];
            }
            aty[(i, 0)] = sum;
        }

        let lu = ata.as_ref().full_piv_lu();
        let x = lu.solve(&aty);

        let mut components = Vec::with_capacity(n_constituents);
        for j in 0..n_constituents {
            components.push(FittedComponent {
                a: x[(1 + 2 * j, 0)],
                b: x[(2 + 2 * j, 0)],
            });
        }

        // Residual variance for the linearized confidence intervals.
        let mut ss_res = 0.0;
        for (i, &t) in times.iter().enumerate() {
            let mut fitted = x[(0, 0)];
            for (j, &period) in periods.iter().enumerate() {
                let omega = 2.0 * std::f64::consts::PI / period;
                fitted += x[(1 + 2 * j, 0)] * (omega * t).cos();
                fitted += x[(2 + 2 * j, 0)] * (omega * t).sin();
            }
            let r = values[i] - fitted;
            ss_res += r * r;
        }
        let sigma2 = if n_data > n_unknowns {
            ss_res / (n_data - n_unknowns) as f64
        } else {
            0.0
        };

        Ok(ComponentFit { components, sigma2 })
    }

    fn check_series(times: &[f64], values: &[f64], label: &str) -> Result<()> {
        if values.is_empty() {
            return Err(ValidationError::EmptySeries {
                variable: label.to_string(),
            });
        }
        if times.len() != values.len() {
            return Err(ValidationError::MisalignedSeries {
                variable: label.to_string(),
                expected: times.len(),
                got: values.len(),
            });
        }
        Ok(())
    }
}

impl HarmonicSolver for OlsHarmonicSolver {
    fn decompose(
        &self,
        times: &[f64],
        values: &[f64],
        second: Option<&[f64]>,
        _latitude: f64,
        options: &DecompositionOptions,
    ) -> Result<HarmonicCoefficientSet> {
        Self::check_series(times, values, "first component")?;
        if let Some(v) = second {
            Self::check_series(times, v, "second component")?;
        }

        let duration = match (times.first(), times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };

        let constituents = Self::select_constituents(duration, options);
        if constituents.is_empty() {
            return Err(ValidationError::InsufficientData { needed: 3, got: times.len() });
        }
        debug!(
            n_constituents = constituents.len(),
            duration_hours = duration / 3600.0,
            "constituents selected"
        );

        let periods: Vec<f64> = constituents.iter().map(|&(_, p)| p).collect();
        let names: Vec<String> = constituents.iter().map(|&(n, _)| n.to_string()).collect();
        let n = times.len() as f64;

        let first = Self::fit_component(times, values, &periods)?;

        match second {
            None => {
                // Elevation: amplitude/phase with linearized confidence bands.
                let se = (2.0 * first.sigma2 / n).sqrt();
                let mut amp = Vec::with_capacity(names.len());
                let mut phase = Vec::with_capacity(names.len());
                let mut amp_ci = Vec::with_capacity(names.len());
                let mut phase_ci = Vec::with_capacity(names.len());

                for c in &first.components {
                    let amplitude = (c.a * c.a + c.b * c.b).sqrt();
                    let g = wrap_phase((-c.b).atan2(c.a)).to_degrees();
                    amp.push(amplitude);
                    phase.push(g);
                    amp_ci.push(1.96 * se);
                    phase_ci.push(if amplitude > 1e-12 {
                        (1.96 * se / amplitude).to_degrees().min(360.0)
                    } else {
                        360.0
                    });
                }

                HarmonicCoefficientSet::new(names)
                    .with_attribute("A", amp)?
                    .with_attribute("g", phase)?
                    .with_attribute("A_ci", amp_ci)?
                    .with_attribute("g_ci", phase_ci)
            }
            Some(v_values) => {
                let second_fit = Self::fit_component(times, v_values, &periods)?;
                let se = (2.0 * (first.sigma2 + second_fit.sigma2) / n).sqrt();

                let mut lsmaj = Vec::with_capacity(names.len());
                let mut lsmin = Vec::with_capacity(names.len());
                let mut theta = Vec::with_capacity(names.len());
                let mut g = Vec::with_capacity(names.len());
                let mut lsmaj_ci = Vec::with_capacity(names.len());
                let mut lsmin_ci = Vec::with_capacity(names.len());
                let mut theta_ci = Vec::with_capacity(names.len());
                let mut g_ci = Vec::with_capacity(names.len());

                for (u, v) in first.components.iter().zip(second_fit.components.iter()) {
                    let e = ellipse_parameters(u, v);
                    lsmaj.push(e.semi_major);
                    lsmin.push(e.semi_minor);
                    theta.push(e.inclination);
                    g.push(e.phase);
                    lsmaj_ci.push(1.96 * se);
                    lsmin_ci.push(1.96 * se);
                    let angular = if e.semi_major > 1e-12 {
                        (1.96 * se / e.semi_major).to_degrees().min(360.0)
                    } else {
                        360.0
                    };
                    theta_ci.push(angular);
                    g_ci.push(angular);
                }

                // Column order matches the velocity export schema.
                HarmonicCoefficientSet::new(names)
                    .with_attribute("Lsmaj", lsmaj)?
                    .with_attribute("g", g)?
                    .with_attribute("theta_ci", theta_ci)?
                    .with_attribute("Lsmin_ci", lsmin_ci)?
                    .with_attribute("Lsmaj_ci", lsmaj_ci)?
                    .with_attribute("theta", theta)?
                    .with_attribute("g_ci", g_ci)
            }
        }
    }
}

struct EllipseParameters {
    semi_major: f64,
    semi_minor: f64,
    /// Inclination in degrees [0, 180).
    inclination: f64,
    /// Greenwich phase in degrees [0, 360).
    phase: f64,
}

/// Convert fitted (u, v) cosine/sine coefficients into tidal ellipse
/// parameters via the rotating-component decomposition.
fn ellipse_parameters(u: &FittedComponent, v: &FittedComponent) -> EllipseParameters {
    // Anticlockwise and clockwise rotating amplitudes.
    let ap = 0.5 * ((u.a + v.b).powi(2) + (v.a - u.b).powi(2)).sqrt();
    let am = 0.5 * ((u.a - v.b).powi(2) + (v.a + u.b).powi(2)).sqrt();
    let epsp = (v.a - u.b).atan2(u.a + v.b);
    let epsm = (v.a + u.b).atan2(u.a - v.b);

    let semi_major = ap + am;
    let semi_minor = ap - am;

    let mut inclination = wrap_degrees(0.5 * (epsm + epsp).to_degrees());
    if inclination >= 180.0 {
        inclination -= 180.0;
    }
    let phase = wrap_degrees(0.5 * (epsm - epsp).to_degrees());

    EllipseParameters {
        semi_major,
        semi_minor,
        inclination,
        phase,
    }
}
