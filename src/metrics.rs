//! Comparison metrics and the default per-kind comparison routines.
//!
//! The metric formulas follow standard skill-assessment practice for
//! hydrodynamic models (NOS/NOAA 2003 standards): RMSE, MAE, bias, Pearson
//! correlation, Murphy skill score, maximum error.
//!
//! The comparators at the bottom of this module are the crate's default
//! implementations of the per-kind comparison-suite interface. Callers with
//! their own statistical routines register replacements on the
//! [`ComparisonSuiteRunner`](crate::suites::ComparisonSuiteRunner).

use crate::aligned::AlignedVariableSet;
use crate::error::{Result, ValidationError};
use crate::suites::{MetricSuite, SuiteComparator, SuiteOptions};
use crate::types::FlowMode;

/// Variance below this is treated as a flat series.
const VAR_FLOOR: f64 = 1e-10;

/// Statistical comparison metrics between two aligned series.
///
/// All metrics treat the first series as the simulation and the second as
/// the observation.
#[derive(Clone, Copy, Debug)]
pub struct ComparisonMetrics {
    /// Root mean square error: sqrt(mean((sim - obs)²))
    pub rmse: f64,
    /// Mean absolute error: mean(|sim - obs|)
    pub mae: f64,
    /// Bias (mean error): mean(sim - obs)
    pub bias: f64,
    /// Pearson correlation coefficient [-1, 1]
    pub correlation: f64,
    /// Murphy skill score: 1 - MSE / Var(obs)
    pub skill_score: f64,
    /// Maximum absolute error: max(|sim - obs|)
    pub max_error: f64,
    /// Number of data points
    pub n_points: usize,
}

impl ComparisonMetrics {
    /// Compare a simulated series against an observed one, point by point.
    ///
    /// The two series must be equally long and non-empty; anything else is
    /// [`ValidationError::SeriesLengthMismatch`] or
    /// [`ValidationError::EmptySeries`]. The default comparators absorb
    /// these by skipping the offending variable, so one incomparable
    /// series never aborts a multi-source run.
    pub fn compute(simulated: &[f64], observed: &[f64]) -> Result<Self> {
        if simulated.len() != observed.len() {
            return Err(ValidationError::SeriesLengthMismatch {
                observed: observed.len(),
                simulated: simulated.len(),
            });
        }
        if observed.is_empty() {
            return Err(ValidationError::EmptySeries {
                variable: "observed".to_string(),
            });
        }

        let n = observed.len() as f64;
        let sim_mean = simulated.iter().sum::<f64>() / n;
        let obs_mean = observed.iter().sum::<f64>() / n;

        let mut sq_err = 0.0;
        let mut abs_err = 0.0;
        let mut err_sum = 0.0;
        let mut max_error: f64 = 0.0;
        let mut sim_var = 0.0;
        let mut obs_var = 0.0;
        let mut covar = 0.0;
        for (&s, &o) in simulated.iter().zip(observed) {
            let e = s - o;
            sq_err += e * e;
            abs_err += e.abs();
            err_sum += e;
            max_error = max_error.max(e.abs());

            let ds = s - sim_mean;
            let dob = o - obs_mean;
            sim_var += ds * ds;
            obs_var += dob * dob;
            covar += ds * dob;
        }
        let mse = sq_err / n;
        sim_var /= n;
        obs_var /= n;
        covar /= n;

        // A flat observed record has no spread to skill-score against, and
        // correlation is undefined when either side is flat.
        let skill_score = if obs_var > VAR_FLOOR {
            1.0 - mse / obs_var
        } else if mse < VAR_FLOOR {
            1.0
        } else {
            f64::NEG_INFINITY
        };
        let correlation = if sim_var > VAR_FLOOR && obs_var > VAR_FLOOR {
            covar / (sim_var * obs_var).sqrt()
        } else if sim_var < VAR_FLOOR && obs_var < VAR_FLOOR {
            1.0
        } else {
            0.0
        };

        Ok(Self {
            rmse: mse.sqrt(),
            mae: abs_err / n,
            bias: err_sum / n,
            correlation,
            skill_score,
            max_error,
            n_points: observed.len(),
        })
    }

    /// Flatten into a metric suite, preserving the standard emission order.
    pub fn to_suite(&self) -> MetricSuite {
        let mut suite = MetricSuite::new();
        suite.push_scalar("RMSE", self.rmse);
        suite.push_scalar("MAE", self.mae);
        suite.push_scalar("bias", self.bias);
        suite.push_scalar("corr", self.correlation);
        suite.push_scalar("skill", self.skill_score);
        suite.push_scalar("max_error", self.max_error);
        suite.push_scalar("n_points", self.n_points as f64);
        suite
    }
}

fn metrics_for(aligned: &AlignedVariableSet, variable: &str) -> Option<ComparisonMetrics> {
    let obs = aligned.observed(variable)?;
    let sim = aligned.simulated(variable)?;
    ComparisonMetrics::compute(sim, obs).ok()
}

fn speed(u: &[f64], v: &[f64]) -> Vec<f64> {
    u.iter()
        .zip(v.iter())
        .map(|(&u, &v)| (u * u + v * v).sqrt())
        .collect()
}

/// Default comparator for tide gauge observations.
///
/// Surface elevation is a scalar surface quantity, so the comparison depth
/// is ignored entirely.
pub struct TideGaugeComparator;

impl SuiteComparator for TideGaugeComparator {
    fn compare(
        &self,
        aligned: &AlignedVariableSet,
        _depth: f64,
        _options: &SuiteOptions,
    ) -> Result<Vec<(String, MetricSuite)>> {
        let mut suites = Vec::new();
        if let Some(metrics) = metrics_for(aligned, crate::aligned::ELEVATION) {
            suites.push((crate::aligned::ELEVATION.to_string(), metrics.to_suite()));
        }
        if suites.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }
        Ok(suites)
    }
}

/// Default comparator for ADCP observations.
///
/// Compares against the simulation's 3D or depth-averaged state depending on
/// the flow mode; the comparison depth is consulted only when the aligned
/// set is 3D and the flow mode is not depth-averaged. A derived speed suite
/// is emitted when both velocity components are present and comparable.
pub struct AdcpComparator;

impl SuiteComparator for AdcpComparator {
    fn compare(
        &self,
        aligned: &AlignedVariableSet,
        depth: f64,
        options: &SuiteOptions,
    ) -> Result<Vec<(String, MetricSuite)>> {
        let three_d = aligned.is_3d && options.flow != FlowMode::DepthAveraged;

        let mut suites = Vec::new();
        for variable in &aligned.common_variables {
            if let Some(metrics) = metrics_for(aligned, variable) {
                let mut suite = metrics.to_suite();
                if three_d {
                    suite.push_scalar("depth", depth);
                }
                suites.push((variable.clone(), suite));
            }
        }

        if let Some((u, v)) = aligned.velocity_pair() {
            let components = (
                aligned.observed(u),
                aligned.observed(v),
                aligned.simulated(u),
                aligned.simulated(v),
            );
            if let (Some(ou), Some(ov), Some(su), Some(sv)) = components {
                let obs_speed = speed(ou, ov);
                let sim_speed = speed(su, sv);
                // Same skip policy as the per-variable path: sides of
                // different lengths drop the derived suite, nothing more.
                if let Ok(metrics) = ComparisonMetrics::compute(&sim_speed, &obs_speed) {
                    let mut suite = metrics.to_suite();
                    if three_d {
                        suite.push_scalar("depth", depth);
                    }
                    suites.push(("speed".to_string(), suite));
                }
            }
        }

        if suites.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }
        Ok(suites)
    }
}

/// Default comparator for drifter observations.
///
/// Drifters measure currents along their track; only velocity components
/// are compared. Both the aligned set's dimensionality and the comparison
/// depth are always consulted.
pub struct DrifterComparator;

impl SuiteComparator for DrifterComparator {
    fn compare(
        &self,
        aligned: &AlignedVariableSet,
        depth: f64,
        _options: &SuiteOptions,
    ) -> Result<Vec<(String, MetricSuite)>> {
        let (u, v) = aligned
            .velocity_pair()
            .ok_or(ValidationError::NoMatchingMeasurement)?;

        let mut suites = Vec::new();
        for variable in [u, v] {
            if let Some(metrics) = metrics_for(aligned, variable) {
                let mut suite = metrics.to_suite();
                if aligned.is_3d {
                    suite.push_scalar("depth", depth);
                }
                suites.push((variable.to_string(), suite));
            }
        }

        if suites.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }
        Ok(suites)
    }
}
