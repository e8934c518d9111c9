//! Constituent matching and per-constituent percentage error tables.
//!
//! Two independently produced coefficient sets rarely contain the same
//! constituent list: record lengths differ, so automatic selection keeps
//! different constituents on each side. Matching is by exact name equality,
//! nothing fuzzier; names present on only one side are reported together as
//! an informational list, not an error.

use tracing::warn;

use super::coefficients::HarmonicCoefficientSet;
use crate::error::{Result, ValidationError};

/// One matched constituent: its name and the index it occupies in each set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedPair {
    /// Constituent name (e.g. "M2").
    pub name: String,
    /// Index into the observed set.
    pub observed_index: usize,
    /// Index into the simulated set.
    pub simulated_index: usize,
}

/// Result of matching an observed against a simulated coefficient set.
#[derive(Clone, Debug, Default)]
pub struct MatchedConstituentSet {
    /// Matched constituents, in simulated-set order.
    pub pairs: Vec<MatchedPair>,
    /// Names present on only one side (simulated-side first, then
    /// observed-side), reported informationally.
    pub unmatched: Vec<String>,
}

impl MatchedConstituentSet {
    /// Whether no constituent matched.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Matched constituent names, in reported order.
    pub fn names(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Match constituents by exact name between two coefficient sets.
///
/// For every name in the simulated set, the observed set is scanned for an
/// identical name; the first occurrence wins. Constituent counts are small
/// (tens), so the O(n·m) scan is fine. The matched-pairs set is invariant
/// to the ordering of constituents within either input; only the reported
/// ordering follows the simulated set.
///
/// Duplicate names within one set are kept first-occurrence-wins and warned
/// about rather than silently deduplicated, since a duplicate may be a
/// legitimate second constituent.
pub fn match_constituents(
    observed: &HarmonicCoefficientSet,
    simulated: &HarmonicCoefficientSet,
) -> MatchedConstituentSet {
    warn_duplicates("observed", observed.names());
    warn_duplicates("simulated", simulated.names());

    let mut pairs = Vec::new();
    let mut observed_matched = vec![false; observed.len()];
    let mut simulated_matched = vec![false; simulated.len()];

    for (i_sim, sim_name) in simulated.names().iter().enumerate() {
        if simulated_matched
            .iter()
            .zip(simulated.names())
            .any(|(&m, n)| m && n == sim_name)
        {
            // A duplicate simulated name: the first occurrence already
            // claimed its observed partner.
            continue;
        }
        if let Some(i_obs) = observed.names().iter().position(|n| n == sim_name) {
            pairs.push(MatchedPair {
                name: sim_name.clone(),
                observed_index: i_obs,
                simulated_index: i_sim,
            });
            observed_matched[i_obs] = true;
            simulated_matched[i_sim] = true;
        }
    }

    let mut unmatched: Vec<String> = simulated
        .names()
        .iter()
        .zip(&simulated_matched)
        .filter(|(_, &m)| !m)
        .map(|(n, _)| n.clone())
        .collect();
    unmatched.extend(
        observed
            .names()
            .iter()
            .zip(&observed_matched)
            .filter(|(_, &m)| !m)
            .map(|(n, _)| n.clone()),
    );

    MatchedConstituentSet { pairs, unmatched }
}

fn warn_duplicates(side: &str, names: &[String]) {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            warn!(side, constituent = %name, "duplicate constituent name; first occurrence wins");
        }
    }
}

/// Per-constituent, per-attribute percentage error table.
///
/// Rows are matched constituent names; columns are coefficient attributes;
/// each cell is `abs((observed − simulated) / observed) * 100`. A cell is
/// `None` when the observed value is exactly zero (the relative error is
/// undefined there) — surfaced via [`HarmonicErrorTable::n_undefined`]
/// rather than silently propagated as infinity.
#[derive(Clone, Debug, Default)]
pub struct HarmonicErrorTable {
    constituents: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
    n_undefined: usize,
}

impl HarmonicErrorTable {
    /// Matched constituent names (row labels).
    pub fn constituents(&self) -> &[String] {
        &self.constituents
    }

    /// Attribute names (column labels).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cell value by row and column index.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        *self.cells.get(row)?.get(col)?
    }

    /// Cell value by constituent and attribute name.
    pub fn error(&self, constituent: &str, attribute: &str) -> Option<f64> {
        let row = self.constituents.iter().position(|c| c == constituent)?;
        let col = self.columns.iter().position(|c| c == attribute)?;
        self.cell(row, col)
    }

    /// Number of cells whose error is undefined (observed value was zero).
    pub fn n_undefined(&self) -> usize {
        self.n_undefined
    }

    /// Whether the table has no rows (no matching constituents).
    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }
}

/// Compute the percentage error table for matched constituents.
///
/// Applied independently per requested attribute. An attribute missing from
/// either coefficient set fails with
/// [`ValidationError::MissingHarmonicComponent`] naming the side, so a
/// velocity attribute requested against elevation sets is caught before any
/// arithmetic. An empty match yields an empty table, not an error; callers
/// check [`HarmonicErrorTable::is_empty`] before further processing.
pub fn compute_error(
    matched: &MatchedConstituentSet,
    observed: &HarmonicCoefficientSet,
    simulated: &HarmonicCoefficientSet,
    attributes: &[&str],
) -> Result<HarmonicErrorTable> {
    let mut columns = Vec::with_capacity(attributes.len());
    for &attribute in attributes {
        let obs = observed.attribute(attribute).ok_or_else(|| {
            ValidationError::MissingHarmonicComponent {
                attribute: attribute.to_string(),
                side: "observed",
            }
        })?;
        let sim = simulated.attribute(attribute).ok_or_else(|| {
            ValidationError::MissingHarmonicComponent {
                attribute: attribute.to_string(),
                side: "simulated",
            }
        })?;
        columns.push((attribute, obs, sim));
    }

    let mut cells = Vec::with_capacity(matched.pairs.len());
    let mut n_undefined = 0;

    for pair in &matched.pairs {
        let mut row = Vec::with_capacity(attributes.len());
        for &(attribute, obs, sim) in &columns {
            let a = obs[pair.observed_index];
            let b = sim[pair.simulated_index];

            if a == 0.0 {
                warn!(
                    constituent = %pair.name,
                    attribute,
                    "observed value is zero; relative error undefined"
                );
                n_undefined += 1;
                row.push(None);
                continue;
            }

            let error = ((a - b) / a).abs() * 100.0;
            if error.is_finite() {
                row.push(Some(error));
            } else {
                n_undefined += 1;
                row.push(None);
            }
        }
        cells.push(row);
    }

    Ok(HarmonicErrorTable {
        constituents: matched.pairs.iter().map(|p| p.name.clone()).collect(),
        columns: attributes.iter().map(|a| a.to_string()).collect(),
        cells,
        n_undefined,
    })
}
