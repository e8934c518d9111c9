//! The validation run: per-source orchestration of data and harmonic
//! comparisons, with a recoverable-skip policy for individual sources.
//!
//! A [`ValidationRun`] borrows one simulation and any number of observation
//! sources. Each `validate_*` call rebuilds its product from scratch, so
//! repeated invocations are idempotent and sources are processed
//! independently: a recoverable failure on one source skips that source and
//! leaves the others untouched, while any other failure aborts the run.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::aligned::{AlignedLoader, AlignedVariableSet, SeriesLoader, ELEVATION};
use crate::benchmark::{BenchmarkTable, BenchmarkTableBuilder};
use crate::error::{Result, ValidationError};
use crate::harmonic::{
    compute_error, match_constituents, DecompositionOptions, HarmonicCoefficientSet,
    HarmonicErrorTable, HarmonicQuantity, HarmonicSolver, OlsHarmonicSolver,
};
use crate::io::{self, ExportFormat};
use crate::suites::{ComparisonSuiteRunner, SuiteOptions};
use crate::types::{FlowMode, MeasurementSource, SimulationSource};

/// Comparison depth (meters) used when neither the flow mode nor the caller
/// supplies one.
pub const DEFAULT_COMPARISON_DEPTH: f64 = 5.0;

/// Harmonic products for one quantity of one source.
#[derive(Debug)]
pub struct QuantityHarmonics {
    /// Which quantity was decomposed.
    pub quantity: HarmonicQuantity,
    /// Coefficients fitted to the observed series.
    pub observed: HarmonicCoefficientSet,
    /// Coefficients fitted to the simulated series.
    pub simulated: HarmonicCoefficientSet,
    /// Percentage errors for the matched constituents.
    pub errors: HarmonicErrorTable,
    /// Constituents present on only one side (informational).
    pub unmatched: Vec<String>,
}

/// Harmonic products for one observation source.
#[derive(Debug)]
pub struct SourceHarmonics {
    /// Stable per-run label ("meas0", "meas1", ...).
    pub label: String,
    /// Origin identifier of the observation source.
    pub origin: String,
    /// Elevation products, when both sides carry elevation.
    pub elevation: Option<QuantityHarmonics>,
    /// Velocity products, when both sides carry a velocity pair.
    pub velocity: Option<QuantityHarmonics>,
}

/// One validation run of a simulation against a set of observation sources.
pub struct ValidationRun<'a> {
    simulation: &'a SimulationSource,
    sources: Vec<&'a MeasurementSource>,
    flow: FlowMode,
    loader: Box<dyn AlignedLoader>,
    runner: ComparisonSuiteRunner,
    solver: Box<dyn HarmonicSolver>,
    history: Vec<String>,
    benchmarks: Option<BenchmarkTable>,
    harmonics: Vec<SourceHarmonics>,
}

impl<'a> ValidationRun<'a> {
    /// Set up a run for the given simulation and observation sources.
    pub fn new(
        simulation: &'a SimulationSource,
        sources: Vec<&'a MeasurementSource>,
        flow: FlowMode,
    ) -> Self {
        let origins: Vec<&str> = sources.iter().map(|s| s.origin.as_str()).collect();
        let mut run = Self {
            simulation,
            sources,
            flow,
            loader: Box::new(SeriesLoader),
            runner: ComparisonSuiteRunner::default(),
            solver: Box::new(OlsHarmonicSolver),
            history: Vec::new(),
            benchmarks: None,
            harmonics: Vec::new(),
        };
        run.log(format!(
            "Created from [{}] and {}",
            origins.join(", "),
            run.simulation.origin
        ));
        run
    }

    /// Replace the default aligned-set loader.
    pub fn with_loader(mut self, loader: Box<dyn AlignedLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the default comparison-suite runner.
    pub fn with_runner(mut self, runner: ComparisonSuiteRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the default harmonic solver.
    pub fn with_solver(mut self, solver: Box<dyn HarmonicSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// The flow mode selected at construction.
    pub fn flow(&self) -> FlowMode {
        self.flow
    }

    /// Timestamped record of what this run has done so far.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The benchmark table from the most recent `validate_data` call.
    pub fn benchmarks(&self) -> Option<&BenchmarkTable> {
        self.benchmarks.as_ref()
    }

    /// Harmonic products from the most recent `validate_harmonics` call.
    pub fn harmonics(&self) -> &[SourceHarmonics] {
        &self.harmonics
    }

    fn log(&mut self, message: impl Into<String>) {
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        self.history.push(format!("{stamp} - {}", message.into()));
    }

    /// The depth (meters) a comparison will actually use.
    ///
    /// A fixed-depth flow mode wins over the per-call argument; with neither,
    /// [`DEFAULT_COMPARISON_DEPTH`] applies.
    pub fn resolve_depth(&self, requested: Option<f64>) -> f64 {
        self.flow
            .fixed_depth()
            .or(requested)
            .unwrap_or(DEFAULT_COMPARISON_DEPTH)
    }

    /// Compare each observation source against the simulation and rebuild
    /// the benchmark table.
    ///
    /// Sources failing recoverably (no comparator for their kind, or no
    /// shared variables) are skipped with a history note; any other failure
    /// aborts. Zero surviving rows across all sources is
    /// [`ValidationError::NoMatchingMeasurement`].
    #[instrument(skip(self), fields(n_sources = self.sources.len()))]
    pub fn validate_data(&mut self, depth: Option<f64>) -> Result<&BenchmarkTable> {
        let depth = self.resolve_depth(depth);
        let options = SuiteOptions { flow: self.flow };
        let mut table = BenchmarkTable::new();
        let mut skipped = Vec::new();

        for source in &self.sources {
            let aligned = match self.loader.load(source, self.simulation, self.flow) {
                Ok(aligned) => aligned,
                Err(e) if e.is_recoverable() => {
                    warn!(origin = %source.origin, error = %e, "skipping source");
                    skipped.push(format!("Skipped {}: {e}", source.origin));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let suites = match self.runner.run(&aligned, depth, &options) {
                Ok(suites) => suites,
                Err(e) if e.is_recoverable() => {
                    warn!(origin = %source.origin, error = %e, "skipping source");
                    skipped.push(format!("Skipped {}: {e}", source.origin));
                    continue;
                }
                Err(e) => return Err(e),
            };

            table.concat(BenchmarkTableBuilder::build(&aligned, &source.origin, &suites));
        }

        for note in skipped {
            self.log(note);
        }
        if table.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }

        info!(n_rows = table.n_rows(), depth, "benchmark table built");
        self.log(format!(
            "Validated data at {depth} m depth ({} rows)",
            table.n_rows()
        ));
        Ok(self.benchmarks.insert(table))
    }

    /// Decompose, match, and score tidal constituents per source.
    ///
    /// The same skip policy as [`ValidationRun::validate_data`] applies; a
    /// source carrying neither elevation nor a velocity pair on both sides
    /// is also skipped.
    #[instrument(skip(self, options), fields(n_sources = self.sources.len()))]
    pub fn validate_harmonics(
        &mut self,
        options: &DecompositionOptions,
    ) -> Result<&[SourceHarmonics]> {
        let mut harmonics = Vec::new();
        let mut skipped = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            let aligned = match self.loader.load(source, self.simulation, self.flow) {
                Ok(aligned) => aligned,
                Err(e) if e.is_recoverable() => {
                    warn!(origin = %source.origin, error = %e, "skipping source");
                    skipped.push(format!("Skipped {}: {e}", source.origin));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let elevation = self.elevation_harmonics(&aligned, options)?;
            let velocity = self.velocity_harmonics(&aligned, options)?;
            if elevation.is_none() && velocity.is_none() {
                warn!(origin = %source.origin, "no harmonic quantity on both sides; skipping source");
                skipped.push(format!(
                    "Skipped {}: no elevation or velocity pair shared with the simulation",
                    source.origin
                ));
                continue;
            }

            harmonics.push(SourceHarmonics {
                label: format!("meas{i}"),
                origin: source.origin.clone(),
                elevation,
                velocity,
            });
        }

        for note in skipped {
            self.log(note);
        }
        if harmonics.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }

        info!(n_sources = harmonics.len(), "harmonic validation complete");
        self.log(format!(
            "Validated harmonics for {} source(s)",
            harmonics.len()
        ));
        self.harmonics = harmonics;
        Ok(&self.harmonics)
    }

    /// Export everything computed so far under a base path, in the named
    /// format ("csv" or "archive").
    ///
    /// The format string is validated before any file is touched. Returns
    /// the paths written.
    pub fn save_as(&mut self, base: &str, format: &str) -> Result<Vec<PathBuf>> {
        let format: ExportFormat = format.parse()?;
        let paths = match format {
            ExportFormat::Csv => self.save_csv(base)?,
            ExportFormat::Archive => vec![self.save_archive(base)?],
        };
        self.log(format!("Saved {} file(s) under {base}", paths.len()));
        Ok(paths)
    }

    /// Write the benchmark table and all harmonic products as CSV files.
    ///
    /// Per-source harmonic files are disambiguated by the source label, e.g.
    /// `{base}_meas0_el_harmo_error.csv`. With nothing validated yet this is
    /// [`ValidationError::NoMatchingMeasurement`].
    pub fn save_csv(&self, base: &str) -> Result<Vec<PathBuf>> {
        if self.benchmarks.is_none() && self.harmonics.is_empty() {
            return Err(ValidationError::NoMatchingMeasurement);
        }

        let mut paths = Vec::new();
        if let Some(table) = &self.benchmarks {
            paths.push(io::write_benchmark_csv(table, base)?);
        }
        for source in &self.harmonics {
            let source_base = format!("{base}_{}", source.label);
            for quantity in [&source.elevation, &source.velocity].into_iter().flatten() {
                paths.push(io::write_harmonic_error_csv(
                    &quantity.errors,
                    &source_base,
                    quantity.quantity,
                )?);
                paths.push(io::write_coefficient_csv(
                    &quantity.observed,
                    &source_base,
                    io::CoefficientSide::Observed,
                    quantity.quantity,
                )?);
                paths.push(io::write_coefficient_csv(
                    &quantity.simulated,
                    &source_base,
                    io::CoefficientSide::Simulated,
                    quantity.quantity,
                )?);
            }
        }
        Ok(paths)
    }

    /// Write a single JSON archive to `{base}_validation.json`.
    ///
    /// Raw observed and simulated series are snapshotted into the archive
    /// alongside the computed products.
    pub fn save_archive(&self, base: &str) -> Result<PathBuf> {
        let mut record = io::ArchiveRecord::new()
            .with_history(&self.history)
            .with_harmonics(&self.harmonics);
        if let Some(table) = &self.benchmarks {
            record = record.with_benchmarks(table);
        }

        record = record.with_array(
            format!("{}/time", self.simulation.origin),
            io::ArrayField::Owned(self.simulation.time.clone()),
        );
        for (name, values) in &self.simulation.series {
            record = record.with_array(
                format!("{}/{name}", self.simulation.origin),
                io::ArrayField::Owned(values.clone()),
            );
        }
        for source in &self.sources {
            record = record.with_array(
                format!("{}/time", source.origin),
                io::ArrayField::Owned(source.time.clone()),
            );
            for (name, values) in &source.series {
                record = record.with_array(
                    format!("{}/{name}", source.origin),
                    io::ArrayField::Owned(values.clone()),
                );
            }
        }

        record.write(Path::new(&format!("{base}_validation.json")))
    }

    fn elevation_harmonics(
        &self,
        aligned: &AlignedVariableSet,
        options: &DecompositionOptions,
    ) -> Result<Option<QuantityHarmonics>> {
        let (obs, sim) = match (aligned.observed(ELEVATION), aligned.simulated(ELEVATION)) {
            (Some(obs), Some(sim)) => (obs, sim),
            _ => return Ok(None),
        };

        let observed = self.solver.decompose(
            &aligned.observed_time,
            obs,
            None,
            aligned.observed_latitude,
            options,
        )?;
        let simulated = self.solver.decompose(
            &aligned.simulated_time,
            sim,
            None,
            aligned.simulated_latitude,
            options,
        )?;

        self.score(HarmonicQuantity::Elevation, observed, simulated)
            .map(Some)
    }

    fn velocity_harmonics(
        &self,
        aligned: &AlignedVariableSet,
        options: &DecompositionOptions,
    ) -> Result<Option<QuantityHarmonics>> {
        let (u_name, v_name) = match aligned.velocity_pair() {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let (obs_u, obs_v) = match (aligned.observed(u_name), aligned.observed(v_name)) {
            (Some(u), Some(v)) => (u, v),
            _ => return Ok(None),
        };
        let (sim_u, sim_v) = match (aligned.simulated(u_name), aligned.simulated(v_name)) {
            (Some(u), Some(v)) => (u, v),
            _ => return Ok(None),
        };

        let observed = self.solver.decompose(
            &aligned.observed_time,
            obs_u,
            Some(obs_v),
            aligned.observed_latitude,
            options,
        )?;
        let simulated = self.solver.decompose(
            &aligned.simulated_time,
            sim_u,
            Some(sim_v),
            aligned.simulated_latitude,
            options,
        )?;

        self.score(HarmonicQuantity::Velocity, observed, simulated)
            .map(Some)
    }

    fn score(
        &self,
        quantity: HarmonicQuantity,
        observed: HarmonicCoefficientSet,
        simulated: HarmonicCoefficientSet,
    ) -> Result<QuantityHarmonics> {
        let matched = match_constituents(&observed, &simulated);
        let errors = compute_error(&matched, &observed, &simulated, quantity.attributes())?;
        Ok(QuantityHarmonics {
            quantity,
            observed,
            simulated,
            errors,
            unmatched: matched.unmatched,
        })
    }
}
