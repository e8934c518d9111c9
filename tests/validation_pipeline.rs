//! Integration tests for the full validation pipeline.
//!
//! Exercises the workflow from synthetic observation and simulation series
//! through benchmark tables, harmonic products, and export files.

use std::f64::consts::PI;

use tideval::{
    read_benchmark_csv, ComparisonSuiteRunner, DecompositionOptions, FlowMode, MeasurementKind,
    MeasurementSource, MetricValue, SimulationSource, ValidationError, ValidationRun,
};

/// M2 tidal period in seconds (~12.42 hours).
const M2_PERIOD: f64 = 12.4206012 * 3600.0;

/// S2 tidal period in seconds (12.00 hours).
const S2_PERIOD: f64 = 12.0 * 3600.0;

fn hourly_times(hours: usize) -> Vec<f64> {
    (0..hours).map(|i| i as f64 * 3600.0).collect()
}

/// Two-constituent synthetic tide.
fn synthetic_tide(times: &[f64], m2_amplitude: f64, s2_amplitude: f64) -> Vec<f64> {
    let m2_omega = 2.0 * PI / M2_PERIOD;
    let s2_omega = 2.0 * PI / S2_PERIOD;
    times
        .iter()
        .map(|&t| m2_amplitude * (m2_omega * t).cos() + s2_amplitude * (s2_omega * t + 0.4).cos())
        .collect()
}

fn tide_gauge(origin: &str, times: &[f64], values: Vec<f64>) -> MeasurementSource {
    MeasurementSource::new(MeasurementKind::TideGauge, origin, 60.0)
        .with_time(times.to_vec())
        .with_series("el", values)
}

fn adcp(origin: &str, times: &[f64], u: Vec<f64>, v: Vec<f64>) -> MeasurementSource {
    MeasurementSource::new(MeasurementKind::Adcp, origin, 60.0)
        .with_time(times.to_vec())
        .with_series("ua", u)
        .with_series("va", v)
}

fn simulation(times: &[f64]) -> SimulationSource {
    let el = synthetic_tide(times, 1.0, 0.3);
    let u: Vec<f64> = el.iter().map(|&e| 0.4 * e).collect();
    let v: Vec<f64> = el.iter().map(|&e| -0.2 * e).collect();
    SimulationSource::new("run_042.nc", false, 60.0)
        .with_time(times.to_vec())
        .with_series("el", el)
        .with_series("ua", u)
        .with_series("va", v)
}

#[test]
fn test_multi_source_benchmark_table() {
    let times = hourly_times(72);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));
    let el = synthetic_tide(&times, 1.0, 0.3);
    let profiler = adcp(
        "adcp.nc",
        &times,
        el.iter().map(|&e| 0.38 * e).collect(),
        el.iter().map(|&e| -0.21 * e).collect(),
    );

    let mut run = ValidationRun::new(&sim, vec![&gauge, &profiler], FlowMode::Native);
    let table = run.validate_data(None).unwrap();

    // One elevation row plus ua, va, and derived speed rows.
    assert_eq!(table.n_rows(), 4);
    let variables: Vec<&str> = table.rows().iter().map(|r| r.variable.as_str()).collect();
    assert_eq!(variables, vec!["el", "ua", "va", "speed"]);
    assert_eq!(table.rows()[0].source, "gauge.nc");
    assert_eq!(table.rows()[3].source, "adcp.nc");

    // A close model scores well on every row.
    for row in table.rows() {
        let corr = row.cell("corr").unwrap().as_scalar().unwrap();
        assert!(corr > 0.99, "row {} correlation {corr}", row.variable);
    }
}

#[test]
fn test_unsupported_source_is_skipped_not_fatal() {
    let times = hourly_times(48);
    let sim = simulation(&times);
    let first = tide_gauge("first.nc", &times, synthetic_tide(&times, 0.95, 0.28));
    let middle = MeasurementSource::new(MeasurementKind::Drifter, "middle.nc", 60.0)
        .with_time(times.clone())
        .with_series("ua", vec![0.1; times.len()])
        .with_series("va", vec![0.0; times.len()]);
    let last = tide_gauge("last.nc", &times, synthetic_tide(&times, 1.02, 0.31));

    // Deregistering the drifter comparator makes the middle source fail
    // recoverably; its neighbors must be unaffected.
    let mut run = ValidationRun::new(&sim, vec![&first, &middle, &last], FlowMode::Native)
        .with_runner(ComparisonSuiteRunner::default().without_comparator(MeasurementKind::Drifter));

    let sources: Vec<String> = run
        .validate_data(None)
        .unwrap()
        .rows()
        .iter()
        .map(|r| r.source.clone())
        .collect();
    assert_eq!(sources, vec!["first.nc", "last.nc"]);
    assert!(run.history().iter().any(|h| h.contains("middle.nc")));
}

#[test]
fn test_shorter_record_is_skipped_not_fatal() {
    let times = hourly_times(48);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));
    // An instrument recovered early: three samples against the simulation's
    // forty-eight. Point-by-point comparison is impossible for every
    // variable, including the derived speed.
    let short_times = hourly_times(3);
    let stunted = adcp(
        "stunted.nc",
        &short_times,
        vec![0.3, 0.4, 0.5],
        vec![0.0, 0.1, 0.0],
    );

    let mut run = ValidationRun::new(&sim, vec![&gauge, &stunted], FlowMode::Native);
    let sources: Vec<String> = run
        .validate_data(None)
        .unwrap()
        .rows()
        .iter()
        .map(|r| r.source.clone())
        .collect();
    assert_eq!(sources, vec!["gauge.nc"]);
    assert!(run.history().iter().any(|h| h.contains("stunted.nc")));
}

#[test]
fn test_all_sources_failing_aborts() {
    let times = hourly_times(24);
    let sim = simulation(&times);
    let stranger = MeasurementSource::new(MeasurementKind::TideGauge, "temp.nc", 60.0)
        .with_time(times.clone())
        .with_series("temperature", vec![8.0; times.len()]);

    let mut run = ValidationRun::new(&sim, vec![&stranger], FlowMode::Native);
    let err = run.validate_data(None).unwrap_err();
    assert!(matches!(err, ValidationError::NoMatchingMeasurement));
}

#[test]
fn test_revalidation_is_idempotent() {
    let times = hourly_times(48);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));

    let mut run = ValidationRun::new(&sim, vec![&gauge], FlowMode::Native);
    let first_rows = run.validate_data(None).unwrap().n_rows();
    let first_rmse = run.benchmarks().unwrap().rows()[0]
        .cell("RMSE")
        .unwrap()
        .as_scalar()
        .unwrap();

    let second_rows = run.validate_data(None).unwrap().n_rows();
    let second_rmse = run.benchmarks().unwrap().rows()[0]
        .cell("RMSE")
        .unwrap()
        .as_scalar()
        .unwrap();

    assert_eq!(first_rows, second_rows);
    assert!((first_rmse - second_rmse).abs() < 1e-12);
}

#[test]
fn test_csv_export_round_trip() {
    let times = hourly_times(48);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));

    let mut run = ValidationRun::new(&sim, vec![&gauge], FlowMode::Native);
    run.validate_data(None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("report").to_string_lossy().into_owned();
    let paths = run.save_as(&base, "csv").unwrap();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].to_string_lossy().ends_with("report_val.csv"));

    let written = run.benchmarks().unwrap();
    let read = read_benchmark_csv(&paths[0]).unwrap();
    assert_eq!(read.n_rows(), written.n_rows());
    assert_eq!(read.columns(), written.columns());
    for (a, b) in read.rows().iter().zip(written.rows()) {
        for column in written.columns() {
            match (a.cell(column), b.cell(column)) {
                (Some(MetricValue::Scalar(x)), Some(MetricValue::Scalar(y))) => {
                    assert!((x - y).abs() < 1e-9, "{column}: {x} vs {y}");
                }
                (None, None) => {}
                other => panic!("cell mismatch in {column}: {other:?}"),
            }
        }
    }
}

#[test]
fn test_invalid_format_rejected_before_io() {
    let times = hourly_times(24);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));

    let mut run = ValidationRun::new(&sim, vec![&gauge], FlowMode::Native);
    run.validate_data(None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("report").to_string_lossy().into_owned();
    let err = run.save_as(&base, "matlab").unwrap_err();
    assert!(matches!(err, ValidationError::InvalidExportFormat { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_archive_contains_run_products() {
    let times = hourly_times(48);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.95, 0.28));

    let mut run = ValidationRun::new(&sim, vec![&gauge], FlowMode::Native);
    run.validate_data(None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("report").to_string_lossy().into_owned();
    let paths = run.save_as(&base, "archive").unwrap();
    assert_eq!(paths.len(), 1);

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
    assert_eq!(doc["benchmarks"]["rows"][0]["variable"], "el");
    assert_eq!(
        doc["arrays"]["gauge.nc/el"].as_array().unwrap().len(),
        times.len()
    );
    assert!(doc["history"][0].as_str().unwrap().contains("gauge.nc"));
}

#[test]
fn test_end_to_end_harmonics() {
    // Forty days resolves M2 from S2 under the Rayleigh criterion.
    let times = hourly_times(24 * 40);
    let sim = simulation(&times);
    let gauge = tide_gauge("gauge.nc", &times, synthetic_tide(&times, 0.9, 0.3));

    let mut run = ValidationRun::new(&sim, vec![&gauge], FlowMode::Native);
    let harmonics = run
        .validate_harmonics(&DecompositionOptions::default())
        .unwrap();

    assert_eq!(harmonics.len(), 1);
    assert_eq!(harmonics[0].label, "meas0");
    assert_eq!(harmonics[0].origin, "gauge.nc");

    let el = harmonics[0].elevation.as_ref().unwrap();
    assert!(el.errors.constituents().contains(&"M2".to_string()));
    // Simulated M2 amplitude 1.0 vs observed 0.9: about 11% relative error.
    let m2_error = el.errors.error("M2", "A").unwrap();
    assert!(
        (m2_error - 100.0 / 9.0).abs() < 1.5,
        "M2 amplitude error {m2_error}"
    );
}

#[test]
fn test_fixed_depth_flow_mode_wins() {
    let times = hourly_times(48);
    let mut sim = simulation(&times);
    sim.is_3d = true;
    let el = synthetic_tide(&times, 1.0, 0.3);
    let profiler = adcp(
        "adcp.nc",
        &times,
        el.iter().map(|&e| 0.38 * e).collect(),
        el.iter().map(|&e| -0.21 * e).collect(),
    );

    let mut run = ValidationRun::new(&sim, vec![&profiler], FlowMode::at_depth(12.0));
    // The per-call depth argument loses to the flow mode's fixed depth.
    let table = run.validate_data(Some(3.0)).unwrap();
    let depth = table.rows()[0].cell("depth").unwrap().as_scalar().unwrap();
    assert!((depth - 12.0).abs() < 1e-12);
}
