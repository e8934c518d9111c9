//! Integration tests for harmonic decomposition, matching, and error tables.

use std::f64::consts::PI;

use tideval::harmonic::{
    compute_error, constituent_period, match_constituents, DecompositionOptions,
    HarmonicCoefficientSet, HarmonicSolver, OlsHarmonicSolver, ELEVATION_ATTRIBUTES,
    VELOCITY_ATTRIBUTES,
};

const TOL: f64 = 1e-10;

fn hourly_times(hours: usize) -> Vec<f64> {
    (0..hours).map(|i| i as f64 * 3600.0).collect()
}

fn constituent_signal(times: &[f64], entries: &[(&str, f64, f64)]) -> Vec<f64> {
    times
        .iter()
        .map(|&t| {
            entries
                .iter()
                .map(|&(name, amplitude, phase_deg)| {
                    let omega = 2.0 * PI / constituent_period(name).unwrap();
                    amplitude * (omega * t - phase_deg.to_radians()).cos()
                })
                .sum()
        })
        .collect()
}

fn elevation_set(entries: &[(&str, f64)]) -> HarmonicCoefficientSet {
    let names: Vec<String> = entries.iter().map(|(n, _)| n.to_string()).collect();
    let amp: Vec<f64> = entries.iter().map(|(_, a)| *a).collect();
    let n = entries.len();
    HarmonicCoefficientSet::new(names)
        .with_attribute("A", amp)
        .unwrap()
        .with_attribute("g", vec![30.0; n])
        .unwrap()
        .with_attribute("A_ci", vec![0.01; n])
        .unwrap()
        .with_attribute("g_ci", vec![1.0; n])
        .unwrap()
}

#[test]
fn test_decompose_match_score_pipeline() {
    let times = hourly_times(24 * 40);
    let observed_series = constituent_signal(&times, &[("M2", 1.0, 20.0), ("S2", 0.3, 50.0)]);
    let simulated_series = constituent_signal(&times, &[("M2", 0.9, 22.0), ("S2", 0.33, 48.0)]);

    let solver = OlsHarmonicSolver;
    let options = DecompositionOptions::default();
    let observed = solver
        .decompose(&times, &observed_series, None, 60.0, &options)
        .unwrap();
    let simulated = solver
        .decompose(&times, &simulated_series, None, 60.0, &options)
        .unwrap();

    let matched = match_constituents(&observed, &simulated);
    assert!(matched.names().contains(&"M2"));
    assert!(matched.names().contains(&"S2"));

    let errors = compute_error(&matched, &observed, &simulated, &ELEVATION_ATTRIBUTES).unwrap();
    // 0.9 vs 1.0: 10% amplitude error on M2, within fit tolerance.
    let m2 = errors.error("M2", "A").unwrap();
    assert!((m2 - 10.0).abs() < 1.0, "M2 amplitude error {m2}");
    // 0.33 vs 0.30: 10% on S2 as well.
    let s2 = errors.error("S2", "A").unwrap();
    assert!((s2 - 10.0).abs() < 1.5, "S2 amplitude error {s2}");
}

#[test]
fn test_matching_ignores_constituent_order() {
    let observed = elevation_set(&[("M2", 1.0), ("S2", 0.4), ("N2", 0.2)]);
    let simulated = elevation_set(&[("K1", 0.1), ("S2", 0.35), ("M2", 0.9)]);

    let observed_shuffled = elevation_set(&[("N2", 0.2), ("M2", 1.0), ("S2", 0.4)]);
    let simulated_shuffled = elevation_set(&[("M2", 0.9), ("K1", 0.1), ("S2", 0.35)]);

    let a = match_constituents(&observed, &simulated);
    let b = match_constituents(&observed_shuffled, &simulated_shuffled);

    let mut names_a: Vec<&str> = a.names();
    let mut names_b: Vec<&str> = b.names();
    names_a.sort_unstable();
    names_b.sort_unstable();
    assert_eq!(names_a, names_b);

    let err_a = compute_error(&a, &observed, &simulated, &["A"]).unwrap();
    let err_b = compute_error(&b, &observed_shuffled, &simulated_shuffled, &["A"]).unwrap();
    for name in ["M2", "S2"] {
        assert!(
            (err_a.error(name, "A").unwrap() - err_b.error(name, "A").unwrap()).abs() < TOL,
            "{name} error differs across orderings"
        );
    }
}

#[test]
fn test_partial_overlap_reports_unmatched() {
    let observed = elevation_set(&[("M2", 1.0), ("S2", 0.4), ("N2", 0.2)]);
    let simulated = elevation_set(&[("M2", 0.9), ("S2", 0.35), ("K1", 0.1)]);

    let matched = match_constituents(&observed, &simulated);
    assert_eq!(matched.names(), vec!["M2", "S2"]);
    assert_eq!(matched.unmatched, vec!["K1".to_string(), "N2".to_string()]);
}

#[test]
fn test_exact_percentage_error() {
    let observed = elevation_set(&[("M2", 10.0)]);
    let simulated = elevation_set(&[("M2", 9.5)]);

    let matched = match_constituents(&observed, &simulated);
    let errors = compute_error(&matched, &observed, &simulated, &["A"]).unwrap();
    assert!((errors.error("M2", "A").unwrap() - 5.0).abs() < TOL);
}

#[test]
fn test_zero_observed_value_is_undefined_not_infinite() {
    let observed = elevation_set(&[("M2", 0.0)]);
    let simulated = elevation_set(&[("M2", 0.5)]);

    let matched = match_constituents(&observed, &simulated);
    let errors = compute_error(&matched, &observed, &simulated, &["A", "g"]).unwrap();

    assert_eq!(errors.error("M2", "A"), None);
    assert_eq!(errors.n_undefined(), 1);
    assert!(errors.error("M2", "g").is_some());
}

#[test]
fn test_velocity_decomposition_carries_ellipse_schema() {
    let times = hourly_times(24 * 40);
    let u = constituent_signal(&times, &[("M2", 0.5, 10.0)]);
    let v = constituent_signal(&times, &[("M2", 0.2, 100.0)]);

    let set = OlsHarmonicSolver
        .decompose(&times, &u, Some(&v), 60.0, &DecompositionOptions::default())
        .unwrap();

    let mut names = set.attribute_names();
    names.sort_unstable();
    let mut expected = VELOCITY_ATTRIBUTES.to_vec();
    expected.sort_unstable();
    assert_eq!(names, expected);

    // Semi-major axis can never be smaller than semi-minor.
    let m2 = set.names().iter().position(|n| n == "M2").unwrap();
    let lsmaj = set.value("Lsmaj", m2).unwrap();
    assert!(lsmaj > 0.0);
}

#[test]
fn test_short_record_restricts_constituents() {
    // Twelve hours cannot separate M2 from S2.
    let times = hourly_times(12);
    let series = constituent_signal(&times, &[("M2", 1.0, 0.0)]);

    let set = OlsHarmonicSolver
        .decompose(&times, &series, None, 60.0, &DecompositionOptions::default())
        .unwrap();

    assert!(set.len() < 8, "expected a restricted set, got {}", set.len());
}
