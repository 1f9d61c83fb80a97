//! Check that running the "simple" example twice with the same seed gives the same results.
use capsim::input::load_model;
use capsim::simulation;
use float_cmp::approx_eq;
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const FLOAT_CMP_TOLERANCE: f64 = 1e-10;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Load the example model and run it, saving results to `output_dir`
fn run_example(output_dir: &Path) {
    let model = load_model(get_model_dir()).unwrap();
    simulation::run(&model, output_dir).unwrap();
}

/// Parse a string into an `f64`, returning `None` if parsing fails or value is infinite/NaN
fn parse_finite(s: &str) -> Option<f64> {
    s.parse().ok().filter(|value: &f64| value.is_finite())
}

/// Compare fields as floats if they can be parsed, otherwise as strings
fn fields_match(f1: &str, f2: &str) -> bool {
    match (parse_finite(f1), parse_finite(f2)) {
        (Some(v1), Some(v2)) => approx_eq!(f64, v1, v2, epsilon = FLOAT_CMP_TOLERANCE),
        _ => f1 == f2,
    }
}

#[test]
fn test_same_seed_same_capacities() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    run_example(dir1.path());
    run_example(dir2.path());

    let contents1 = fs::read_to_string(dir1.path().join("capacities.csv")).unwrap();
    let contents2 = fs::read_to_string(dir2.path().join("capacities.csv")).unwrap();
    let lines1 = contents1.lines().collect_vec();
    let lines2 = contents2.lines().collect_vec();

    // 48 timeslots, three bundles and four subscriptions, plus the header
    assert_eq!(lines1.len(), 48 * 4 + 1);
    assert_eq!(lines1.len(), lines2.len());

    let mut errors = Vec::new();
    for (num, (line1, line2)) in lines1.iter().zip(&lines2).enumerate() {
        let fields1 = line1.split(',').collect_vec();
        let fields2 = line2.split(',').collect_vec();
        if fields1.len() != fields2.len()
            || !fields1
                .iter()
                .zip(&fields2)
                .all(|(f1, f2)| fields_match(f1, f2))
        {
            errors.push(format!("line {num}:\n    + \"{line1}\"\n    - \"{line2}\""));
        }
    }

    assert!(
        errors.is_empty(),
        "The following lines differ:\n  * {}",
        errors.join("\n  * ")
    );
}

#[test]
fn test_adjusted_capacities_finite_and_truncated() {
    let dir = tempdir().unwrap();
    run_example(dir.path());

    let mut reader = csv::Reader::from_path(dir.path().join("capacities.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    let adjusted_idx = headers
        .iter()
        .position(|header| header == "adjusted_capacity")
        .unwrap();
    for record in reader.records() {
        let record = record.unwrap();
        let value: f64 = record[adjusted_idx].parse().unwrap();
        assert!(value.is_finite());

        // At most two decimal places
        let scaled = value * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-6, "{value} not truncated");
    }
}
