//! Code for reading capacity time series from CSV files.
use super::{check_all_finite, input_err_msg, read_csv};
use crate::timeseries::TimeSeriesSampler;
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, PartialEq)]
struct TimeSeriesValue {
    value: f64,
}

/// Read a capacity time series, one value per timeslot starting at timeslot 1.
///
/// A warning is emitted if the series is shorter than the simulation. Running past its end is an
/// error for the bundle using it.
///
/// # Arguments
///
/// * `file_path` - Path to a CSV file with a `value` column
/// * `timeslots` - Number of timeslots to be simulated
pub fn read_timeseries(file_path: &Path, timeslots: usize) -> Result<TimeSeriesSampler> {
    let values: Vec<f64> = read_csv::<TimeSeriesValue>(file_path)?
        .map(|row| row.value)
        .collect();
    check_all_finite(&values, "time series").with_context(|| input_err_msg(file_path))?;

    if values.len() < timeslots {
        warn!(
            "Time series {} has {} values but {timeslots} timeslots will be simulated",
            file_path.display(),
            values.len()
        );
    }

    Ok(TimeSeriesSampler::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_timeseries() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("series.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value\n1.5\n2.0\n-0.5").unwrap();
        }

        // Shorter than the simulation is allowed
        let series = read_timeseries(&file_path, 10).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.value_at(3), Ok(-0.5));
    }

    #[test]
    fn test_read_timeseries_invalid() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("series.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value\n1.5\nNaN").unwrap();
        }
        assert!(read_timeseries(&file_path, 2).is_err());

        // Missing file
        assert!(read_timeseries(&dir.path().join("missing.csv"), 2).is_err());
    }
}
