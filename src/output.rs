//! The module responsible for writing output data to disk.
use crate::profile::BundleID;
use crate::tariff::TariffID;
use crate::time_slot::Timeslot;
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "capsim_results";

/// The output file name for capacities
const CAPACITIES_FILE_NAME: &str = "capacities.csv";

/// The format in which timeslot start times are written
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the capacities CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityRow {
    timeslot: usize,
    start_time: String,
    customer: String,
    bundle: BundleID,
    tariff: TariffID,
    base_capacity: Capacity,
    adjusted_capacity: Capacity,
}

/// An object for writing capacities to file
pub struct DataWriter {
    capacities_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(CAPACITIES_FILE_NAME);
        let capacities_writer = csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;

        Ok(Self { capacities_writer })
    }

    /// Write the capacity of one bundle for one subscription in one timeslot
    pub fn write_capacity(
        &mut self,
        timeslot: &Timeslot,
        customer: &str,
        bundle_id: &BundleID,
        tariff_id: &TariffID,
        base_capacity: Capacity,
        adjusted_capacity: Capacity,
    ) -> Result<()> {
        let row = CapacityRow {
            timeslot: timeslot.serial_number,
            start_time: timeslot.start.format(START_TIME_FORMAT).to_string(),
            customer: customer.to_string(),
            bundle: bundle_id.clone(),
            tariff: tariff_id.clone(),
            base_capacity,
            adjusted_capacity,
        };
        self.capacities_writer.serialize(row)?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.capacities_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::monday_afternoon;
    use itertools::assert_equal;
    use tempfile::tempdir;

    #[test]
    fn test_write_capacity() {
        let dir = tempdir().unwrap();
        let timeslot = Timeslot {
            serial_number: 3,
            start: monday_afternoon(),
        };

        // Write a capacity
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer
                .write_capacity(
                    &timeslot,
                    "Village",
                    &"homes".into(),
                    &"flat".into(),
                    Capacity(100.0),
                    Capacity(49.5),
                )
                .unwrap();
            writer.flush().unwrap();
        }

        // Read back and compare
        let expected = CapacityRow {
            timeslot: 3,
            start_time: "2025-01-06 14:00".to_string(),
            customer: "Village".to_string(),
            bundle: "homes".into(),
            tariff: "flat".into(),
            base_capacity: Capacity(100.0),
            adjusted_capacity: Capacity(49.5),
        };
        let records: Vec<CapacityRow> =
            csv::Reader::from_path(dir.path().join(CAPACITIES_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .collect::<Result<_, _>>()
                .unwrap();
        assert_equal(records, [expected]);
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results");

        // Create a new directory should succeed and return false (no overwrite)
        let result = create_output_directory(&output_dir, false).unwrap();
        assert!(!result);
        assert!(output_dir.exists());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_non_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results");

        // Create the directory first and add a file to make it non-empty
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("test_file.txt"), "test content").unwrap();

        // Without allow_overwrite, this should fail
        assert!(create_output_directory(&output_dir, false).is_err());

        // With allow_overwrite, the old contents are removed
        let result = create_output_directory(&output_dir, true).unwrap();
        assert!(result);
        assert!(output_dir.exists());
        assert!(!output_dir.join("test_file.txt").exists());
    }

    #[test]
    fn test_get_output_dir() {
        let temp_dir = tempdir().unwrap();
        let model_dir = temp_dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();

        let output_dir = get_output_dir(&model_dir).unwrap();
        assert_eq!(output_dir, PathBuf::from("capsim_results/my_model"));
    }
}
