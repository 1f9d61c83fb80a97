//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, bail, ensure};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer};
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// The format in which `start_time` is given
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_timeslot_hours, u32, 1);
define_param_default!(default_seed, u64, 0);

/// Read the start time, which is given as a string like "2025-01-06 00:00"
fn deserialise_start_time<'de, D>(deserialiser: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let value: String = Deserialize::deserialize(deserialiser)?;
    NaiveDateTime::parse_from_str(&value, START_TIME_FORMAT).map_err(|err| {
        serde::de::Error::custom(format!(
            "Invalid start_time '{value}' (expected YYYY-MM-DD HH:MM): {err}"
        ))
    })
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Start of the first timeslot
    #[serde(deserialize_with = "deserialise_start_time")]
    pub start_time: NaiveDateTime,
    /// Number of timeslots to simulate
    pub timeslots: usize,
    /// Length of each timeslot in hours
    #[serde(default = "default_timeslot_hours")]
    pub timeslot_hours: u32,
    /// Seed for the random number generators of the capacity engines
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Check that the `timeslots` parameter is valid
fn check_timeslots(value: usize) -> Result<()> {
    ensure!(value > 0, "timeslots must be greater than zero");

    Ok(())
}

/// Check that the `timeslot_hours` parameter is valid
fn check_timeslot_hours(value: u32) -> Result<()> {
    ensure!(value > 0, "timeslot_hours must be greater than zero");

    Ok(())
}

/// Check that the end of the last timeslot is a representable date and time
fn check_simulation_end(
    start_time: NaiveDateTime,
    timeslots: usize,
    timeslot_hours: u32,
) -> Result<()> {
    let end = i64::try_from(timeslots)
        .ok()
        .and_then(|timeslots| timeslots.checked_mul(i64::from(timeslot_hours)))
        .and_then(TimeDelta::try_hours)
        .and_then(|span| start_time.checked_add_signed(span));
    if end.is_none() {
        bail!(
            "{timeslots} timeslots of {timeslot_hours} hours from {start_time} run past the \
            supported date range"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_timeslots(self.timeslots)?;
        check_timeslot_hours(self.timeslot_hours)?;
        check_simulation_end(self.start_time, self.timeslots, self.timeslot_hours)?;

        Ok(())
    }
}
