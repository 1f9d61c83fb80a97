//! Common functionality for capsim.
//!
//! capsim computes the energy capacity that a customer population consumes or produces in each
//! timeslot of a simulation, adjusting a base capacity for the subscribed share of the population,
//! periodic skew, weather and the price of the tariff subscribed to.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod capacity;
pub mod cli;
pub mod distribution;
pub mod elasticity;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod profile;
pub mod settings;
pub mod simulation;
pub mod tariff;
pub mod time_slot;
pub mod timeseries;
pub mod units;
pub mod weather;

#[cfg(test)]
mod fixture;

/// Get the directory in which the program's config files are stored
pub fn get_capsim_config_dir() -> PathBuf {
    let mut config_dir = dirs::config_dir().unwrap_or_default();
    config_dir.push("capsim");
    config_dir
}
