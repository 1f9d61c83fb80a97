//! The model represents the static input data provided by the user.
use crate::profile::Customer;
use crate::tariff::TariffMap;
use crate::weather::WeatherReport;
use std::collections::HashMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Tariffs customers may subscribe to
    pub tariffs: TariffMap,
    /// Customer populations and their capacity bundles
    pub customers: Vec<Customer>,
    /// Weather reports keyed by timeslot
    pub weather_reports: HashMap<usize, WeatherReport>,
}

impl Model {
    /// Total number of capacity bundles across all customers
    pub fn bundle_count(&self) -> usize {
        self.customers
            .iter()
            .map(|customer| customer.bundles.len())
            .sum()
    }
}
