//! Weather observations and the multiplicative effect they have on capacity.
use crate::error::TableKind;
use crate::time_slot::SimulationClock;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// A weather observation for a single timeslot
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WeatherReport {
    /// Temperature (degrees Celsius)
    pub temperature: f64,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// Wind direction (degrees)
    pub wind_direction: f64,
    /// Cloud cover (fraction of sky, or any scale the tables are keyed on)
    pub cloud_cover: f64,
}

/// Source of the weather observation for the current timeslot
pub trait WeatherSource {
    /// The current observation, if one is available
    fn current_report(&self) -> Option<WeatherReport>;
}

/// Weather reports keyed by timeslot, served according to a simulation clock
#[derive(Debug)]
pub struct WeatherReportRepo {
    reports: HashMap<usize, WeatherReport>,
    clock: Rc<SimulationClock>,
}

impl WeatherReportRepo {
    /// Create a new repository of weather reports
    pub fn new(reports: HashMap<usize, WeatherReport>, clock: Rc<SimulationClock>) -> Self {
        Self { reports, clock }
    }
}

impl WeatherSource for WeatherReportRepo {
    fn current_report(&self) -> Option<WeatherReport> {
        let timeslot = self.clock.current_timeslot();
        self.reports.get(&timeslot.serial_number).copied()
    }
}

/// How a weather channel influences capacity
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, DeserializeLabeledStringEnum)]
pub enum InfluenceKind {
    /// The channel has no effect
    #[default]
    #[string = "none"]
    None,
    /// The factor is looked up directly from the observation
    #[string = "direct"]
    Direct,
    /// The factor is the cumulative sum of table entries between a reference and the observation
    #[string = "deviation"]
    Deviation,
}

/// A lookup key was absent from a weather table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no {table} entry for key {key}")]
pub struct MissingEntry {
    /// The table which was consulted
    pub table: TableKind,
    /// The missing key
    pub key: i64,
}

/// Maps an integer-rounded observation to a factor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherTable(HashMap<i64, f64>);

impl WeatherTable {
    /// Create a table from its entries
    pub fn new(entries: HashMap<i64, f64>) -> Self {
        Self(entries)
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up the entry for `key`, reporting which table was consulted if it is missing
    pub fn lookup(&self, key: i64, table: TableKind) -> Result<f64, MissingEntry> {
        self.0.get(&key).copied().ok_or(MissingEntry { table, key })
    }
}

impl FromIterator<(i64, f64)> for WeatherTable {
    fn from_iter<T: IntoIterator<Item = (i64, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Round to the nearest integer, with halves rounded up (towards positive infinity)
#[allow(clippy::cast_possible_truncation)]
pub fn round_observation(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// The weather-related part of a capacity profile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherInfluence {
    /// Influence of temperature
    pub temperature: InfluenceKind,
    /// Influence of wind speed
    pub wind_speed: InfluenceKind,
    /// Influence of wind direction (only applies when there is wind)
    pub wind_direction: InfluenceKind,
    /// Influence of cloud cover
    pub cloud_cover: InfluenceKind,
    /// Factors by rounded temperature
    pub temperature_map: WeatherTable,
    /// Factors by rounded wind speed
    pub wind_speed_map: WeatherTable,
    /// Factors by rounded wind direction
    pub wind_direction_map: WeatherTable,
    /// Factors by rounded cloud cover
    pub cloud_cover_map: WeatherTable,
    /// Reference temperature for [`InfluenceKind::Deviation`]
    pub temperature_reference: f64,
}

impl WeatherInfluence {
    /// Whether any channel has an influence on capacity
    pub fn is_active(&self) -> bool {
        [
            self.temperature,
            self.wind_speed,
            self.wind_direction,
            self.cloud_cover,
        ]
        .iter()
        .any(|kind| *kind != InfluenceKind::None)
    }

    /// Compute the multiplicative weather factor for the given observation
    pub fn weather_factor(&self, report: &WeatherReport) -> Result<f64, MissingEntry> {
        let mut factor = 1.0;

        match self.temperature {
            InfluenceKind::Direct => {
                let temperature = round_observation(report.temperature);
                factor *= self
                    .temperature_map
                    .lookup(temperature, TableKind::Temperature)?;
            }
            InfluenceKind::Deviation => {
                factor *= self.temperature_deviation_factor(report.temperature)?;
            }
            InfluenceKind::None => {}
        }

        if self.wind_speed == InfluenceKind::Direct {
            let wind_speed = round_observation(report.wind_speed);
            factor *= self.wind_speed_map.lookup(wind_speed, TableKind::WindSpeed)?;

            // Direction only matters when there is some wind
            if wind_speed > 0 && self.wind_direction == InfluenceKind::Direct {
                let wind_direction = round_observation(report.wind_direction);
                factor *= self
                    .wind_direction_map
                    .lookup(wind_direction, TableKind::WindDirection)?;
            }
        }

        if self.cloud_cover == InfluenceKind::Direct {
            let cloud_cover = round_observation(report.cloud_cover);
            factor *= self
                .cloud_cover_map
                .lookup(cloud_cover, TableKind::CloudCover)?;
        }

        Ok(factor)
    }

    /// Sum the table entries lying between the reference and current temperatures.
    ///
    /// Above the reference the keys `(ref, curr]` are summed, below it the keys `[curr, ref)`.
    fn temperature_deviation_factor(&self, temperature: f64) -> Result<f64, MissingEntry> {
        let curr = round_observation(temperature);
        let reference = round_observation(self.temperature_reference);
        let keys = if curr > reference {
            (reference + 1)..=curr
        } else {
            // Empty range when curr == reference
            curr..=(reference - 1)
        };

        let mut deviation = 1.0;
        for key in keys {
            deviation += self.temperature_map.lookup(key, TableKind::Temperature)?;
        }

        Ok(deviation)
    }
}
