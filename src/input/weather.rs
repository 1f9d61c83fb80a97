//! Code for reading weather reports and weather influence tables.
use super::{input_err_msg, read_csv_optional};
use crate::weather::{WeatherReport, WeatherTable};
use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

const WEATHER_FILE_NAME: &str = "weather.csv";

/// The largest number of keys a single range in a range map may cover
const MAX_RANGE_LEN: i64 = 100_000;

#[derive(Debug, Deserialize, PartialEq)]
struct WeatherReportRaw {
    timeslot: usize,
    temperature: f64,
    wind_speed: f64,
    wind_direction: f64,
    cloud_cover: f64,
}

/// Parse a weather table written as a range map, e.g. `"-10~0:1.2, 1~15:1.0, 16:0.95"`.
///
/// Each entry maps an inclusive range of integer keys (or a single key) to a factor. Ranges may
/// not overlap.
pub fn parse_range_map(s: &str) -> Result<WeatherTable> {
    let mut entries = HashMap::new();
    for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (keys, factor) = entry
            .split_once(':')
            .with_context(|| format!("Range map entry '{entry}' must have the form key:factor"))?;
        let factor: f64 = factor
            .trim()
            .parse()
            .with_context(|| format!("Invalid factor in range map entry '{entry}'"))?;
        ensure!(
            factor.is_finite(),
            "Factor in range map entry '{entry}' must be finite"
        );

        let (low, high) = parse_key_range(keys.trim())
            .with_context(|| format!("Invalid key range in range map entry '{entry}'"))?;
        for key in low..=high {
            match entries.entry(key) {
                Entry::Occupied(_) => {
                    bail!("Range map key {key} is given more than once")
                }
                Entry::Vacant(slot) => {
                    slot.insert(factor);
                }
            }
        }
    }

    Ok(WeatherTable::new(entries))
}

/// Parse either `low~high` or a single key
fn parse_key_range(keys: &str) -> Result<(i64, i64)> {
    let (low, high) = match keys.split_once('~') {
        Some((low, high)) => (low.trim().parse()?, high.trim().parse()?),
        None => {
            let key: i64 = keys.parse()?;
            (key, key)
        }
    };
    ensure!(low <= high, "Range {low}~{high} is empty");
    ensure!(
        high.checked_sub(low).is_some_and(|len| len < MAX_RANGE_LEN),
        "Range {low}~{high} is too large"
    );

    Ok((low, high))
}

/// Read weather reports from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `timeslots` - Number of timeslots to be simulated
/// * `required` - Whether every timeslot must have a report
///
/// # Returns
///
/// Weather reports keyed by timeslot.
pub fn read_weather_reports(
    model_dir: &Path,
    timeslots: usize,
    required: bool,
) -> Result<HashMap<usize, WeatherReport>> {
    let file_path = model_dir.join(WEATHER_FILE_NAME);
    let iter = read_csv_optional::<WeatherReportRaw>(&file_path)?;
    read_weather_reports_from_iter(iter, timeslots, required)
        .with_context(|| input_err_msg(&file_path))
}

fn read_weather_reports_from_iter<I>(
    iter: I,
    timeslots: usize,
    required: bool,
) -> Result<HashMap<usize, WeatherReport>>
where
    I: Iterator<Item = WeatherReportRaw>,
{
    let mut reports = HashMap::new();
    for raw in iter {
        ensure!(raw.timeslot >= 1, "Weather report timeslots start at 1");
        let report = WeatherReport {
            temperature: raw.temperature,
            wind_speed: raw.wind_speed,
            wind_direction: raw.wind_direction,
            cloud_cover: raw.cloud_cover,
        };
        ensure!(
            [
                report.temperature,
                report.wind_speed,
                report.wind_direction,
                report.cloud_cover
            ]
            .iter()
            .all(|value| value.is_finite()),
            "Weather report for timeslot {} contains a non-finite value",
            raw.timeslot
        );
        ensure!(
            reports.insert(raw.timeslot, report).is_none(),
            "Duplicate weather report for timeslot {}",
            raw.timeslot
        );
    }

    if required {
        if let Some(missing) = (1..=timeslots).find(|t| !reports.contains_key(t)) {
            bail!(
                "A weather influence is configured but there is no weather report for timeslot \
                {missing}"
            );
        }
    }

    Ok(reports)
}
