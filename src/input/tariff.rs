//! Code for reading in tariffs from a TOML file.
use super::{input_err_msg, read_toml};
use crate::tariff::{Tariff, TariffID, TariffMap};
use crate::units::MoneyPerCapacity;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const TARIFFS_FILE_NAME: &str = "tariffs.toml";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct TariffRaw {
    id: TariffID,
    rates: Vec<MoneyPerCapacity>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct TariffsFile {
    tariffs: Vec<TariffRaw>,
}

/// Read tariffs from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of [`Tariff`]s, with the tariff ID as the key.
pub fn read_tariffs(model_dir: &Path) -> Result<TariffMap> {
    let file_path = model_dir.join(TARIFFS_FILE_NAME);
    let file: TariffsFile = read_toml(&file_path)?;
    build_tariff_map(file.tariffs).with_context(|| input_err_msg(&file_path))
}

fn build_tariff_map(tariffs_raw: Vec<TariffRaw>) -> Result<TariffMap> {
    ensure!(!tariffs_raw.is_empty(), "At least one tariff must be defined");

    let mut tariffs = TariffMap::new();
    for raw in tariffs_raw {
        let tariff = Tariff::new(raw.id.clone(), raw.rates)?;
        ensure!(
            tariffs.insert(raw.id.clone(), Rc::new(tariff)).is_none(),
            "Duplicate tariff ID found: {}",
            raw.id
        );
    }

    Ok(tariffs)
}
