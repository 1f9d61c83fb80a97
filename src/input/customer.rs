//! Code for reading customers, their capacity bundles and profiles from a TOML file.
use super::timeseries::read_timeseries;
use super::weather::parse_range_map;
use super::{check_all_finite, input_err_msg, read_toml};
use crate::distribution::{DistributionSpec, StochasticDrawSource};
use crate::elasticity::{ContinuousElasticity, ElasticityModel, StepwiseElasticity};
use crate::profile::{
    BaseCapacity, BaseCapacityType, BundleID, BundleSubscription, CapacityBundle, CapacityProfile,
    CapacityType, Customer, CustomerProfile, DAYS_PER_WEEK, HOURS_PER_DAY,
};
use crate::tariff::{TariffID, TariffMap};
use crate::units::MoneyPerCapacity;
use crate::weather::{InfluenceKind, WeatherInfluence, WeatherTable};
use anyhow::{Context, Result, anyhow, bail, ensure};
use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const CUSTOMERS_FILE_NAME: &str = "customers.toml";

fn default_daily_skew() -> Vec<f64> {
    vec![1.0; DAYS_PER_WEEK]
}

fn default_hourly_skew() -> Vec<f64> {
    vec![1.0; HOURS_PER_DAY]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomersFile {
    customers: Vec<CustomerRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomerRaw {
    name: String,
    population: u32,
    #[serde(default)]
    bundles: Vec<BundleRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleRaw {
    id: BundleID,
    capacity_type: CapacityType,
    #[serde(default)]
    subscriptions: Vec<SubscriptionRaw>,
    profile: ProfileRaw,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubscriptionRaw {
    tariff: TariffID,
    customers: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileRaw {
    base_capacity_type: BaseCapacityType,
    distribution: Option<DistributionSpec>,
    timeseries_file: Option<PathBuf>,
    #[serde(default = "default_daily_skew")]
    daily_skew: Vec<f64>,
    #[serde(default = "default_hourly_skew")]
    hourly_skew: Vec<f64>,
    benchmark_rates: Vec<MoneyPerCapacity>,
    #[serde(default)]
    weather: WeatherRaw,
    elasticity: Option<ElasticityRaw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WeatherRaw {
    temperature: InfluenceKind,
    wind_speed: InfluenceKind,
    wind_direction: InfluenceKind,
    cloud_cover: InfluenceKind,
    temperature_map: String,
    wind_speed_map: String,
    wind_direction_map: String,
    cloud_cover_map: String,
    temperature_reference: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ElasticityRaw {
    Continuous { ratio: f64, range: [f64; 2] },
    Stepwise { map: String },
}

/// Read customers from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `tariffs` - Tariffs which customers may subscribe to
/// * `timeslots` - Number of timeslots to be simulated
///
/// # Returns
///
/// The customers, in the order in which they appear in the file.
pub fn read_customers(
    model_dir: &Path,
    tariffs: &TariffMap,
    timeslots: usize,
) -> Result<Vec<Customer>> {
    let file_path = model_dir.join(CUSTOMERS_FILE_NAME);
    let file: CustomersFile = read_toml(&file_path)?;
    build_customers(file.customers, model_dir, tariffs, timeslots)
        .with_context(|| input_err_msg(&file_path))
}

fn build_customers(
    customers_raw: Vec<CustomerRaw>,
    model_dir: &Path,
    tariffs: &TariffMap,
    timeslots: usize,
) -> Result<Vec<Customer>> {
    ensure!(
        !customers_raw.is_empty(),
        "At least one customer must be defined"
    );

    let mut names = HashSet::new();
    let mut customers = Vec::new();
    for raw in customers_raw {
        ensure!(
            names.insert(raw.name.clone()),
            "Duplicate customer name found: {}",
            raw.name
        );
        let name = raw.name.clone();
        let customer = build_customer(raw, model_dir, tariffs, timeslots)
            .with_context(|| format!("Invalid customer {name}"))?;
        customers.push(customer);
    }

    Ok(customers)
}

fn build_customer(
    raw: CustomerRaw,
    model_dir: &Path,
    tariffs: &TariffMap,
    timeslots: usize,
) -> Result<Customer> {
    ensure!(!raw.name.trim().is_empty(), "Customer name cannot be empty");
    ensure!(raw.population > 0, "Population must be greater than zero");
    if raw.bundles.is_empty() {
        warn!("Customer {} has no capacity bundles", raw.name);
    }

    let mut ids = HashSet::new();
    let mut bundles = Vec::new();
    for bundle in raw.bundles {
        ensure!(
            ids.insert(bundle.id.clone()),
            "Duplicate bundle ID found: {}",
            bundle.id
        );
        let id = bundle.id.clone();
        let bundle = build_bundle(bundle, raw.population, model_dir, tariffs, timeslots)
            .with_context(|| format!("Invalid bundle {id}"))?;
        bundles.push(bundle);
    }

    Ok(Customer {
        profile: Rc::new(CustomerProfile {
            name: raw.name,
            population: raw.population,
        }),
        bundles,
    })
}

fn build_bundle(
    raw: BundleRaw,
    population: u32,
    model_dir: &Path,
    tariffs: &TariffMap,
    timeslots: usize,
) -> Result<CapacityBundle> {
    let subscriptions = build_subscriptions(raw.subscriptions, population, tariffs)?;
    if subscriptions.is_empty() {
        warn!("Bundle {} has no subscriptions and will never be used", raw.id);
    }

    let profile = build_profile(raw.profile, raw.capacity_type, model_dir, timeslots)?;

    Ok(CapacityBundle {
        id: raw.id,
        profile,
        subscriptions,
    })
}

fn build_subscriptions(
    subscriptions_raw: Vec<SubscriptionRaw>,
    population: u32,
    tariffs: &TariffMap,
) -> Result<Vec<BundleSubscription>> {
    let mut total: u64 = 0;
    let mut subscriptions = Vec::new();
    for raw in subscriptions_raw {
        ensure!(
            tariffs.contains_key(&raw.tariff),
            "Unknown tariff {} in subscription",
            raw.tariff
        );
        ensure!(
            raw.customers <= population,
            "Subscription to tariff {} has {} customers, more than the population of {population}",
            raw.tariff,
            raw.customers
        );
        total += u64::from(raw.customers);
        subscriptions.push(BundleSubscription {
            tariff_id: raw.tariff,
            customers: raw.customers,
        });
    }

    if total > u64::from(population) {
        warn!(
            "Subscriptions commit {total} customers in total, more than the population of \
            {population}"
        );
    }

    Ok(subscriptions)
}

fn build_profile(
    raw: ProfileRaw,
    capacity_type: CapacityType,
    model_dir: &Path,
    timeslots: usize,
) -> Result<CapacityProfile> {
    let base_capacity = build_base_capacity(
        raw.base_capacity_type,
        raw.distribution,
        raw.timeseries_file,
        model_dir,
        timeslots,
    )?;

    check_all_finite(&raw.daily_skew, "daily_skew")?;
    let daily_skew = to_array(raw.daily_skew, "daily_skew")?;
    check_all_finite(&raw.hourly_skew, "hourly_skew")?;
    let hourly_skew = to_array(raw.hourly_skew, "hourly_skew")?;

    ensure!(
        raw.benchmark_rates
            .iter()
            .all(|rate| rate.is_finite() && rate.value() > 0.0),
        "benchmark_rates must be finite and greater than zero"
    );
    let benchmark_rates = to_array(raw.benchmark_rates, "benchmark_rates")?;

    Ok(CapacityProfile {
        base_capacity,
        daily_skew,
        hourly_skew,
        weather: build_weather_influence(raw.weather)?,
        benchmark_rates,
        elasticity: build_elasticity(raw.elasticity)?,
        capacity_type,
    })
}

/// Convert a list of values into a fixed-size array, checking its length
fn to_array<T, const N: usize>(values: Vec<T>, what: &str) -> Result<[T; N]> {
    values
        .try_into()
        .map_err(|values: Vec<T>| anyhow!("{what} must have {N} values (got {})", values.len()))
}

fn build_base_capacity(
    kind: BaseCapacityType,
    distribution: Option<DistributionSpec>,
    timeseries_file: Option<PathBuf>,
    model_dir: &Path,
    timeslots: usize,
) -> Result<BaseCapacity> {
    match kind {
        BaseCapacityType::Population | BaseCapacityType::Individual => {
            ensure!(
                timeseries_file.is_none(),
                "timeseries_file can only be given for the timeseries base capacity type"
            );
            let spec = distribution
                .context("A distribution must be given for stochastic base capacity")?;
            let source = StochasticDrawSource::new(spec)?;
            Ok(if kind == BaseCapacityType::Population {
                BaseCapacity::Population(source)
            } else {
                BaseCapacity::Individual(source)
            })
        }
        BaseCapacityType::Timeseries => {
            ensure!(
                distribution.is_none(),
                "A distribution cannot be given for the timeseries base capacity type"
            );
            let file_name = timeseries_file
                .context("timeseries_file must be given for the timeseries base capacity type")?;
            let series = read_timeseries(&model_dir.join(file_name), timeslots)?;
            Ok(BaseCapacity::Timeseries(series))
        }
    }
}

/// Parse the table for a weather channel, checking it is given if the channel is active
fn build_weather_table(kind: InfluenceKind, map: &str, channel: &str) -> Result<WeatherTable> {
    let table =
        parse_range_map(map).with_context(|| format!("Invalid {channel}_map in weather"))?;
    if kind != InfluenceKind::None {
        ensure!(
            !table.is_empty(),
            "{channel} has an influence on capacity but {channel}_map is empty"
        );
    }

    Ok(table)
}

fn build_weather_influence(raw: WeatherRaw) -> Result<WeatherInfluence> {
    for (kind, channel) in [
        (raw.wind_speed, "wind_speed"),
        (raw.wind_direction, "wind_direction"),
        (raw.cloud_cover, "cloud_cover"),
    ] {
        ensure!(
            kind != InfluenceKind::Deviation,
            "Deviation influence is only supported for temperature (found for {channel})"
        );
    }
    ensure!(
        raw.temperature_reference.is_finite(),
        "temperature_reference must be finite"
    );
    if raw.wind_direction != InfluenceKind::None && raw.wind_speed == InfluenceKind::None {
        warn!("wind_direction influence has no effect unless wind_speed also has an influence");
    }

    Ok(WeatherInfluence {
        temperature_map: build_weather_table(raw.temperature, &raw.temperature_map, "temperature")?,
        wind_speed_map: build_weather_table(raw.wind_speed, &raw.wind_speed_map, "wind_speed")?,
        wind_direction_map: build_weather_table(
            raw.wind_direction,
            &raw.wind_direction_map,
            "wind_direction",
        )?,
        cloud_cover_map: build_weather_table(raw.cloud_cover, &raw.cloud_cover_map, "cloud_cover")?,
        temperature: raw.temperature,
        wind_speed: raw.wind_speed,
        wind_direction: raw.wind_direction,
        cloud_cover: raw.cloud_cover,
        temperature_reference: raw.temperature_reference,
    })
}

/// Parse a stepwise elasticity map, e.g. `"0.8:1.1, 1.2:0.95"`
fn parse_ratio_map(s: &str) -> Result<Vec<(f64, f64)>> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (ratio, factor) = entry.split_once(':').with_context(|| {
                format!("Elasticity map entry '{entry}' must have the form ratio:factor")
            })?;
            let parse = |value: &str| {
                value
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid number in elasticity map entry '{entry}'"))
            };
            Ok((parse(ratio)?, parse(factor)?))
        })
        .collect()
}

fn build_elasticity(raw: Option<ElasticityRaw>) -> Result<ElasticityModel> {
    let model = match raw {
        None => ElasticityModel::Stepwise(StepwiseElasticity::default()),
        Some(ElasticityRaw::Continuous {
            ratio,
            range: [low, high],
        }) => ElasticityModel::Continuous(ContinuousElasticity::new(ratio, low, high)?),
        Some(ElasticityRaw::Stepwise { map }) => {
            let pairs = parse_ratio_map(&map)?;
            if pairs.is_empty() {
                bail!("Stepwise elasticity map cannot be empty");
            }
            ElasticityModel::Stepwise(StepwiseElasticity::new(pairs)?)
        }
    };

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableKind;
    use crate::fixture::{assert_error, tariff};
    use crate::tariff::Tariff;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[fixture]
    fn tariffs(tariff: Tariff) -> TariffMap {
        indexmap! { tariff.id.clone() => Rc::new(tariff) }
    }

    /// A customers file with one bundle, with `profile_extra` appended to the profile table
    fn customers_toml(distribution: &str, profile_extra: &str) -> String {
        format!(
            "[[customers]]
name = \"Village\"
population = 1000

[[customers.bundles]]
id = \"homes\"
capacity_type = \"consumption\"
subscriptions = [{{ tariff = \"flat\", customers = 500 }}]

[customers.bundles.profile]
base_capacity_type = \"population\"
distribution = {distribution}
benchmark_rates = [{}]
{profile_extra}",
            ["0.1"; HOURS_PER_DAY].join(", ")
        )
    }

    fn parse(contents: &str) -> Vec<CustomerRaw> {
        toml::from_str::<CustomersFile>(contents).unwrap().customers
    }

    fn build(contents: &str, tariffs: &TariffMap) -> Result<Vec<Customer>> {
        build_customers(parse(contents), Path::new("."), tariffs, 24)
    }

    const NORMAL: &str = "{ type = \"normal\", mean = 100.0, std_dev = 5.0 }";

    #[rstest]
    fn test_build_customers(tariffs: TariffMap) {
        let customers = build(&customers_toml(NORMAL, ""), &tariffs).unwrap();
        assert_eq!(customers.len(), 1);

        let customer = &customers[0];
        assert_eq!(
            *customer.profile,
            CustomerProfile {
                name: "Village".into(),
                population: 1000
            }
        );

        let bundle = &customer.bundles[0];
        assert_eq!(bundle.id, BundleID::new("homes"));
        assert_eq!(
            bundle.subscriptions,
            [BundleSubscription {
                tariff_id: "flat".into(),
                customers: 500
            }]
        );
        assert_eq!(
            bundle.profile.base_capacity.kind(),
            BaseCapacityType::Population
        );
        assert_eq!(bundle.profile.daily_skew, [1.0; DAYS_PER_WEEK]);
        assert_eq!(bundle.profile.hourly_skew, [1.0; HOURS_PER_DAY]);
        assert!(!bundle.profile.weather.is_active());
        assert_eq!(
            bundle.profile.elasticity,
            ElasticityModel::Stepwise(StepwiseElasticity::default())
        );
    }

    #[rstest]
    fn test_build_customers_weather_and_elasticity(tariffs: TariffMap) {
        let extra = "daily_skew = [1.0, 1.0, 1.0, 1.0, 1.0, 0.8, 0.7]

[customers.bundles.profile.weather]
temperature = \"deviation\"
temperature_map = \"-30~19:0.02, 21~40:0.05\"
temperature_reference = 20.0
cloud_cover = \"direct\"
cloud_cover_map = \"0~10:1.0\"

[customers.bundles.profile.elasticity]
type = \"stepwise\"
map = \"1.2:0.9, 0.8:1.1\"
";
        let customers = build(&customers_toml(NORMAL, extra), &tariffs).unwrap();
        let profile = &customers[0].bundles[0].profile;
        assert_eq!(profile.daily_skew[5], 0.8);
        assert_eq!(profile.weather.temperature, InfluenceKind::Deviation);
        assert_eq!(
            profile.weather.cloud_cover_map.lookup(10, TableKind::CloudCover),
            Ok(1.0)
        );
        assert_eq!(
            profile.elasticity,
            ElasticityModel::Stepwise(StepwiseElasticity::new(vec![(0.8, 1.1), (1.2, 0.9)]).unwrap())
        );
    }

    #[rstest]
    fn test_build_customers_continuous_elasticity(tariffs: TariffMap) {
        let extra = "elasticity = { type = \"continuous\", ratio = -0.1, range = [0.5, 1.5] }";
        let customers = build(&customers_toml(NORMAL, extra), &tariffs).unwrap();
        assert_eq!(
            customers[0].bundles[0].profile.elasticity,
            ElasticityModel::Continuous(ContinuousElasticity::new(-0.1, 0.5, 1.5).unwrap())
        );
    }

    #[rstest]
    fn test_build_customers_timeseries(tariffs: TariffMap) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join("homes.csv")).unwrap();
            writeln!(file, "value\n1.0\n2.0").unwrap();
        }

        let contents = customers_toml(NORMAL, "").replace(
            &format!("base_capacity_type = \"population\"\ndistribution = {NORMAL}"),
            "base_capacity_type = \"timeseries\"\ntimeseries_file = \"homes.csv\"",
        );
        let customers = build_customers(parse(&contents), dir.path(), &tariffs, 2).unwrap();
        assert_eq!(
            customers[0].bundles[0].profile.base_capacity.kind(),
            BaseCapacityType::Timeseries
        );
    }

    #[rstest]
    fn test_build_customers_zero_population(tariffs: TariffMap) {
        let contents = customers_toml(NORMAL, "").replace("population = 1000", "population = 0");
        assert_error!(build(&contents, &tariffs), "Invalid customer Village");
        let err = build(&contents, &tariffs).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Population must be greater than zero"
        );
    }

    #[rstest]
    #[case(
        customers_toml(NORMAL, "").replace("customers = 500", "customers = 5000"),
        "Subscription to tariff flat has 5000 customers, more than the population of 1000"
    )]
    #[case(
        customers_toml(NORMAL, "").replace("tariff = \"flat\"", "tariff = \"peak\""),
        "Unknown tariff peak in subscription"
    )]
    #[case(
        customers_toml("{ type = \"normal\", mean = 100.0, std_dev = nan }", ""),
        "Invalid parameters for normal distribution"
    )]
    #[case(
        customers_toml(NORMAL, "hourly_skew = [1.0, 2.0]"),
        "hourly_skew must have 24 values (got 2)"
    )]
    #[case(
        customers_toml(NORMAL, "timeseries_file = \"homes.csv\""),
        "timeseries_file can only be given for the timeseries base capacity type"
    )]
    #[case(
        customers_toml(NORMAL, "weather = { wind_speed = \"deviation\", wind_speed_map = \"0:1.0\" }"),
        "Deviation influence is only supported for temperature (found for wind_speed)"
    )]
    #[case(
        customers_toml(NORMAL, "weather = { temperature = \"direct\" }"),
        "temperature has an influence on capacity but temperature_map is empty"
    )]
    #[case(
        customers_toml(NORMAL, "elasticity = { type = \"continuous\", ratio = -0.1, range = [1.5, 0.5] }"),
        "Elasticity range must have low <= high (got 1.5~0.5)"
    )]
    #[case(
        customers_toml(NORMAL, "elasticity = { type = \"stepwise\", map = \"\" }"),
        "Stepwise elasticity map cannot be empty"
    )]
    fn test_build_customers_invalid_bundle(
        tariffs: TariffMap,
        #[case] contents: String,
        #[case] msg: &str,
    ) {
        let err = build(&contents, &tariffs).unwrap_err();
        let messages: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(messages[..2], ["Invalid customer Village", "Invalid bundle homes"]);
        assert!(
            messages.iter().any(|message| message.starts_with(msg)),
            "{msg} not found in {messages:?}"
        );
    }

    #[rstest]
    fn test_build_customers_duplicate_name(tariffs: TariffMap) {
        let single = customers_toml(NORMAL, "");
        let contents = format!("{single}\n{single}");
        assert_error!(
            build(&contents, &tariffs),
            "Duplicate customer name found: Village"
        );
    }

    #[test]
    fn test_parse_ratio_map() {
        assert_eq!(
            parse_ratio_map("0.8:1.1, 1.2 : 0.95,").unwrap(),
            [(0.8, 1.1), (1.2, 0.95)]
        );
        assert!(parse_ratio_map("0.8").is_err());
        assert!(parse_ratio_map("a:1.0").is_err());
    }

    #[test]
    fn test_deny_unknown_fields() {
        let contents = "[[customers]]\nname = \"a\"\npopulation = 1\ncolour = \"blue\"";
        assert!(toml::from_str::<CustomersFile>(contents).is_err());
    }
}
