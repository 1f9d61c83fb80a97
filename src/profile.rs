//! Profiles describing how a customer population draws or produces capacity.
use crate::distribution::StochasticDrawSource;
use crate::elasticity::ElasticityModel;
use crate::id::define_id_type;
use crate::tariff::TariffID;
use crate::timeseries::TimeSeriesSampler;
use crate::units::MoneyPerCapacity;
use crate::weather::WeatherInfluence;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::rc::Rc;

define_id_type! {BundleID}

/// Number of days in a week
pub const DAYS_PER_WEEK: usize = 7;

/// Number of hours in a day
pub const HOURS_PER_DAY: usize = 24;

/// Whether a capacity bundle consumes or produces energy
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum, strum::Display)]
pub enum CapacityType {
    /// The bundle draws energy
    #[string = "consumption"]
    #[strum(serialize = "consumption")]
    Consumption,
    /// The bundle produces energy
    #[string = "production"]
    #[strum(serialize = "production")]
    Production,
}

/// The kind of base capacity, as written in input files
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum)]
pub enum BaseCapacityType {
    /// One draw for the whole population
    #[string = "population"]
    Population,
    /// One draw per member of the population, summed
    #[string = "individual"]
    Individual,
    /// Replay of a time series
    #[string = "timeseries"]
    Timeseries,
}

/// How the base capacity for each timeslot is obtained
#[derive(Debug, Clone)]
pub enum BaseCapacity {
    /// A single draw scaled to the whole population's aggregate
    Population(StochasticDrawSource),
    /// The sum of one draw per member of the population
    Individual(StochasticDrawSource),
    /// The next value of a pre-loaded time series
    Timeseries(TimeSeriesSampler),
}

impl BaseCapacity {
    /// The kind of base capacity
    pub fn kind(&self) -> BaseCapacityType {
        match self {
            Self::Population(_) => BaseCapacityType::Population,
            Self::Individual(_) => BaseCapacityType::Individual,
            Self::Timeseries(_) => BaseCapacityType::Timeseries,
        }
    }
}

/// The population a capacity bundle belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    /// Display name of the customer
    pub name: String,
    /// Number of individuals in the population
    pub population: u32,
}

/// Everything needed to compute one bundle's capacity in each timeslot
#[derive(Debug, Clone)]
pub struct CapacityProfile {
    /// How the base capacity is obtained
    pub base_capacity: BaseCapacity,
    /// Multiplier for each day of the week, Monday first
    pub daily_skew: [f64; DAYS_PER_WEEK],
    /// Multiplier for each hour of the day, midnight first
    pub hourly_skew: [f64; HOURS_PER_DAY],
    /// Weather response
    pub weather: WeatherInfluence,
    /// Reference price for each hour of the day
    pub benchmark_rates: [MoneyPerCapacity; HOURS_PER_DAY],
    /// Price response
    pub elasticity: ElasticityModel,
    /// Whether the owning bundle consumes or produces
    pub capacity_type: CapacityType,
}

impl CapacityProfile {
    /// The combined periodic skew for the given day of week (1 to 7) and hour of day (0 to 23)
    pub fn periodic_skew(&self, day_of_week: u32, hour_of_day: u32) -> f64 {
        self.daily_skew[day_of_week as usize - 1] * self.hourly_skew[hour_of_day as usize]
    }
}

/// Some of a population's members committed to a tariff
#[derive(Debug, Clone, PartialEq)]
pub struct BundleSubscription {
    /// The tariff subscribed to
    pub tariff_id: TariffID,
    /// Number of customers committed
    pub customers: u32,
}

/// A capacity profile together with the subscriptions it serves
#[derive(Debug, Clone)]
pub struct CapacityBundle {
    /// Identifier, unique within the owning customer
    pub id: BundleID,
    /// How capacity is computed
    pub profile: CapacityProfile,
    /// Subscriptions served by this bundle
    pub subscriptions: Vec<BundleSubscription>,
}

/// A customer population and its capacity bundles
#[derive(Debug, Clone)]
pub struct Customer {
    /// The population
    pub profile: Rc<CustomerProfile>,
    /// The population's capacity bundles
    pub bundles: Vec<CapacityBundle>,
}
