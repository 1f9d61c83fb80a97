//! Fixtures for tests

use crate::distribution::{DistributionSpec, StochasticDrawSource};
use crate::elasticity::{ElasticityModel, StepwiseElasticity};
use crate::profile::{BaseCapacity, CapacityProfile, CapacityType, CustomerProfile};
use crate::tariff::{Tariff, TariffSubscription};
use crate::time_slot::Clock;
use crate::units::MoneyPerCapacity;
use crate::weather::{WeatherInfluence, WeatherReport, WeatherSource};
use chrono::{NaiveDate, NaiveDateTime};
use rstest::fixture;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A clock which never moves
pub struct StaticClock(pub NaiveDateTime);

impl Clock for StaticClock {
    fn current_time(&self) -> NaiveDateTime {
        self.0
    }
}

/// A weather source which always gives the same report
pub struct StaticWeather(pub Option<WeatherReport>);

impl WeatherSource for StaticWeather {
    fn current_report(&self) -> Option<WeatherReport> {
        self.0
    }
}

/// Monday 6th January 2025, 14:00
pub fn monday_afternoon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

#[fixture]
pub fn customer_profile() -> CustomerProfile {
    CustomerProfile {
        name: "Village".into(),
        population: 1000,
    }
}

/// A profile drawing 100.0 every timeslot with no skew, weather or price response
#[fixture]
pub fn capacity_profile() -> CapacityProfile {
    let source = StochasticDrawSource::new(DistributionSpec::Degenerate { value: 100.0 }).unwrap();
    CapacityProfile {
        base_capacity: BaseCapacity::Population(source),
        daily_skew: [1.0; 7],
        hourly_skew: [1.0; 24],
        weather: WeatherInfluence::default(),
        benchmark_rates: [MoneyPerCapacity(0.1); 24],
        elasticity: ElasticityModel::Stepwise(StepwiseElasticity::default()),
        capacity_type: CapacityType::Consumption,
    }
}

#[fixture]
pub fn tariff() -> Tariff {
    Tariff::new("flat".into(), vec![MoneyPerCapacity(0.1)]).unwrap()
}

/// Half of the [`customer_profile`] population on the flat [`tariff`]
#[fixture]
pub fn subscription(tariff: Tariff) -> TariffSubscription {
    TariffSubscription::new(Rc::new(tariff), 500)
}
