//! Draws base capacities and adjusts them for each subscription in each timeslot.
//!
//! A [`CapacityEngine`] is owned by a single capacity bundle. Timeslots must be stepped through in
//! order, because each base capacity is smoothed with the one before it.
use crate::error::{CapacityError, CapacityStage, TableKind};
use crate::profile::{BaseCapacity, CapacityProfile, CustomerProfile};
use crate::tariff::Subscription;
use crate::time_slot::{Clock, Timeslot};
use crate::units::{Capacity, Dimensionless};
use crate::weather::WeatherSource;
use log::{debug, error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::rc::Rc;

/// Capacities closer to zero than this are not adjusted for tariff rates
const NEAR_ZERO_CAPACITY: f64 = 0.01;

/// How many machine epsilons, relative to the input, a value may be from a whole number of
/// hundredths and still count as having 2 decimals
const TRUNCATION_EPSILONS: f64 = 4.0;

/// Truncate to 2 decimal places, towards zero.
///
/// A value within representation error of a whole number of hundredths is taken to be that
/// number, so truncating twice gives the same result as truncating once. This can round up in
/// magnitude by at most a few ULPs.
pub fn truncate_to_2_decimals(x: f64) -> f64 {
    let whole = x.trunc();
    let scaled = (x - whole) * 100.0;
    let nearest = scaled.round();
    let tolerance = TRUNCATION_EPSILONS * f64::EPSILON * 100.0 * x.abs().max(1.0);
    let hundredths = if (scaled - nearest).abs() <= tolerance {
        nearest
    } else {
        scaled.trunc()
    };

    whole + hundredths / 100.0
}

/// Base and adjusted capacities for each timeslot drawn so far.
///
/// Both sequences start with a 0.0 entry for timeslot 0, so index `t` holds timeslot `t`. The
/// adjusted entry for a timeslot is the total over all subscriptions served in that timeslot.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityHistory {
    base: Vec<Capacity>,
    adjusted: Vec<Capacity>,
}

impl Default for CapacityHistory {
    fn default() -> Self {
        Self {
            base: vec![Capacity(0.0)],
            adjusted: vec![Capacity(0.0)],
        }
    }
}

impl CapacityHistory {
    /// Base capacities by timeslot
    pub fn base(&self) -> &[Capacity] {
        &self.base
    }

    /// Adjusted capacities by timeslot
    pub fn adjusted(&self) -> &[Capacity] {
        &self.adjusted
    }

    /// The next timeslot for which a base capacity can be drawn
    fn next_base_timeslot(&self) -> usize {
        self.base.len()
    }

    /// Whether an adjusted capacity can be recorded for `timeslot`.
    ///
    /// This is the case for the timeslot after the last recorded one, or for the last recorded one
    /// (when serving another subscription in the same timeslot).
    fn can_record_adjusted(&self, timeslot: usize) -> bool {
        timeslot == self.adjusted.len() || timeslot + 1 == self.adjusted.len()
    }

    fn record_adjusted(&mut self, timeslot: usize, capacity: Capacity) {
        if timeslot == self.adjusted.len() {
            self.adjusted.push(capacity);
        } else {
            self.adjusted[timeslot] += capacity;
        }
    }
}

/// Computes base and adjusted capacity for one capacity bundle
pub struct CapacityEngine {
    customer: Rc<CustomerProfile>,
    profile: CapacityProfile,
    clock: Rc<dyn Clock>,
    weather: Rc<dyn WeatherSource>,
    rng: StdRng,
    history: CapacityHistory,
    halted: bool,
}

impl CapacityEngine {
    /// Create a new capacity engine.
    ///
    /// # Arguments
    ///
    /// * `customer` - The population the bundle belongs to
    /// * `profile` - How the bundle's capacity is computed
    /// * `clock` - Source of the current day of week and hour of day
    /// * `weather` - Source of the current weather observation
    /// * `seed` - Seed for the engine's random number generator
    pub fn new(
        customer: Rc<CustomerProfile>,
        profile: CapacityProfile,
        clock: Rc<dyn Clock>,
        weather: Rc<dyn WeatherSource>,
        seed: u64,
    ) -> Result<Self, CapacityError> {
        let configuration_error = |message: &str| CapacityError::Configuration {
            customer: customer.name.clone(),
            message: message.to_string(),
        };

        if customer.population == 0 {
            return Err(configuration_error("population must be greater than zero"));
        }
        if !profile
            .benchmark_rates
            .iter()
            .all(|rate| rate.is_finite() && rate.value() > 0.0)
        {
            return Err(configuration_error(
                "benchmark rates must be finite and greater than zero",
            ));
        }

        Ok(Self {
            customer,
            profile,
            clock,
            weather,
            rng: StdRng::seed_from_u64(seed),
            history: CapacityHistory::default(),
            halted: false,
        })
    }

    /// Name of the customer this engine belongs to
    pub fn name(&self) -> &str {
        &self.customer.name
    }

    /// The capacities computed so far
    pub fn history(&self) -> &CapacityHistory {
        &self.history
    }

    /// Whether the engine has stopped because of an earlier failure
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn ensure_running(&self) -> Result<(), CapacityError> {
        if self.halted {
            Err(CapacityError::Halted {
                customer: self.name().to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Stop the engine if `result` holds a fatal error
    fn halt_on_error<T>(&mut self, result: Result<T, CapacityError>) -> Result<T, CapacityError> {
        if let Err(err) = &result {
            if !matches!(err, CapacityError::NonContiguousTimeslot { .. }) {
                self.halted = true;
            }
        }
        result
    }

    fn non_contiguous(&self, requested: usize, next: usize) -> CapacityError {
        CapacityError::NonContiguousTimeslot {
            customer: self.name().to_string(),
            requested,
            next,
        }
    }

    /// Get the base capacity for a timeslot, drawing a new sample if it has not been drawn yet.
    ///
    /// Repeated calls for the same timeslot return the stored value.
    pub fn get_base_capacity(&mut self, timeslot: usize) -> Result<Capacity, CapacityError> {
        self.ensure_running()?;
        if let Some(capacity) = self.history.base.get(timeslot) {
            return Ok(*capacity);
        }

        let result = self.draw_base_capacity_sample(timeslot);
        self.halt_on_error(result)
    }

    /// Draw, smooth and record a new base capacity sample.
    ///
    /// `timeslot` must be the timeslot after the last one drawn.
    pub fn draw_base_capacity_sample(
        &mut self,
        timeslot: usize,
    ) -> Result<Capacity, CapacityError> {
        let next = self.history.next_base_timeslot();
        if timeslot != next {
            return Err(self.non_contiguous(timeslot, next));
        }

        let raw = match &self.profile.base_capacity {
            BaseCapacity::Population(source) => source.draw_sample(&mut self.rng),
            BaseCapacity::Individual(source) => (0..self.customer.population)
                .map(|_| source.draw_sample(&mut self.rng))
                .sum::<f64>(),
            BaseCapacity::Timeseries(series) => series.value_at(timeslot).map_err(|err| {
                error!(
                    "{}: Tried to get base capacity from time series at index beyond maximum: {err}",
                    self.customer.name
                );
                CapacityError::OutOfRange {
                    customer: self.customer.name.clone(),
                    timeslot,
                    len: err.len,
                }
            })?,
        };

        // Smoothing
        let smoothed = if timeslot > 1 {
            (raw + self.history.base[timeslot - 1].value()) / 2.0
        } else {
            raw
        };

        let capacity = Capacity(truncate_to_2_decimals(smoothed));
        self.history.base.push(capacity);
        Ok(capacity)
    }

    /// Compute the final adjusted capacity for one subscription in one timeslot.
    ///
    /// The adjustments are applied in a fixed order: population ratio, periodic skew, weather and
    /// finally tariff rates.
    pub fn use_capacity(
        &mut self,
        timeslot: &Timeslot,
        subscription: &dyn Subscription,
    ) -> Result<Capacity, CapacityError> {
        self.ensure_running()?;
        let t = timeslot.serial_number;
        if !self.history.can_record_adjusted(t) {
            return Err(self.non_contiguous(t, self.history.adjusted.len()));
        }

        let result = self.compute_adjusted_capacity(timeslot, subscription);
        let capacity = self.halt_on_error(result)?;
        self.history.record_adjusted(t, capacity);
        info!(
            "{}: Adjusted capacity for tariff {} = {capacity}",
            self.name(),
            subscription.tariff_id()
        );

        Ok(capacity)
    }

    fn compute_adjusted_capacity(
        &mut self,
        timeslot: &Timeslot,
        subscription: &dyn Subscription,
    ) -> Result<Capacity, CapacityError> {
        let t = timeslot.serial_number;
        let base = self.get_base_capacity(t)?;
        if base.is_nan() {
            return Err(self.invalid_value(t, CapacityStage::Base));
        }
        debug!("{}: Base capacity for timeslot {t} = {base}", self.name());

        let mut capacity = base;
        capacity = self.adjust_for_population_ratio(capacity, subscription);
        capacity = self.adjust_for_periodic_skew(capacity);
        capacity = self.adjust_for_weather(t, capacity)?;
        capacity = self.adjust_for_tariff_rates(timeslot, subscription, capacity);
        if capacity.is_nan() {
            return Err(self.invalid_value(t, CapacityStage::Adjusted));
        }

        Ok(Capacity(truncate_to_2_decimals(capacity.value())))
    }

    fn invalid_value(&self, timeslot: usize, stage: CapacityStage) -> CapacityError {
        CapacityError::InvalidValue {
            customer: self.name().to_string(),
            timeslot,
            stage,
        }
    }

    fn adjust_for_population_ratio(
        &self,
        capacity: Capacity,
        subscription: &dyn Subscription,
    ) -> Capacity {
        let ratio = f64::from(subscription.customers_committed())
            / f64::from(self.customer.population);
        debug!("{}: population ratio = {ratio}", self.name());
        capacity * Dimensionless(ratio)
    }

    fn adjust_for_periodic_skew(&self, capacity: Capacity) -> Capacity {
        let skew = self
            .profile
            .periodic_skew(self.clock.day_of_week(), self.clock.hour_of_day());
        debug!("{}: periodic skew = {skew}", self.name());
        capacity * Dimensionless(skew)
    }

    fn adjust_for_weather(
        &self,
        timeslot: usize,
        capacity: Capacity,
    ) -> Result<Capacity, CapacityError> {
        let influence = &self.profile.weather;
        if !influence.is_active() {
            return Ok(capacity);
        }

        let report = self
            .weather
            .current_report()
            .ok_or_else(|| CapacityError::MissingTableEntry {
                customer: self.name().to_string(),
                timeslot,
                table: TableKind::WeatherReport,
                key: i64::try_from(timeslot).unwrap_or(i64::MAX),
            })?;
        debug!(
            "{}: weather = ({}, {}, {}, {})",
            self.name(),
            report.temperature,
            report.wind_speed,
            report.wind_direction,
            report.cloud_cover
        );

        let factor = influence
            .weather_factor(&report)
            .map_err(|err| CapacityError::MissingTableEntry {
                customer: self.name().to_string(),
                timeslot,
                table: err.table,
                key: err.key,
            })?;
        debug!("{}: weather factor = {factor}", self.name());

        Ok(capacity * Dimensionless(factor))
    }

    fn adjust_for_tariff_rates(
        &self,
        timeslot: &Timeslot,
        subscription: &dyn Subscription,
        capacity: Capacity,
    ) -> Capacity {
        if capacity.value().abs() < NEAR_ZERO_CAPACITY {
            return capacity;
        }

        let charge = subscription.usage_charge(timeslot.start, capacity, subscription.total_usage());
        let rate = charge / capacity;
        let benchmark = self.profile.benchmark_rates[self.clock.hour_of_day() as usize];
        let rate_ratio = rate / benchmark;

        let factor = self
            .profile
            .elasticity
            .capacity_factor(rate_ratio.0, self.profile.capacity_type);
        debug!(
            "{}: rate ratio = {}, tariff rates factor = {factor}",
            self.name(),
            rate_ratio.0
        );

        capacity * Dimensionless(factor)
    }
}
