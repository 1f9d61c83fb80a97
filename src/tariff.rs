//! Tariffs and the subscriptions through which customers are charged for capacity.
use crate::id::define_id_type;
use crate::profile::HOURS_PER_DAY;
use crate::units::{Capacity, Money, MoneyPerCapacity};
use anyhow::{Result, ensure};
use chrono::{NaiveDateTime, Timelike};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {TariffID}

/// A map of tariffs, keyed by ID
pub type TariffMap = IndexMap<TariffID, Rc<Tariff>>;

/// A contract between a tariff and some members of a customer population
pub trait Subscription {
    /// The ID of the subscribed tariff
    fn tariff_id(&self) -> &TariffID;

    /// Number of customers currently committed to the contract
    fn customers_committed(&self) -> u32;

    /// The charge for using `quantity` at `instant`, given the usage so far
    fn usage_charge(
        &self,
        instant: NaiveDateTime,
        quantity: Capacity,
        cumulative_usage: Capacity,
    ) -> Money;

    /// Cumulative usage under this subscription
    fn total_usage(&self) -> Capacity;
}

/// A tariff charging a per-unit rate that can vary with the hour of day
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    /// Unique identifier for the tariff
    pub id: TariffID,
    /// Either a single flat rate or one rate per hour of day
    rates: Vec<MoneyPerCapacity>,
}

impl Tariff {
    /// Create a new tariff from either one flat rate or 24 hourly rates
    pub fn new(id: TariffID, rates: Vec<MoneyPerCapacity>) -> Result<Self> {
        ensure!(
            rates.len() == 1 || rates.len() == HOURS_PER_DAY,
            "Tariff {id} must have 1 or {HOURS_PER_DAY} rates (got {})",
            rates.len()
        );
        ensure!(
            rates.iter().all(|rate| rate.is_finite() && rate.value() > 0.0),
            "Tariff {id} rates must be finite and greater than zero"
        );

        Ok(Self { id, rates })
    }

    /// The per-unit rate applying at the given instant
    pub fn rate_at(&self, instant: NaiveDateTime) -> MoneyPerCapacity {
        if self.rates.len() == 1 {
            self.rates[0]
        } else {
            self.rates[instant.hour() as usize]
        }
    }
}

/// A subscription of some of a customer population to a tariff
#[derive(Debug, Clone)]
pub struct TariffSubscription {
    tariff: Rc<Tariff>,
    customers_committed: u32,
    total_usage: Capacity,
}

impl TariffSubscription {
    /// Create a new subscription with no usage recorded
    pub fn new(tariff: Rc<Tariff>, customers_committed: u32) -> Self {
        Self {
            tariff,
            customers_committed,
            total_usage: Capacity(0.0),
        }
    }

    /// Add usage for a timeslot to the cumulative total
    pub fn record_usage(&mut self, usage: Capacity) {
        self.total_usage += usage;
    }
}

impl Subscription for TariffSubscription {
    fn tariff_id(&self) -> &TariffID {
        &self.tariff.id
    }

    fn customers_committed(&self) -> u32 {
        self.customers_committed
    }

    fn usage_charge(
        &self,
        instant: NaiveDateTime,
        quantity: Capacity,
        _cumulative_usage: Capacity,
    ) -> Money {
        self.tariff.rate_at(instant) * quantity
    }

    fn total_usage(&self) -> Capacity {
        self.total_usage
    }
}
