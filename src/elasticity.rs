//! Models translating a tariff's rate ratio into a capacity multiplier.
//!
//! The rate ratio is the effective per-unit price a customer would pay for this timeslot divided by
//! the benchmark price for the same hour of the day.
use crate::profile::CapacityType;
use anyhow::{Result, ensure};
use log::warn;

/// Rate ratios within this distance of parity leave stepwise capacity unchanged
const PARITY_BAND: f64 = 0.01;

/// A price elasticity model
#[derive(Debug, Clone, PartialEq)]
pub enum ElasticityModel {
    /// A linear response clamped to a band
    Continuous(ContinuousElasticity),
    /// A step function of the rate ratio
    Stepwise(StepwiseElasticity),
}

impl ElasticityModel {
    /// The capacity multiplier for the given rate ratio
    pub fn capacity_factor(&self, rate_ratio: f64, capacity_type: CapacityType) -> f64 {
        match self {
            Self::Continuous(model) => model.capacity_factor(rate_ratio),
            Self::Stepwise(model) => model.capacity_factor(rate_ratio, capacity_type),
        }
    }
}

/// Capacity changes by `ratio` for every 1% change in price, within `[low, high]`
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousElasticity {
    ratio: f64,
    low: f64,
    high: f64,
}

impl ContinuousElasticity {
    /// Create a new continuous elasticity model.
    ///
    /// # Arguments
    ///
    /// * `ratio` - Fractional change in capacity per percentage point change in price
    /// * `low` - Smallest multiplier which can be returned
    /// * `high` - Largest multiplier which can be returned
    pub fn new(ratio: f64, low: f64, high: f64) -> Result<Self> {
        ensure!(
            ratio.is_finite() && low.is_finite() && high.is_finite(),
            "Elasticity ratio and range must be finite"
        );
        ensure!(
            low <= high,
            "Elasticity range must have low <= high (got {low}~{high})"
        );

        Ok(Self { ratio, low, high })
    }

    /// The capacity multiplier for the given rate ratio
    pub fn capacity_factor(&self, rate_ratio: f64) -> f64 {
        let percent_change = (rate_ratio - 1.0) / 0.01;
        (1.0 + percent_change * self.ratio).clamp(self.low, self.high)
    }
}

/// A capacity multiplier for each of a sorted set of rate ratio breakpoints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepwiseElasticity {
    /// `(rate_ratio, capacity_factor)` pairs, sorted by rate ratio with no duplicates
    breakpoints: Vec<(f64, f64)>,
}

impl StepwiseElasticity {
    /// Create a new stepwise model from an unordered set of `(rate_ratio, capacity_factor)` pairs.
    ///
    /// If a breakpoint appears more than once, the first occurrence is used.
    pub fn new(pairs: Vec<(f64, f64)>) -> Result<Self> {
        ensure!(
            pairs.iter().all(|(r, f)| r.is_finite() && f.is_finite()),
            "Stepwise elasticity entries must be finite"
        );

        let mut breakpoints = pairs;
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0)); // stable
        let len = breakpoints.len();
        breakpoints.dedup_by(|later, earlier| later.0 == earlier.0);
        if breakpoints.len() < len {
            warn!("Duplicate rate ratios in stepwise elasticity map; using first occurrence");
        }

        Ok(Self { breakpoints })
    }

    /// The breakpoints in ascending order of rate ratio
    pub fn breakpoints(&self) -> &[(f64, f64)] {
        &self.breakpoints
    }

    /// The capacity multiplier for the given rate ratio.
    ///
    /// Below parity, the factor of the nearest breakpoint at or above the rate ratio is used; at or
    /// above parity, the factor of the nearest breakpoint at or below it. Missing neighbours count
    /// as a factor of 1.0.
    pub fn capacity_factor(&self, rate_ratio: f64, capacity_type: CapacityType) -> f64 {
        if (rate_ratio - 1.0).abs() < PARITY_BAND || self.breakpoints.is_empty() {
            return 1.0;
        }

        // Cheaper consumption or dearer production gives no reason to cut back
        match capacity_type {
            CapacityType::Consumption if rate_ratio < 1.0 => return 1.0,
            CapacityType::Production if rate_ratio > 1.0 => return 1.0,
            _ => {}
        }

        if rate_ratio < 1.0 {
            let upper = self.breakpoints.partition_point(|(r, _)| *r < rate_ratio);
            self.breakpoints.get(upper).map_or(1.0, |(_, factor)| *factor)
        } else {
            let above = self.breakpoints.partition_point(|(r, _)| *r <= rate_ratio);
            above
                .checked_sub(1)
                .map_or(1.0, |lower| self.breakpoints[lower].1)
        }
    }
}
