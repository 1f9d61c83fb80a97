//! Errors raised while computing capacities.
//!
//! None of these are recovered locally. They propagate to the caller of the capacity engine, which
//! is expected to stop stepping the affected customer bundle.
use thiserror::Error;

/// The table in which a lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TableKind {
    /// Temperature influence table
    #[strum(serialize = "temperature")]
    Temperature,
    /// Wind speed influence table
    #[strum(serialize = "wind speed")]
    WindSpeed,
    /// Wind direction influence table
    #[strum(serialize = "wind direction")]
    WindDirection,
    /// Cloud cover influence table
    #[strum(serialize = "cloud cover")]
    CloudCover,
    /// Weather reports by timeslot
    #[strum(serialize = "weather report")]
    WeatherReport,
}

/// Which capacity value was found to be invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CapacityStage {
    /// The (smoothed) base capacity
    #[strum(serialize = "base")]
    Base,
    /// The capacity after all adjustments
    #[strum(serialize = "adjusted")]
    Adjusted,
}

/// An error raised by the capacity engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityError {
    /// A profile or customer setting is unusable
    #[error("{customer}: invalid configuration: {message}")]
    Configuration {
        /// Name of the customer
        customer: String,
        /// What is wrong
        message: String,
    },
    /// A time series was asked for a value beyond its end
    #[error("{customer}: time series has {len} values but timeslot {timeslot} was requested")]
    OutOfRange {
        /// Name of the customer
        customer: String,
        /// The requested timeslot
        timeslot: usize,
        /// Number of values in the series
        len: usize,
    },
    /// A computed capacity is NaN
    #[error("{customer}: {stage} capacity is NaN for timeslot {timeslot}")]
    InvalidValue {
        /// Name of the customer
        customer: String,
        /// The timeslot being computed
        timeslot: usize,
        /// Which value was NaN
        stage: CapacityStage,
    },
    /// A lookup key is absent from a configured table
    #[error("{customer}: no {table} entry for key {key} (timeslot {timeslot})")]
    MissingTableEntry {
        /// Name of the customer
        customer: String,
        /// The timeslot being computed
        timeslot: usize,
        /// The table which was consulted
        table: TableKind,
        /// The missing key
        key: i64,
    },
    /// A timeslot was requested more than one past the last drawn timeslot
    #[error("{customer}: timeslot {requested} requested but the next timeslot to draw is {next}")]
    NonContiguousTimeslot {
        /// Name of the customer
        customer: String,
        /// The requested timeslot
        requested: usize,
        /// The only timeslot which can be drawn next
        next: usize,
    },
    /// The engine refused to continue after an earlier failure
    #[error("{customer}: capacity engine halted after an earlier failure")]
    Halted {
        /// Name of the customer
        customer: String,
    },
}
