//! Code for working with timeslots and the simulation clock.
//!
//! Timeslots are numbered from 1. Timeslot 0 exists only as the sentinel entry at the start of
//! each capacity history.
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use std::cell::Cell;
use std::fmt;

/// A single discrete step of simulated time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeslot {
    /// Serial number of the timeslot (1 is the first simulated step)
    pub serial_number: usize,
    /// The instant at which the timeslot starts
    pub start: NaiveDateTime,
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.serial_number, self.start)
    }
}

/// Source of the current simulated time
pub trait Clock {
    /// The current simulated instant
    fn current_time(&self) -> NaiveDateTime;

    /// Day of the week for the current instant, from 1 (Monday) to 7 (Sunday)
    fn day_of_week(&self) -> u32 {
        self.current_time().weekday().number_from_monday()
    }

    /// Hour of the day for the current instant, from 0 to 23
    fn hour_of_day(&self) -> u32 {
        self.current_time().hour()
    }
}

/// A clock which is advanced one timeslot at a time by the simulation loop
#[derive(Debug)]
pub struct SimulationClock {
    start_time: NaiveDateTime,
    timeslot_hours: u32,
    current: Cell<Timeslot>,
}

impl SimulationClock {
    /// Create a clock positioned at timeslot 1.
    ///
    /// # Arguments
    ///
    /// * `start_time` - Start of the first timeslot
    /// * `timeslot_hours` - Length of each timeslot in hours
    pub fn new(start_time: NaiveDateTime, timeslot_hours: u32) -> Self {
        Self {
            start_time,
            timeslot_hours,
            current: Cell::new(Timeslot {
                serial_number: 1,
                start: start_time,
            }),
        }
    }

    /// Get the timeslot with the given serial number.
    ///
    /// Returns `None` if its start time cannot be represented.
    pub fn timeslot(&self, serial_number: usize) -> Option<Timeslot> {
        let offset = i64::try_from(serial_number).ok()?.checked_sub(1)?;
        let hours = offset.checked_mul(i64::from(self.timeslot_hours))?;
        let start = self
            .start_time
            .checked_add_signed(TimeDelta::try_hours(hours)?)?;

        Some(Timeslot {
            serial_number,
            start,
        })
    }

    /// Move the clock to the given timeslot and return it.
    ///
    /// The clock is left where it was if the timeslot's start time cannot be represented.
    pub fn advance_to(&self, serial_number: usize) -> Option<Timeslot> {
        let timeslot = self.timeslot(serial_number)?;
        self.current.set(timeslot);
        Some(timeslot)
    }

    /// The timeslot the clock is currently positioned at
    pub fn current_timeslot(&self) -> Timeslot {
        self.current.get()
    }
}

impl Clock for SimulationClock {
    fn current_time(&self) -> NaiveDateTime {
        self.current.get().start
    }
}
