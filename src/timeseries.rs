//! Replay of pre-loaded capacity time series.
use thiserror::Error;

/// Indicates that a time series has no value for the requested timeslot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timeslot {timeslot} is beyond the end of a time series with {len} values")]
pub struct SeriesExhausted {
    /// The requested timeslot
    pub timeslot: usize,
    /// Number of values in the series
    pub len: usize,
}

/// Replays a sequence of values, one per timeslot.
///
/// The first value belongs to timeslot 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesSampler {
    values: Vec<f64>,
}

impl TimeSeriesSampler {
    /// Create a sampler for the given values
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of timeslots covered by the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no values at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the value for the given timeslot
    pub fn value_at(&self, timeslot: usize) -> Result<f64, SeriesExhausted> {
        timeslot
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx))
            .copied()
            .ok_or(SeriesExhausted {
                timeslot,
                len: self.values.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_at() {
        let series = TimeSeriesSampler::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.value_at(1), Ok(1.0));
        assert_eq!(series.value_at(3), Ok(3.0));
    }

    #[test]
    fn test_value_at_beyond_end() {
        let series = TimeSeriesSampler::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(
            series.value_at(4),
            Err(SeriesExhausted {
                timeslot: 4,
                len: 3
            })
        );
        assert!(series.value_at(0).is_err());
    }
}
