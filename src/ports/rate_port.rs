//! Rate series store port trait.

use chrono::{DateTime, Utc};

use crate::domain::error::FxError;
use crate::domain::rate::RateSample;

pub trait RatePort {
    /// Samples with `start <= timestamp <= end`, ascending.
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateSample>, FxError>;

    /// The most recent `limit` samples, ascending.
    fn latest(&self, limit: usize) -> Result<Vec<RateSample>, FxError>;

    /// Store samples, skipping timestamps already present. Returns the number inserted.
    fn insert_samples(&self, samples: &[RateSample]) -> Result<usize, FxError>;

    /// First and last timestamp plus sample count, or `None` when empty.
    fn data_range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, FxError>;
}
