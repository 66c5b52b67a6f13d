//! Trait for retrieving one station's records, and the per-station outcome.

use chrono::NaiveDate;

use crate::error::FetchError;
use crate::model::{MeasurementRecord, Station};

/// Retrieves raw records for a single station.
#[async_trait::async_trait]
pub trait StationFetcher: Send + Sync {
    /// Fetches records for `station` between `start` and `end`, both inclusive.
    ///
    /// `Ok(None)` means the upstream has no data for the range. Every returned
    /// record is tagged with `station`.
    async fn fetch(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<MeasurementRecord>>, FetchError>;
}

#[async_trait::async_trait]
impl<T: StationFetcher + ?Sized> StationFetcher for &T {
    async fn fetch(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<MeasurementRecord>>, FetchError> {
        (**self).fetch(station, start, end).await
    }
}

/// What a single station contributed to a run.
#[derive(Debug)]
pub enum StationOutcome {
    Collected(Vec<MeasurementRecord>),
    Empty,
    Failed(FetchError),
}

impl From<Result<Option<Vec<MeasurementRecord>>, FetchError>> for StationOutcome {
    fn from(result: Result<Option<Vec<MeasurementRecord>>, FetchError>) -> Self {
        match result {
            Ok(Some(records)) if !records.is_empty() => StationOutcome::Collected(records),
            Ok(_) => StationOutcome::Empty,
            Err(e) => StationOutcome::Failed(e),
        }
    }
}
