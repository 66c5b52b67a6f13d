//! Orchestration of one run: discover, fetch each station, persist, aggregate.

use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::analyzers::aggregate::aggregate;
use crate::error::{FetchError, PipelineError};
use crate::model::{RawDataset, Station};
use crate::output::{OutputPaths, write_daily, write_raw};
use crate::services::directory::StationDirectory;
use crate::services::fetcher::{StationFetcher, StationOutcome};

/// The date a run processes when none is given: the day before `today`.
pub fn default_target_date(today: NaiveDate) -> Option<NaiveDate> {
    today.pred_opt()
}

/// Accumulates per-station outcomes in discovery order.
#[derive(Debug, Default)]
pub struct Collection {
    pub dataset: RawDataset,
    pub collected: Vec<Station>,
    pub empty: Vec<Station>,
    pub failures: Vec<(Station, FetchError)>,
}

impl Collection {
    pub fn record(&mut self, station: Station, outcome: StationOutcome) {
        match outcome {
            StationOutcome::Collected(records) => {
                self.dataset.extend(records);
                self.collected.push(station);
            }
            StationOutcome::Empty => self.empty.push(station),
            StationOutcome::Failed(e) => self.failures.push((station, e)),
        }
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub target_date: NaiveDate,
    pub paths: OutputPaths,
    pub stations: usize,
    pub raw_rows: usize,
    pub daily_rows: usize,
    pub collected: Vec<Station>,
    pub empty: Vec<Station>,
    pub failures: Vec<(Station, FetchError)>,
}

/// Runs the fetch/aggregate pipeline against a station directory and fetcher.
pub struct PipelineRunner<D, F> {
    directory: D,
    fetcher: F,
    data_dir: PathBuf,
    file_prefix: String,
}

impl<D: StationDirectory, F: StationFetcher> PipelineRunner<D, F> {
    pub fn new(
        directory: D,
        fetcher: F,
        data_dir: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            fetcher,
            data_dir: data_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Processes `target_date`: one directory lookup, then one fetch per
    /// station in discovery order.
    ///
    /// A station that fails or has no data is skipped. The run fails if the
    /// directory lookup fails, lists no stations, or no station yields data;
    /// in those cases nothing is written.
    #[tracing::instrument(skip_all, fields(target_date = %target_date))]
    pub async fn run(&self, target_date: NaiveDate) -> Result<RunSummary, PipelineError> {
        let stations = self.directory.list_stations().await?;
        if stations.is_empty() {
            return Err(PipelineError::NoStations);
        }
        let station_count = stations.len();
        info!(stations = station_count, "Monitoring sites resolved");

        let collection = self.collect(stations, target_date).await;

        info!(
            collected = collection.collected.len(),
            empty = collection.empty.len(),
            failed = collection.failures.len(),
            rows = collection.dataset.len(),
            "Station fetches finished"
        );

        if collection.dataset.is_empty() {
            return Err(PipelineError::NoData);
        }

        let paths = OutputPaths::new(&self.data_dir, &self.file_prefix, target_date);
        paths.prepare_dirs()?;

        write_raw(&paths.raw, &collection.dataset)?;
        info!(path = %paths.raw.display(), "Saved raw");

        let daily = aggregate(&collection.dataset)?;
        write_daily(&paths.processed, &daily)?;
        info!(path = %paths.processed.display(), days = daily.rows.len(), "Saved processed");

        Ok(RunSummary {
            target_date,
            paths,
            stations: station_count,
            raw_rows: collection.dataset.len(),
            daily_rows: daily.rows.len(),
            collected: collection.collected,
            empty: collection.empty,
            failures: collection.failures,
        })
    }

    async fn collect(&self, stations: Vec<Station>, target_date: NaiveDate) -> Collection {
        let mut collection = Collection::default();

        for station in stations {
            info!(station = %station, "Fetching");

            let outcome: StationOutcome = self
                .fetcher
                .fetch(&station, target_date, target_date)
                .await
                .into();

            match &outcome {
                StationOutcome::Collected(records) => {
                    debug!(station = %station, rows = records.len(), "Station data collected")
                }
                StationOutcome::Empty => debug!(station = %station, "No data for station"),
                StationOutcome::Failed(e) => {
                    warn!(station = %station, error = %e, "Station fetch failed, skipping")
                }
            }

            collection.record(station, outcome);
        }

        collection
    }
}
