//! Error taxonomy for the fetch/aggregate pipeline.
//!
//! Only [`FetchError`] is recoverable: the runner logs it against the
//! offending station and moves on. Everything that reaches
//! [`PipelineError`] ends the run.

use chrono::NaiveDate;
use std::path::PathBuf;

/// Failure of a single HTTP GET + JSON decode.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("response body is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Station discovery failed. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("station discovery request failed: {0}")]
    Http(#[from] HttpError),

    #[error("malformed discovery response: {0}")]
    Malformed(String),
}

/// Retrieval of one station's records failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("station data request failed: {0}")]
    Http(#[from] HttpError),

    #[error("malformed station data: {0}")]
    Malformed(String),
}

/// The raw dataset could not be reduced to daily means.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("no record has a timestamp column")]
    MissingTimestampColumn,

    #[error("row {row} has an unparseable timestamp: {value:?}")]
    Timestamp { row: usize, value: String },
}

/// Writing a CSV artifact failed.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Fatal outcome of a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("station directory returned no stations")]
    NoStations,

    #[error("no data collected")]
    NoData,

    #[error("daily aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
