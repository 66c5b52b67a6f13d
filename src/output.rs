//! CSV persistence for the raw extract and the daily aggregate.
//!
//! Both writers truncate: re-running a date replaces the previous files.

use chrono::NaiveDate;
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::OutputError;
use crate::model::{DATE_COLUMN, DailyAggregate, FieldValue, RawDataset};

/// Where a run's two CSV files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub raw: PathBuf,
    pub processed: PathBuf,
}

impl OutputPaths {
    /// Lays out `<data_dir>/raw/<prefix>_raw_<date>.csv` and
    /// `<data_dir>/processed/<prefix>_daily_<date>.csv`.
    pub fn new(data_dir: &Path, prefix: &str, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d");
        Self {
            raw: data_dir.join("raw").join(format!("{prefix}_raw_{date}.csv")),
            processed: data_dir
                .join("processed")
                .join(format!("{prefix}_daily_{date}.csv")),
        }
    }

    /// Creates the parent directories of both files if they are missing.
    pub fn prepare_dirs(&self) -> Result<(), OutputError> {
        for path in [&self.raw, &self.processed] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// Writes every raw record, station tag last, with a header row.
pub fn write_raw(path: &Path, dataset: &RawDataset) -> Result<(), OutputError> {
    debug!(path = %path.display(), rows = dataset.len(), "Writing raw CSV");
    let mut writer = open(path)?;
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(dataset.header()).map_err(csv_err)?;

    for record in dataset.records() {
        let row = dataset
            .columns()
            .iter()
            .map(|c| record.field(c).map(FieldValue::to_cell).unwrap_or_default())
            .chain(std::iter::once(record.station().to_string()));
        writer.write_record(row).map_err(csv_err)?;
    }

    flush(path, writer)
}

/// Writes one row per date: `date` then the mean of each numeric column.
pub fn write_daily(path: &Path, daily: &DailyAggregate) -> Result<(), OutputError> {
    debug!(path = %path.display(), rows = daily.rows.len(), "Writing daily CSV");
    let mut writer = open(path)?;
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let header = std::iter::once(DATE_COLUMN).chain(daily.columns.iter().map(String::as_str));
    writer.write_record(header).map_err(csv_err)?;

    for row in &daily.rows {
        let cells = std::iter::once(row.date.format("%Y-%m-%d").to_string()).chain(
            row.means
                .iter()
                .map(|m| m.map(format_mean).unwrap_or_default()),
        );
        writer.write_record(cells).map_err(csv_err)?;
    }

    flush(path, writer)
}

/// Renders a mean as a float cell: whole values keep one decimal (`15.0`),
/// others use the shortest round-trip form.
pub fn format_mean(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn open(path: &Path) -> Result<Writer<File>, OutputError> {
    Writer::from_path(path).map_err(|source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

fn flush(path: &Path, mut writer: Writer<File>) -> Result<(), OutputError> {
    writer.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
