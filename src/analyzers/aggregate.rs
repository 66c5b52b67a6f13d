use crate::analyzers::timestamp::parse_timestamp;
use crate::analyzers::utility::mean;
use crate::error::AggregateError;
use crate::model::{
    DailyAggregate, DailyRow, FieldValue, MeasurementRecord, RawDataset, TIMESTAMP_COLUMN,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Reduces `raw` to one row per calendar date holding the mean of every
/// numeric column.
///
/// Rows come out in ascending date order. A column counts as numeric only if
/// it holds at least one number and no text anywhere in `raw`; the timestamp
/// and station columns never do. Missing cells are skipped by the mean.
///
/// Records with a null, absent or blank timestamp belong to no date and are
/// left out of every group.
///
/// # Errors
///
/// Fails if no record carries a timestamp column at all, or on the first
/// timestamp that is present but unparseable. No partial aggregate is
/// produced.
pub fn aggregate(raw: &RawDataset) -> Result<DailyAggregate, AggregateError> {
    if !raw.is_empty() && !raw.columns().iter().any(|c| c == TIMESTAMP_COLUMN) {
        return Err(AggregateError::MissingTimestampColumn);
    }

    let dates = raw
        .records()
        .iter()
        .enumerate()
        .map(|(row, record)| record_date(row, record))
        .collect::<Result<Vec<_>, _>>()?;

    let undated = dates.iter().filter(|d| d.is_none()).count();
    if undated > 0 {
        debug!(undated, "Records without a timestamp left out of grouping");
    }

    let columns = numeric_columns(raw);
    debug!(?columns, records = raw.len(), "Numeric columns selected");

    let mut groups: BTreeMap<NaiveDate, Vec<Vec<f64>>> = BTreeMap::new();

    for (record, date) in raw.records().iter().zip(dates) {
        let Some(date) = date else {
            continue;
        };
        let series = groups
            .entry(date)
            .or_insert_with(|| vec![Vec::new(); columns.len()]);

        for (i, column) in columns.iter().enumerate() {
            if let Some(v) = record.field(column).and_then(FieldValue::as_number) {
                series[i].push(v);
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(date, series)| DailyRow {
            date,
            means: series.iter().map(|s| mean(s)).collect(),
        })
        .collect();

    Ok(DailyAggregate { columns, rows })
}

/// Columns whose values are numbers throughout the whole dataset.
pub fn numeric_columns(raw: &RawDataset) -> Vec<String> {
    raw.columns()
        .iter()
        .filter(|column| column.as_str() != TIMESTAMP_COLUMN)
        .filter(|column| {
            let mut seen_number = false;
            for record in raw.records() {
                match record.field(column.as_str()) {
                    Some(FieldValue::Number(_)) => seen_number = true,
                    Some(FieldValue::Text(_)) => return false,
                    Some(FieldValue::Missing) | None => {}
                }
            }
            seen_number
        })
        .cloned()
        .collect()
}

/// Calendar date of `record`, or `None` when its timestamp is null, absent or blank.
fn record_date(
    row: usize,
    record: &MeasurementRecord,
) -> Result<Option<NaiveDate>, AggregateError> {
    let raw = match record.field(TIMESTAMP_COLUMN) {
        None | Some(FieldValue::Missing) => return Ok(None),
        Some(FieldValue::Text(s)) if s.trim().is_empty() => return Ok(None),
        Some(FieldValue::Text(s)) => s,
        Some(other) => {
            return Err(AggregateError::Timestamp {
                row,
                value: other.to_cell(),
            });
        }
    };

    parse_timestamp(raw)
        .map(|dt| Some(dt.date()))
        .ok_or_else(|| AggregateError::Timestamp {
            row,
            value: raw.clone(),
        })
}
