//! Reduction of the raw dataset to per-date means.
//!
//! Timestamps are normalized to calendar dates, the numeric column set is
//! decided once over the whole dataset, and each date group is averaged.

pub mod aggregate;
pub mod timestamp;
pub mod utility;
