//! Seams between the pipeline and the upstream air-quality service.

pub mod directory;
pub mod fetcher;
