//! Runtime settings, read from the environment (and `.env` if present).

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Duration;

use crate::infra::londonair::DEFAULT_BASE_URL;

const DEFAULT_GROUP: &str = "London";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILE: &str = "logs/london_air_quality.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub group: String,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    pub log_file_path: PathBuf,
}

impl Config {
    /// Reads `AIRQ_BASE_URL`, `AIRQ_GROUP`, `AIRQ_DATA_DIR`,
    /// `AIRQ_TIMEOUT_SECS` and `LOG_FILE_PATH`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let request_timeout = match lookup("AIRQ_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url: lookup("AIRQ_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            group: lookup("AIRQ_GROUP").unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            data_dir: lookup("AIRQ_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            request_timeout,
            log_file_path: lookup("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        })
    }

    /// Prefix for output file names, e.g. `london` for the `London` group.
    pub fn file_prefix(&self) -> String {
        self.group.to_lowercase()
    }
}

/// Parses a whole number of seconds; zero is rejected.
pub fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid request timeout '{raw}'"))?;
    if secs == 0 {
        bail!("request timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}
