//! CLI entry point: processes yesterday's readings for the configured site group.
//!
//! Takes no required arguments. Exits non-zero when station discovery fails,
//! no station yields data, or the daily aggregation cannot be computed.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use london_air_quality::{
    config::Config,
    fetch::BasicClient,
    infra::londonair::LondonAirClient,
    logging,
    pipeline::{PipelineRunner, default_target_date},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "london_air_quality")]
#[command(about = "Fetch yesterday's air-quality readings and write daily means", long_about = None)]
struct Cli {
    /// Directory holding the raw/ and processed/ outputs
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(secs) = cli.timeout_secs {
        if secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }
        config.request_timeout = Duration::from_secs(secs);
    }

    let _log_guard = logging::init(&config.log_file_path);

    info!(group = %config.group, "Starting air quality pipeline");

    let target_date =
        default_target_date(Local::now().date_naive()).context("no calendar day before today")?;
    info!(target_date = %target_date, "Target date");

    let http = BasicClient::new(config.request_timeout)?;
    let client = LondonAirClient::new(http, &config.base_url, config.group.as_str())?;
    let runner = PipelineRunner::new(&client, &client, &config.data_dir, config.file_prefix());

    match runner.run(target_date).await {
        Ok(summary) => {
            for (station, e) in &summary.failures {
                warn!(station = %station, error = %e, "Station skipped");
            }
            info!(
                stations = summary.stations,
                collected = summary.collected.len(),
                failed = summary.failures.len(),
                raw = %summary.paths.raw.display(),
                processed = %summary.paths.processed.display(),
                "Pipeline finished successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            Err(e.into())
        }
    }
}
