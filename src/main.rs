//! Application entry point for the `fitflow` batch job.
//!
//! This binary runs the full pipeline once, start to finish:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Reading the warehouse credentials file (missing file is fatal)
//! - Moving finished recordings from the device-sync folder into storage
//! - Extracting and loading every activity file the warehouse lacks
//! - Refreshing the per-session summary table when rows were loaded
//!
//! # Environment Variables
//! - `FITFLOW_CREDENTIALS` (**required**) – warehouse key file
//! - `FITFLOW_DATA_DIR` (**required**) – storage folder
//! - `FITFLOW_SOURCE_DIR` (optional) – device-sync folder
//! - `FITFLOW_QUARANTINE_DIR` (optional) – keep empty/corrupted files there
//! - `FITFLOW_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//!
//! Takes no arguments. Any error that escapes `main` ends the process with a
//! non-zero exit code; work already committed stays committed.
use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;

use fitflow::config;
use fitflow::pipeline::{self, Disposal};
use fitflow::relocate::relocate;
use fitflow::schema;
use fitflow::telemetry::init_tracing;
use fitflow::PgWarehouse;

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    tracing::info!("Loading FIT files into the warehouse...");

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let data_dir = cfg
        .data_dir
        .clone()
        .ok_or_else(|| anyhow!("FITFLOW_DATA_DIR must be set in .env or environment"))?;

    // Step 1: relocate finished recordings
    match &cfg.source_dir {
        Some(source_dir) => {
            relocate(source_dir, &data_dir)?;
        }
        None => tracing::debug!("FITFLOW_SOURCE_DIR unset, skipping relocation"),
    }

    // Step 2: extract and load
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.credentials.database_url)
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to connect to database '{}': {}",
                config::mask_db_url(&cfg.credentials.database_url),
                e
            )
        })?;

    tracing::info!("Successfully connected to database");

    let warehouse = PgWarehouse::new(pool, cfg.credentials.project_id.clone());
    let disposal = Disposal::from_quarantine_dir(cfg.quarantine_dir.clone());

    let report = pipeline::run(&warehouse, &data_dir, &cfg.records, &disposal).await?;

    // Step 3: refresh the per-session summary
    if report.total_rows > 0 {
        let sessions = schema::refresh_summaries(warehouse.pool(), &cfg.records).await?;
        tracing::info!("Refreshed {} session summary row(s)", sessions);
    }

    tracing::info!("Total: {}", report);
    Ok(())
}
