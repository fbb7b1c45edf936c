//! Configuration loader for `fitflow`.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Warehouse credentials live in a separate JSON key
//! file whose path is given by `FITFLOW_CREDENTIALS`; a missing key file is a
//! fatal startup error.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::warehouse::TableRef;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional path environment variable; empty values count as unset.
fn optional_path(var_name: &str) -> Option<PathBuf> {
    env::var(var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Service-account style key file for the warehouse.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    // ---
    /// Project the warehouse tables belong to.
    pub project_id: String,

    /// PostgreSQL connection string.
    pub database_url: String,
}

/// Read and parse the warehouse key file.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    // ---
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
    let creds: Credentials = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid credentials file {}", path.display()))?;

    if creds.project_id.trim().is_empty() {
        return Err(anyhow!("credentials file {} has an empty project_id", path.display()));
    }
    Ok(creds)
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Storage folder holding activity files awaiting extraction.
    pub data_dir: Option<PathBuf>,

    /// Device-sync folder that new recordings are moved from.
    pub source_dir: Option<PathBuf>,

    /// Where empty and corrupted files go instead of being deleted.
    pub quarantine_dir: Option<PathBuf>,

    /// Path of the warehouse key file.
    pub credentials_path: PathBuf,

    /// Warehouse credentials read from `credentials_path`.
    pub credentials: Credentials,

    /// Target records table.
    pub records: TableRef,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the dashboard API listens on.
    pub dashboard_port: u16,

    /// Max heart rate used to derive heart-rate zones.
    pub max_heart_rate: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `FITFLOW_CREDENTIALS` – path of the warehouse key file
///
/// Optional:
/// - `FITFLOW_DATA_DIR` – storage folder (required by the ETL binary)
/// - `FITFLOW_SOURCE_DIR` – device-sync folder; relocation is skipped if unset
/// - `FITFLOW_QUARANTINE_DIR` – move instead of delete empty/corrupted files
/// - `FITFLOW_DATASET` – warehouse dataset (default: `fit_data`)
/// - `FITFLOW_TABLE` – records table (default: `fitfile_records`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `DASHBOARD_PORT` – dashboard listen port (default: 8080)
/// - `MAX_HEART_RATE` – max heart rate for zone bands (default: 190)
///
/// Returns an error if any required variable is missing or invalid, or if the
/// credentials file cannot be read.
pub fn load_from_env() -> Result<Config> {
    // ---
    let credentials_path = PathBuf::from(require_env!("FITFLOW_CREDENTIALS"));
    let credentials = load_credentials(&credentials_path)?;

    let dataset = env::var("FITFLOW_DATASET").unwrap_or_else(|_| "fit_data".to_string());
    let table = env::var("FITFLOW_TABLE").unwrap_or_else(|_| "fitfile_records".to_string());
    let records = TableRef::new(&dataset, &table)?;

    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let dashboard_port = u16::try_from(parse_env_u32!("DASHBOARD_PORT", 8080))
        .map_err(|e| anyhow!("Invalid DASHBOARD_PORT: {}", e))?;
    let max_heart_rate = parse_env_u32!("MAX_HEART_RATE", 190);
    if max_heart_rate == 0 {
        return Err(anyhow!("Invalid MAX_HEART_RATE: must be positive"));
    }

    Ok(Config {
        data_dir: optional_path("FITFLOW_DATA_DIR"),
        source_dir: optional_path("FITFLOW_SOURCE_DIR"),
        quarantine_dir: optional_path("FITFLOW_QUARANTINE_DIR"),
        credentials_path,
        credentials,
        records,
        db_pool_max,
        dashboard_port,
        max_heart_rate,
    })
}

/// Replace the password of a connection string with `****`.
pub fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // Only the scheme separator; no password present
            if db_url[colon_pos..].starts_with("://") {
                return db_url.to_string();
            }
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all configuration values
    /// that were loaded.
    pub fn log_config(&self) {
        // ---
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  FITFLOW_DATA_DIR       : {}", show(&self.data_dir));
        tracing::info!("  FITFLOW_SOURCE_DIR     : {}", show(&self.source_dir));
        tracing::info!("  FITFLOW_QUARANTINE_DIR : {}", show(&self.quarantine_dir));
        tracing::info!("  FITFLOW_CREDENTIALS    : {}", self.credentials_path.display());
        tracing::info!("  project                : {}", self.credentials.project_id);
        tracing::info!("  database               : {}", mask_db_url(&self.credentials.database_url));
        tracing::info!("  records table          : {}", self.records);
        tracing::info!("  DB_POOL_MAX            : {}", self.db_pool_max);
        tracing::info!("  DASHBOARD_PORT         : {}", self.dashboard_port);
        tracing::info!("  MAX_HEART_RATE         : {}", self.max_heart_rate);
    }
}
