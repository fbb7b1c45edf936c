//! Per-session endpoints under `/api/sessions`.
//!
//! A session is one loaded activity file, addressed by its file name.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::debug;

use super::stats::check_year;
use crate::error::ApiError;
use crate::models::{SessionSample, SessionSummary, ZoneShare};
use crate::Config;

// ---

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Lower bounds of zones 2..=5, in percent of max heart rate.
const ZONE_BOUNDS: [i64; 4] = [60, 70, 80, 90];

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/sessions", get(list))
        .route("/api/sessions/{file_name}", get(detail))
        .route("/api/sessions/{file_name}/timeseries", get(timeseries))
        .route("/api/sessions/{file_name}/zones", get(zones))
}

/// Query parameters for the session list.
#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    year: Option<i32>,
    limit: Option<i64>,
}

/// Handle `GET /api/sessions`: newest sessions first.
async fn list(
    Query(params): Query<SessionsQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    // ---
    let year = check_year(params.year)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let sessions: Vec<SessionSummary> = sqlx::query_as(&format!(
        r#"
        SELECT *
        FROM {}
        WHERE $1::INT IS NULL OR EXTRACT(YEAR FROM session_date)::INT = $1
        ORDER BY started_at DESC
        LIMIT $2
        "#,
        config.records.summary().quoted()
    ))
    .bind(year)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    debug!("GET /api/sessions - {} session(s)", sessions.len());
    Ok(Json(sessions))
}

/// Handle `GET /api/sessions/{file_name}`.
async fn detail(
    Path(file_name): Path<String>,
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<SessionSummary>, ApiError> {
    // ---
    fetch_summary(&pool, &config, &file_name).await.map(Json)
}

/// Handle `GET /api/sessions/{file_name}/timeseries`: samples in time order.
async fn timeseries(
    Path(file_name): Path<String>,
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<Vec<SessionSample>>, ApiError> {
    // ---
    let samples: Vec<SessionSample> = sqlx::query_as(&format!(
        r#"
        SELECT
            "timestamp",
            EXTRACT(EPOCH FROM "timestamp" - MIN("timestamp") OVER ())::DOUBLE PRECISION
                AS elapsed_seconds,
            power,
            cadence,
            heart_rate,
            (COALESCE(enhanced_speed, speed) * 3.6)::DOUBLE PRECISION AS speed_kmh
        FROM {}
        WHERE file_name = $1 AND "timestamp" IS NOT NULL
        ORDER BY "timestamp"
        "#,
        config.records.quoted()
    ))
    .bind(&file_name)
    .fetch_all(&pool)
    .await?;

    if samples.is_empty() {
        return Err(ApiError::NotFound(file_name));
    }
    Ok(Json(samples))
}

/// Handle `GET /api/sessions/{file_name}/zones`.
async fn zones(
    Path(file_name): Path<String>,
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<Vec<ZoneShare>>, ApiError> {
    // ---
    fetch_summary(&pool, &config, &file_name).await?;

    let heart_rates: Vec<i32> = sqlx::query_scalar(&format!(
        "SELECT heart_rate FROM {} WHERE file_name = $1 AND heart_rate IS NOT NULL",
        config.records.quoted()
    ))
    .bind(&file_name)
    .fetch_all(&pool)
    .await?;

    Ok(Json(heart_rate_zones(&heart_rates, config.max_heart_rate)))
}

async fn fetch_summary(pool: &PgPool, config: &Config, file_name: &str) -> Result<SessionSummary, ApiError> {
    // ---
    sqlx::query_as(&format!(
        "SELECT * FROM {} WHERE file_name = $1",
        config.records.summary().quoted()
    ))
    .bind(file_name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(file_name.to_string()))
}

/// Percentage of samples in each of the five heart-rate zones.
///
/// Zone 1 is everything below 60 % of `max_heart_rate`, zone 5 everything at
/// or above 90 %. With no samples every zone reports 0.
pub fn heart_rate_zones(heart_rates: &[i32], max_heart_rate: u32) -> Vec<ZoneShare> {
    // ---
    let mut counts = [0usize; ZONE_BOUNDS.len() + 1];
    let max = i64::from(max_heart_rate);

    for &hr in heart_rates {
        let scaled = i64::from(hr) * 100;
        let zone = ZONE_BOUNDS.iter().filter(|&&pct| scaled >= pct * max).count();
        counts[zone] += 1;
    }

    let total = heart_rates.len();
    counts
        .iter()
        .enumerate()
        .map(|(i, &n)| ZoneShare {
            zone: i as u8 + 1,
            zone_name: format!("Zone {}", i + 1),
            percentage: if total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / total as f64
            },
        })
        .collect()
}
