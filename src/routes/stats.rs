//! Global statistics endpoints: `/api/years` and `/api/stats`.

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::debug;

use crate::error::ApiError;
use crate::models::GlobalStats;
use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/years", get(years))
        .route("/api/stats", get(stats))
}

/// Optional year restriction shared by the statistics queries.
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// Reject years outside what a FIT timestamp can represent.
pub(super) fn check_year(year: Option<i32>) -> Result<Option<i32>, ApiError> {
    match year {
        Some(y) if !(1989..=9999).contains(&y) => {
            Err(ApiError::BadRequest(format!("year out of range: {}", y)))
        }
        other => Ok(other),
    }
}

/// Handle `GET /api/years`: session years, newest first.
async fn years(State((pool, config)): State<(PgPool, Config)>) -> Result<Json<Vec<i32>>, ApiError> {
    // ---
    let summary = config.records.summary();

    let years: Vec<i32> = sqlx::query_scalar(&format!(
        r#"
        SELECT DISTINCT EXTRACT(YEAR FROM session_date)::INT AS year
        FROM {}
        ORDER BY year DESC
        "#,
        summary.quoted()
    ))
    .fetch_all(&pool)
    .await?;

    debug!("GET /api/years - {} year(s)", years.len());
    Ok(Json(years))
}

/// Handle `GET /api/stats?year=YYYY`.
///
/// Session counts, distance and duration come from the summary table;
/// heart rate, cadence, power and speed are aggregated over raw samples.
async fn stats(
    Query(params): Query<YearQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<GlobalStats>, ApiError> {
    // ---
    let year = check_year(params.year)?;
    let summary = config.records.summary();

    let stats: GlobalStats = sqlx::query_as(&format!(
        r#"
        WITH sessions AS (
            SELECT *
            FROM {summary}
            WHERE $1::INT IS NULL OR EXTRACT(YEAR FROM session_date)::INT = $1
        ),
        samples AS (
            SELECT r.heart_rate, r.cadence, r.power,
                   COALESCE(r.enhanced_speed, r.speed) * 3.6 AS speed_kmh
            FROM {records} r
            JOIN sessions s USING (file_name)
        )
        SELECT
            (SELECT COUNT(*) FROM sessions)                  AS total_sessions,
            (SELECT SUM(distance_km) FROM sessions)          AS total_distance_km,
            (SELECT AVG(distance_km) FROM sessions)          AS avg_distance_km,
            (SELECT AVG(duration_seconds) FROM sessions)     AS avg_duration_seconds,
            MAX(heart_rate)                                  AS max_heart_rate,
            AVG(heart_rate)::DOUBLE PRECISION                AS avg_heart_rate,
            MAX(cadence)                                     AS max_cadence,
            AVG(cadence)::DOUBLE PRECISION                   AS avg_cadence,
            MAX(power)                                       AS max_power,
            AVG(power)::DOUBLE PRECISION                     AS avg_power,
            MAX(speed_kmh)::DOUBLE PRECISION                 AS max_speed_kmh,
            AVG(speed_kmh)::DOUBLE PRECISION                 AS avg_speed_kmh
        FROM samples
        "#,
        summary = summary.quoted(),
        records = config.records.quoted(),
    ))
    .bind(year)
    .fetch_one(&pool)
    .await?;

    debug!("GET /api/stats - year={:?} sessions={}", year, stats.total_sessions);
    Ok(Json(stats))
}
