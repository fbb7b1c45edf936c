//! Warehouse schema management for `fitflow`.
//!
//! Creates the records table on first load and maintains the per-session
//! `training_summary` table the dashboard reads from. All statements are
//! idempotent; table names come from validated [`TableRef`]s.

use sqlx::PgPool;

use crate::warehouse::TableRef;

// ---

/// Name of the per-session summary table, created next to the records table.
pub const SUMMARY_TABLE: &str = "training_summary";

/// Create the dataset schema and the records table if they do not exist.
pub async fn create_records_table(pool: &PgPool, target: &TableRef) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(&format!(
        "CREATE SCHEMA IF NOT EXISTS \"{}\"",
        target.dataset()
    ))
    .execute(&mut *tx)
    .await?;

    // Append-only; one row per decoded sensor record
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            file_name      TEXT        NOT NULL,
            "timestamp"    TIMESTAMPTZ,
            heart_rate     INTEGER,
            power          INTEGER,
            cadence        INTEGER,
            speed          DOUBLE PRECISION,
            enhanced_speed DOUBLE PRECISION
        );
        "#,
        target.quoted()
    ))
    .execute(&mut *tx)
    .await?;

    // The dedup query and every per-session lookup filter on file_name
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS \"{}_file_name_idx\" ON {} (file_name)",
        target.table(),
        target.quoted()
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Create the per-session summary table if it does not exist.
pub async fn create_summary_table(pool: &PgPool, summary: &TableRef) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            file_name        TEXT PRIMARY KEY,
            session_date     DATE             NOT NULL,
            started_at       TIMESTAMPTZ      NOT NULL,
            duration_seconds DOUBLE PRECISION NOT NULL,
            distance_km      DOUBLE PRECISION NOT NULL,
            avg_heart_rate   DOUBLE PRECISION,
            max_heart_rate   INTEGER,
            avg_cadence      DOUBLE PRECISION,
            max_cadence      INTEGER,
            avg_power        DOUBLE PRECISION,
            max_power        INTEGER,
            avg_speed_kmh    DOUBLE PRECISION,
            max_speed_kmh    DOUBLE PRECISION,
            sample_count     BIGINT           NOT NULL
        );
        "#,
        summary.quoted()
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Rebuild one summary row per session from the records table.
///
/// Distance integrates speed (preferring `enhanced_speed`) over the gaps
/// between consecutive samples. Records without a timestamp are ignored.
/// Returns the number of summary rows written.
pub async fn refresh_summaries(pool: &PgPool, records: &TableRef) -> Result<u64, sqlx::Error> {
    // ---
    let summary = records.summary();
    create_summary_table(pool, &summary).await?;

    let result = sqlx::query(&format!(
        r#"
        INSERT INTO {summary} (
            file_name, session_date, started_at, duration_seconds, distance_km,
            avg_heart_rate, max_heart_rate, avg_cadence, max_cadence,
            avg_power, max_power, avg_speed_kmh, max_speed_kmh, sample_count
        )
        SELECT
            file_name,
            (MIN("timestamp") AT TIME ZONE 'UTC')::DATE,
            MIN("timestamp"),
            EXTRACT(EPOCH FROM MAX("timestamp") - MIN("timestamp"))::DOUBLE PRECISION,
            COALESCE(SUM(step_km), 0)::DOUBLE PRECISION,
            AVG(heart_rate)::DOUBLE PRECISION,
            MAX(heart_rate),
            AVG(cadence)::DOUBLE PRECISION,
            MAX(cadence),
            AVG(power)::DOUBLE PRECISION,
            MAX(power),
            AVG(speed_ms * 3.6)::DOUBLE PRECISION,
            MAX(speed_ms * 3.6)::DOUBLE PRECISION,
            COUNT(*)
        FROM (
            SELECT
                file_name, "timestamp", heart_rate, cadence, power,
                COALESCE(enhanced_speed, speed) AS speed_ms,
                COALESCE(enhanced_speed, speed)
                    * EXTRACT(EPOCH FROM "timestamp" - LAG("timestamp")
                        OVER (PARTITION BY file_name ORDER BY "timestamp"))::DOUBLE PRECISION
                    / 1000.0 AS step_km
            FROM {records}
            WHERE "timestamp" IS NOT NULL
        ) samples
        GROUP BY file_name
        ON CONFLICT (file_name) DO UPDATE SET
            session_date     = EXCLUDED.session_date,
            started_at       = EXCLUDED.started_at,
            duration_seconds = EXCLUDED.duration_seconds,
            distance_km      = EXCLUDED.distance_km,
            avg_heart_rate   = EXCLUDED.avg_heart_rate,
            max_heart_rate   = EXCLUDED.max_heart_rate,
            avg_cadence      = EXCLUDED.avg_cadence,
            max_cadence      = EXCLUDED.max_cadence,
            avg_power        = EXCLUDED.avg_power,
            max_power        = EXCLUDED.max_power,
            avg_speed_kmh    = EXCLUDED.avg_speed_kmh,
            max_speed_kmh    = EXCLUDED.max_speed_kmh,
            sample_count     = EXCLUDED.sample_count
        "#,
        summary = summary.quoted(),
        records = records.quoted(),
    ))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
