//! Warehouse access: the dedup query and the append-only row load.
//!
//! The pipeline talks to the warehouse through the [`Warehouse`] trait so a
//! single handle can be built at startup and passed down explicitly.
//! [`PgWarehouse`] is the Postgres implementation.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::WarehouseError;
use crate::models::LoadedRow;
use crate::schema;

// ---

/// Rows per multi-row `INSERT`; keeps bind parameters well under the
/// Postgres limit of 65535.
const INSERT_CHUNK_ROWS: usize = 5000;

/// SQLSTATE codes for a missing relation or a missing schema.
const UNDEFINED_TABLE: &str = "42P01";
const INVALID_SCHEMA_NAME: &str = "3F000";

/// A validated `dataset.table` pair.
///
/// Both parts are plain SQL identifiers, so they can be quoted into
/// statements without further escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    dataset: String,
    table: String,
}

impl TableRef {
    // ---
    pub fn new(dataset: &str, table: &str) -> Result<Self, WarehouseError> {
        Ok(Self {
            dataset: validate_identifier(dataset)?.to_string(),
            table: validate_identifier(table)?.to_string(),
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The per-session summary table in the same dataset.
    pub fn summary(&self) -> Self {
        Self {
            dataset: self.dataset.clone(),
            table: schema::SUMMARY_TABLE.to_string(),
        }
    }

    /// Quoted form for use in SQL: `"dataset"."table"`.
    pub fn quoted(&self) -> String {
        format!("\"{}\".\"{}\"", self.dataset, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Accept identifiers of the form `[A-Za-z_][A-Za-z0-9_]{0,62}`.
pub fn validate_identifier(ident: &str) -> Result<&str, WarehouseError> {
    // ---
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && ident.len() <= 63 {
        Ok(ident)
    } else {
        Err(WarehouseError::InvalidIdentifier(ident.to_string()))
    }
}

/// Append-only analytical store holding loaded rows.
pub trait Warehouse {
    /// Project the warehouse belongs to; first part of a table id.
    fn project(&self) -> &str;

    /// Fully qualified identifier of `target`.
    fn table_id(&self, target: &TableRef) -> String {
        format!("{}.{}", self.project(), target)
    }

    /// Distinct non-null `file_name` values already persisted in `target`.
    ///
    /// Returns [`WarehouseError::TableNotFound`] when `target` does not exist.
    fn loaded_files(
        &self,
        target: &TableRef,
    ) -> impl Future<Output = Result<HashSet<String>, WarehouseError>> + Send;

    /// Append `rows` to `target`, creating it if needed.
    ///
    /// Resolves once the load is committed, with the number of rows accepted
    /// and the fully qualified table id.
    fn load_rows(
        &self,
        rows: &[LoadedRow],
        target: &TableRef,
    ) -> impl Future<Output = Result<(u64, String), WarehouseError>> + Send;
}

/// Postgres-backed warehouse.
#[derive(Debug, Clone)]
pub struct PgWarehouse {
    // ---
    pool: PgPool,
    project: String,
}

impl PgWarehouse {
    // ---
    pub fn new(pool: PgPool, project: impl Into<String>) -> Self {
        Self {
            pool,
            project: project.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Warehouse for PgWarehouse {
    // ---
    fn project(&self) -> &str {
        &self.project
    }

    async fn loaded_files(&self, target: &TableRef) -> Result<HashSet<String>, WarehouseError> {
        // ---
        let sql = format!(
            "SELECT DISTINCT file_name FROM {} WHERE file_name IS NOT NULL",
            target.quoted()
        );

        let names: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, target))?;

        Ok(names.into_iter().collect())
    }

    async fn load_rows(
        &self,
        rows: &[LoadedRow],
        target: &TableRef,
    ) -> Result<(u64, String), WarehouseError> {
        // ---
        schema::create_records_table(&self.pool, target).await?;

        let mut tx = self.pool.begin().await?;
        let mut loaded = 0u64;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (file_name, \"timestamp\", heart_rate, power, cadence, speed, enhanced_speed) ",
                target.quoted()
            ));
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(row.file_name.as_str())
                    .push_bind(row.timestamp)
                    .push_bind(row.heart_rate)
                    .push_bind(row.power)
                    .push_bind(row.cadence)
                    .push_bind(row.speed)
                    .push_bind(row.enhanced_speed);
            });

            let result = qb.build().execute(&mut *tx).await?;
            loaded += result.rows_affected();
        }

        tx.commit().await?;

        let table_id = self.table_id(target);
        tracing::debug!("Committed {} row(s) to {}", loaded, table_id);
        Ok((loaded, table_id))
    }
}

/// Map a missing table or schema onto [`WarehouseError::TableNotFound`].
fn classify(err: sqlx::Error, target: &TableRef) -> WarehouseError {
    // ---
    let missing = match &err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(UNDEFINED_TABLE) | Some(INVALID_SCHEMA_NAME)
        ),
        _ => false,
    };

    if missing {
        WarehouseError::TableNotFound(target.to_string())
    } else {
        WarehouseError::Database(err)
    }
}
