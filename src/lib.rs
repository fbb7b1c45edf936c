//! `fitflow` moves FIT activity files into storage, extracts their sensor
//! records, loads the files the warehouse has not seen yet, and serves
//! read-only dashboard queries over the loaded data.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): each one owns
//! a single concern and the binaries only call the gateways re-exported here.

pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod relocate;
pub mod routes;
pub mod schema;
pub mod telemetry;
pub mod warehouse;

pub use config::Config;
pub use error::{ApiError, ExtractError, WarehouseError};
pub use models::{Cell, LoadedRow, RecordTable, LOADED_COLUMNS};
pub use pipeline::{Disposal, FileOutcome, RunReport};
pub use warehouse::{PgWarehouse, TableRef, Warehouse};
