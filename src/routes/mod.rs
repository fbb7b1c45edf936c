//! Routes gateway for the read-only dashboard API.
//!
//! Each sibling module exports a subrouter; `main` of `fitflow-dashboard`
//! only sees [`router`].
use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod health;
mod sessions;
mod stats;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(stats::router())
        .merge(sessions::router())
        .merge(health::router())
        .with_state((pool, config))
}
