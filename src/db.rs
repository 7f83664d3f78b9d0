//! Postgres connection pooling.

use std::time::Duration;

use anyhow::{Context, Result};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::config::AppConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub const DEFAULT_MAX_POOL_SIZE: u32 = 4;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the pool sized from configuration.
pub fn connect(config: &AppConfig) -> Result<PgPool> {
    build_pool(&config.database_url, config.database_max_pool_size)
}

pub fn build_pool(database_url: &str, max_size: u32) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(CONNECTION_TIMEOUT)
        .build(manager)
        .context("failed to build database pool")
}
