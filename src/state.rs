use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    alerts::AlertSink,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    renderer::PdfEngine,
    storage::ObjectStorage,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub renderer: Arc<dyn PdfEngine>,
    pub alerts: Arc<dyn AlertSink>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        renderer: Arc<dyn PdfEngine>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            renderer,
            alerts,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
