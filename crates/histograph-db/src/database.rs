use histograph_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::node_repository::NodeRepository;
use crate::session_repository::SessionRepository;

/// Shared PostgreSQL handle. Cloning is cheap; repositories borrow the same pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool sized by `config.max_connections`. Migrations are not applied.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::debug!(max_connections = config.max_connections, "Database pool ready");
        Ok(Self { pool })
    }

    /// Use a pool opened elsewhere, e.g. against a test container.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bring the `nodes` and `extraction_sessions` schema up to date.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Node upserts and lookups.
    pub fn node_repo(&self) -> NodeRepository {
        NodeRepository::new(self.pool.clone())
    }

    pub fn session_repo(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
