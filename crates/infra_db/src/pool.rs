//! Billing store connection
//!
//! Opens the PostgreSQL pool the billing adapter runs on and applies the
//! embedded schema (plans, enrollments, invoices, `invoice_number_seq`).

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// How long a request waits for a free connection before failing
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the billing store lives and how many connections it may hold
///
/// Every invoice write keeps one connection for its whole transaction, so
/// `max_connections` bounds how many enrollments can be invoiced at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
        }
    }

    /// Rejects settings the pool cannot start with
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.url.trim().is_empty() {
            return Err(DatabaseError::ConnectionFailed("database url is empty".into()));
        }
        if self.max_connections == 0 {
            return Err(DatabaseError::ConnectionFailed(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Opens the billing store pool
///
/// # Errors
///
/// `ConnectionFailed` when the settings are unusable or PostgreSQL cannot be
/// reached.
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    config.validate()?;
    info!(max_connections = config.max_connections, "Connecting to billing store");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("Billing store connected");
    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
