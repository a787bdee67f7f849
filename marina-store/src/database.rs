use marina_core::CoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Transaction};
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Log a database failure and hide its details behind a storage error.
pub(crate) fn db_err(e: sqlx::Error) -> CoreError {
    error!("Database error: {}", e);
    CoreError::StorageError(e.to_string())
}

/// Advisory lock key serializing confirmations and calendar toggles.
const CALENDAR_LOCK: i64 = 0x6d61_7269_6e61;

/// Hold the calendar lock until `tx` ends.
pub(crate) async fn lock_calendar(tx: &mut Transaction<'_, Postgres>) -> Result<(), CoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CALENDAR_LOCK)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}
