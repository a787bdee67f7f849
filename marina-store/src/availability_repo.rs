use async_trait::async_trait;
use chrono::NaiveDate;
use marina_core::repository::AvailabilityRepository;
use marina_core::{CoreResult, ToggleOutcome};
use sqlx::PgPool;

use crate::database::{db_err, lock_calendar};

pub struct PgAvailabilityRepository {
    pool: PgPool,
}

impl PgAvailabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for PgAvailabilityRepository {
    async fn blocked_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<NaiveDate>> {
        sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT date FROM availability
            WHERE is_available = false
              AND ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
            ORDER BY date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn toggle_date(&self, date: NaiveDate) -> CoreResult<ToggleOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        lock_calendar(&mut tx).await?;

        // Blocked → free: drop the marker
        let freed = sqlx::query("DELETE FROM availability WHERE date = $1 AND is_available = false")
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        let outcome = ToggleOutcome::for_current(freed > 0);
        if outcome.is_blocked() {
            sqlx::query(
                r#"
                INSERT INTO availability (date, is_available) VALUES ($1, false)
                ON CONFLICT (date) DO UPDATE SET is_available = false, updated_at = now()
                "#,
            )
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    async fn count_blocked(&self) -> CoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM availability WHERE is_available = false")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
