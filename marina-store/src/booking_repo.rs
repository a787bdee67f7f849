use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use marina_core::availability::{find_conflict, StayConflict};
use marina_core::repository::BookingRepository;
use marina_core::{Booking, BookingStatus, CoreError, CoreResult, NewBooking, StatusCounts};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::database::{db_err, lock_calendar};

const BOOKING_COLUMNS: &str =
    "id, user_name, user_email, user_phone, check_in, check_out, guests, message, status, created_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_name: String,
    user_email: String,
    user_phone: Option<String>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: i32,
    message: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_name: self.user_name,
            user_email: self.user_email,
            user_phone: self.user_phone,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            message: self.message,
            status: self.status.parse()?,
            created_at: self.created_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> CoreResult<Vec<Booking>> {
    rows.into_iter().map(BookingRow::into_booking).collect()
}

/// Exclusion constraint keeping confirmed stays from overlapping.
const NO_OVERLAP_CONSTRAINT: &str = "bookings_no_overlapping_confirmed";

fn confirm_err(e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.constraint() == Some(NO_OVERLAP_CONSTRAINT) {
            warn!("Confirm rejected by {}", NO_OVERLAP_CONSTRAINT);
            return CoreError::Conflict("dates overlap a confirmed booking".to_string());
        }
    }
    db_err(e)
}

/// Blocked nights and other confirmed stays seen inside the transaction.
async fn stay_conflict(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
) -> CoreResult<Option<StayConflict>> {
    let blocked = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT date FROM availability
        WHERE is_available = false AND date >= $1 AND date < $2
        ORDER BY date
        "#,
    )
    .bind(booking.check_in)
    .bind(booking.check_out)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        SELECT {} FROM bookings
        WHERE status = 'confirmed' AND id <> $1 AND check_in < $3 AND $2 < check_out
        ORDER BY check_in
        "#,
        BOOKING_COLUMNS
    ))
    .bind(booking.id)
    .bind(booking.check_in)
    .bind(booking.check_out)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(find_conflict(booking, &blocked, &into_bookings(rows)?))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (id, user_name, user_email, user_phone, check_in, check_out, guests, message, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&booking.user_name)
        .bind(&booking.user_email)
        .bind(&booking.user_phone)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guests)
        .bind(&booking.message)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_booking()
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {} FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
            BOOKING_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_bookings(rows)
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        block_nights: &[NaiveDate],
    ) -> CoreResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if to == BookingStatus::Confirmed {
            lock_calendar(&mut tx).await?;
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $3 WHERE id = $1 AND status = $2 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(confirm_err)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        };
        let booking = row.into_booking()?;

        if to == BookingStatus::Confirmed {
            if let Some(conflict) = stay_conflict(&mut tx, &booking).await? {
                tx.rollback().await.map_err(db_err)?;
                return Err(CoreError::Conflict(conflict.to_string()));
            }
        }

        if !block_nights.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO availability (date, is_available)
                SELECT night, false FROM UNNEST($1::date[]) AS night
                ON CONFLICT (date) DO UPDATE SET is_available = false, updated_at = now()
                "#,
            )
            .bind(block_nights.to_vec())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        Ok(Some(booking))
    }

    async fn count_by_status(&self) -> CoreResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.parse::<BookingStatus>()? {
                BookingStatus::Pending => counts.pending = count,
                BookingStatus::Confirmed => counts.confirmed = count,
                BookingStatus::Rejected => counts.rejected = count,
            }
        }
        Ok(counts)
    }
}
