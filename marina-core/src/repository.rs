use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::availability::ToggleOutcome;
use crate::booking::{Booking, BookingStatus, NewBooking, StatusCounts};
use crate::content::SiteContent;
use crate::CoreResult;

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a `pending` booking.
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>>;

    /// Move `id` from `from` to `to` only if it is still in `from`, blocking
    /// `block_nights` in the same write. `None` means the booking was no
    /// longer in `from` (or is gone).
    ///
    /// Moving to `confirmed` fails with `Conflict` when a night of the stay is
    /// blocked or taken by another confirmed booking. The check and the write
    /// are atomic with respect to other confirmations and toggles.
    async fn update_status_if(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        block_nights: &[NaiveDate],
    ) -> CoreResult<Option<Booking>>;

    async fn count_by_status(&self) -> CoreResult<StatusCounts>;
}

/// Repository trait for day-level availability markers
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Blocked dates in `[from, to]`, ascending.
    async fn blocked_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<NaiveDate>>;

    /// Delete the marker if the date is blocked, otherwise upsert a blocked one.
    async fn toggle_date(&self, date: NaiveDate) -> CoreResult<ToggleOutcome>;

    async fn count_blocked(&self) -> CoreResult<i64>;
}

/// Repository trait for per-section page content
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn get_section(&self, section: &str) -> CoreResult<Option<SiteContent>>;

    async fn put_section(
        &self,
        section: &str,
        content: &Value,
        updated_by: Uuid,
    ) -> CoreResult<SiteContent>;
}

/// Role membership lookup backing the admin boundary
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn has_role(&self, user_id: Uuid, role: &str) -> CoreResult<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
}

/// Blob storage for uploaded images
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under a fresh unique key keeping `extension`.
    async fn put_object(
        &self,
        extension: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> CoreResult<StoredObject>;

    /// Remove a stored object. Missing keys are not an error.
    async fn delete_object(&self, key: &str) -> CoreResult<()>;
}
