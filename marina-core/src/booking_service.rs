use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::{ensure_toggleable, ToggleOutcome};
use crate::booking::{Booking, BookingAction, BookingRequest, BookingStatus};
use crate::pii::MaskedEmail;
use crate::repository::{AvailabilityRepository, BookingRepository};
use crate::{CoreError, CoreResult};

/// Knobs for how confirmation interacts with the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleRules {
    /// Block every night of a stay when it is confirmed
    pub block_dates_on_confirm: bool,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            block_dates_on_confirm: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub pending: i64,
    pub confirmed: i64,
    pub rejected: i64,
    pub blocked_days: i64,
}

/// Manages the booking lifecycle and keeps the calendar consistent with it
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    rules: LifecycleRules,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        rules: LifecycleRules,
    ) -> Self {
        Self {
            bookings,
            availability,
            rules,
        }
    }

    /// Validate a guest request and store it as `pending`. Overlapping
    /// requests are accepted; conflicts are settled at confirmation.
    pub async fn submit(&self, request: &BookingRequest, today: NaiveDate) -> CoreResult<Booking> {
        let new = request.validate(today)?;
        let booking = self.bookings.create_booking(&new).await?;

        info!(
            booking_id = %booking.id,
            email = %MaskedEmail(&booking.user_email),
            check_in = %booking.check_in,
            check_out = %booking.check_out,
            "Booking request received"
        );
        Ok(booking)
    }

    pub async fn list(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        self.bookings.list_bookings(status).await
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", id)))
    }

    /// Transition: Pending → Confirmed | Rejected
    ///
    /// Confirmation fails with `Conflict` when a night of the stay is already
    /// blocked or taken by another confirmed booking. The store checks this
    /// and writes the status in one step, conditional on the booking still
    /// being `pending`, so of two admins racing only the first wins.
    pub async fn transition(&self, id: Uuid, action: BookingAction) -> CoreResult<Booking> {
        let booking = self.get(id).await?;
        let from = booking.status;
        let to = from.apply(action)?;

        let block_nights: Vec<NaiveDate> =
            if to == BookingStatus::Confirmed && self.rules.block_dates_on_confirm {
                booking.nights().collect()
            } else {
                Vec::new()
            };

        let updated = self
            .bookings
            .update_status_if(id, from, to, &block_nights)
            .await
            .inspect_err(|e| {
                if let CoreError::Conflict(reason) = e {
                    warn!(booking_id = %id, "Cannot confirm booking: {}", reason);
                }
            })?;

        match updated {
            Some(updated) => {
                info!(booking_id = %id, %from, %to, blocked_nights = block_nights.len(), "Booking status updated");
                Ok(updated)
            }
            None => {
                let current = self.get(id).await?;
                warn!(booking_id = %id, status = %current.status, "Booking changed concurrently");
                Err(CoreError::InvalidTransition {
                    from: current.status,
                    to,
                })
            }
        }
    }

    /// Flip a future date between blocked and free.
    pub async fn toggle_date(&self, date: NaiveDate, today: NaiveDate) -> CoreResult<ToggleOutcome> {
        ensure_toggleable(date, today)?;
        let outcome = self.availability.toggle_date(date).await?;
        info!(%date, ?outcome, "Availability toggled");
        Ok(outcome)
    }

    pub async fn blocked_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<NaiveDate>> {
        self.availability.blocked_dates(from, to).await
    }

    pub async fn stats(&self) -> CoreResult<DashboardStats> {
        let counts = self.bookings.count_by_status().await?;
        let blocked_days = self.availability.count_blocked().await?;
        Ok(DashboardStats {
            pending: counts.pending,
            confirmed: counts.confirmed,
            rejected: counts.rejected,
            blocked_days,
        })
    }
}
