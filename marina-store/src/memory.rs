use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use marina_core::repository::{
    AvailabilityRepository, BookingRepository, ContentRepository, RoleRepository,
};
use marina_core::availability::find_conflict;
use marina_core::{
    BlockedCalendar, Booking, BookingStatus, ChangeTable, CoreError, CoreResult, NewBooking,
    SiteContent, StatusCounts, ToggleOutcome,
};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::notify::ChangeHub;

/// Process-local backend used for development and tests.
///
/// Publishes to the hub directly where the Postgres backend relies on table
/// triggers.
pub struct InMemoryStore {
    bookings: RwLock<Vec<Booking>>,
    calendar: RwLock<BlockedCalendar>,
    content: RwLock<HashMap<String, SiteContent>>,
    roles: RwLock<HashSet<(Uuid, String)>>,
    hub: Arc<ChangeHub>,
}

impl InMemoryStore {
    pub fn new(hub: Arc<ChangeHub>) -> Self {
        Self {
            bookings: RwLock::new(Vec::new()),
            calendar: RwLock::new(BlockedCalendar::new()),
            content: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashSet::new()),
            hub,
        }
    }

    pub fn hub(&self) -> Arc<ChangeHub> {
        self.hub.clone()
    }

    pub async fn grant_role(&self, user_id: Uuid, role: &str) {
        self.roles.write().await.insert((user_id, role.to_string()));
    }

    /// Insert a booking as-is, bypassing intake validation.
    pub async fn seed_booking(&self, booking: Booking) {
        let key = booking.id.to_string();
        self.bookings.write().await.push(booking);
        self.hub.publish(ChangeTable::Bookings, Some(key));
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking> {
        let booking = Booking::from_new(booking);
        self.bookings.write().await.push(booking.clone());
        self.hub
            .publish(ChangeTable::Bookings, Some(booking.id.to_string()));
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut listed: Vec<Booking> = bookings
            .iter()
            .rev()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        // stable: equal timestamps keep newest-insert-first
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        block_nights: &[NaiveDate],
    ) -> CoreResult<Option<Booking>> {
        // Conflict check and write happen under both locks
        let mut bookings = self.bookings.write().await;
        let mut calendar = self.calendar.write().await;

        let Some(index) = bookings.iter().position(|b| b.id == id && b.status == from) else {
            return Ok(None);
        };

        if to == BookingStatus::Confirmed {
            let booking = &bookings[index];
            let blocked = calendar.range(Some(booking.check_in), Some(booking.check_out));
            let confirmed: Vec<Booking> = bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed)
                .cloned()
                .collect();
            if let Some(conflict) = find_conflict(booking, &blocked, &confirmed) {
                return Err(CoreError::Conflict(conflict.to_string()));
            }
        }

        bookings[index].status = to;
        let updated = bookings[index].clone();

        let newly_blocked: Vec<NaiveDate> = block_nights
            .iter()
            .copied()
            .filter(|d| !calendar.is_blocked(*d))
            .collect();
        for date in &newly_blocked {
            calendar.block(*date);
        }
        drop(calendar);
        drop(bookings);

        self.hub.publish(ChangeTable::Bookings, Some(id.to_string()));
        for date in newly_blocked {
            self.hub
                .publish(ChangeTable::Availability, Some(date.to_string()));
        }
        Ok(Some(updated))
    }

    async fn count_by_status(&self) -> CoreResult<StatusCounts> {
        let bookings = self.bookings.read().await;
        let mut counts = StatusCounts::default();
        for booking in bookings.iter() {
            counts.record(booking.status);
        }
        Ok(counts)
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryStore {
    async fn blocked_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<NaiveDate>> {
        Ok(self.calendar.read().await.range(from, to))
    }

    async fn toggle_date(&self, date: NaiveDate) -> CoreResult<ToggleOutcome> {
        let outcome = self.calendar.write().await.toggle(date);
        self.hub
            .publish(ChangeTable::Availability, Some(date.to_string()));
        Ok(outcome)
    }

    async fn count_blocked(&self) -> CoreResult<i64> {
        Ok(self.calendar.read().await.len() as i64)
    }
}

#[async_trait]
impl ContentRepository for InMemoryStore {
    async fn get_section(&self, section: &str) -> CoreResult<Option<SiteContent>> {
        Ok(self.content.read().await.get(section).cloned())
    }

    async fn put_section(
        &self,
        section: &str,
        content: &Value,
        updated_by: Uuid,
    ) -> CoreResult<SiteContent> {
        let saved = SiteContent {
            section: section.to_string(),
            content: content.clone(),
            updated_by: Some(updated_by),
            updated_at: Some(Utc::now()),
        };
        self.content
            .write()
            .await
            .insert(section.to_string(), saved.clone());
        self.hub
            .publish(ChangeTable::SiteContent, Some(section.to_string()));
        Ok(saved)
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn has_role(&self, user_id: Uuid, role: &str) -> CoreResult<bool> {
        Ok(self
            .roles
            .read()
            .await
            .contains(&(user_id, role.to_string())))
    }
}
