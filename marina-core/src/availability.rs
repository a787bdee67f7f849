use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::booking::{nights_between, Booking};
use crate::validation::ValidationError;

/// A manually blocked (or explicitly free) day. No row means available.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityMarker {
    pub date: NaiveDate,
    pub is_available: bool,
}

impl AvailabilityMarker {
    pub fn blocked(date: NaiveDate) -> Self {
        Self {
            date,
            is_available: false,
        }
    }
}

/// Result of flipping a date's blocked state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    /// A blocked marker was written for the date
    Blocked,
    /// The date's marker was removed
    Unblocked,
}

impl ToggleOutcome {
    /// Blocked dates get freed, everything else gets blocked.
    pub fn for_current(currently_blocked: bool) -> Self {
        if currently_blocked {
            ToggleOutcome::Unblocked
        } else {
            ToggleOutcome::Blocked
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ToggleOutcome::Blocked)
    }
}

/// Admins may only change days strictly after today.
pub fn ensure_toggleable(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date <= today {
        return Err(ValidationError::DateNotInFuture);
    }
    Ok(())
}

/// Why a stay cannot be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StayConflict {
    BlockedDate(NaiveDate),
    ConfirmedBooking(uuid::Uuid),
}

impl std::fmt::Display for StayConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StayConflict::BlockedDate(date) => write!(f, "date {} is not available", date),
            StayConflict::ConfirmedBooking(id) => {
                write!(f, "dates overlap confirmed booking {}", id)
            }
        }
    }
}

/// In-memory view of the blocked days, ordered by date.
#[derive(Debug, Clone, Default)]
pub struct BlockedCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl BlockedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markers<I>(markers: I) -> Self
    where
        I: IntoIterator<Item = AvailabilityMarker>,
    {
        Self {
            dates: markers
                .into_iter()
                .filter(|m| !m.is_available)
                .map(|m| m.date)
                .collect(),
        }
    }

    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn block(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    pub fn unblock(&mut self, date: NaiveDate) {
        self.dates.remove(&date);
    }

    pub fn toggle(&mut self, date: NaiveDate) -> ToggleOutcome {
        let outcome = ToggleOutcome::for_current(self.is_blocked(date));
        match outcome {
            ToggleOutcome::Blocked => self.block(date),
            ToggleOutcome::Unblocked => self.unblock(date),
        }
        outcome
    }

    /// Blocked dates within `[from, to]`; open ends are unbounded.
    pub fn range(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .filter(|d| from.map_or(true, |f| *d >= f) && to.map_or(true, |t| *d <= t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// First reason the nights of `booking` cannot be confirmed, if any.
pub fn find_conflict(
    booking: &Booking,
    blocked: &[NaiveDate],
    confirmed: &[Booking],
) -> Option<StayConflict> {
    let blocked_night = nights_between(booking.check_in, booking.check_out)
        .find(|night| blocked.contains(night));
    if let Some(date) = blocked_night {
        return Some(StayConflict::BlockedDate(date));
    }

    confirmed
        .iter()
        .filter(|other| other.id != booking.id)
        .find(|other| other.overlaps(booking.check_in, booking.check_out))
        .map(|other| StayConflict::ConfirmedBooking(other.id))
}
