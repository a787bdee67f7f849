use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{self, ValidationError};
use crate::{CoreError, CoreResult};

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
        }
    }

    /// Actions an admin may take from this status. Only `pending` has any.
    pub fn available_actions(&self) -> &'static [BookingAction] {
        match self {
            BookingStatus::Pending => &[BookingAction::Confirm, BookingAction::Reject],
            BookingStatus::Confirmed | BookingStatus::Rejected => &[],
        }
    }

    /// Transition: Pending → Confirmed | Rejected
    pub fn apply(self, action: BookingAction) -> CoreResult<BookingStatus> {
        let to = action.target();
        if !self.available_actions().contains(&action) {
            return Err(CoreError::InvalidTransition { from: self, to });
        }
        Ok(to)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            other => Err(CoreError::StorageError(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Reject,
}

impl BookingAction {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Confirm => BookingStatus::Confirmed,
            BookingAction::Reject => BookingStatus::Rejected,
        }
    }
}

/// A guest's request to stay at the villa for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub message: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Materialize a validated request as a fresh `pending` booking.
    pub fn from_new(new: &NewBooking) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_name: new.user_name.clone(),
            user_email: new.user_email.clone(),
            user_phone: new.user_phone.clone(),
            check_in: new.check_in,
            check_out: new.check_out,
            guests: new.guests,
            message: new.message.clone(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Nights occupied by the stay: `[check_in, check_out)`.
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> {
        nights_between(self.check_in, self.check_out)
    }

    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && check_in < self.check_out
    }

    pub fn available_actions(&self) -> &'static [BookingAction] {
        self.status.available_actions()
    }
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    check_in.iter_days().take_while(move |d| *d < check_out)
}

/// Raw booking form input as a guest submits it.
///
/// Deserialization never fails on a missing or malformed field: absent text
/// is empty, unreadable dates are `None`, and an unreadable guest count is 0,
/// so `validate` reports the first broken rule in form order.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub guests: i64,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub check_out: Option<NaiveDate>,
}

mod lenient {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_text(d)?.unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Integers too large for `i64` saturate; anything else is 0.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value
            .as_i64()
            .or_else(|| value.as_u64().map(|_| i64::MAX))
            .unwrap_or(0))
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        Ok(optional_text(d)?.and_then(|s| s.trim().parse().ok()))
    }
}

impl BookingRequest {
    /// Checks the form against the intake rules and reports the first
    /// violation. Dates come first, then fields in form order.
    pub fn validate(&self, today: NaiveDate) -> Result<NewBooking, ValidationError> {
        let (check_in, check_out) = match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => (check_in, check_out),
            _ => return Err(ValidationError::MissingDates),
        };

        if check_out <= check_in {
            return Err(ValidationError::CheckOutNotAfterCheckIn);
        }

        if check_in < today {
            return Err(ValidationError::CheckInInPast);
        }

        let name = self.name.trim();
        let name_len = name.chars().count();
        if !(validation::NAME_MIN_CHARS..=validation::NAME_MAX_CHARS).contains(&name_len) {
            return Err(ValidationError::NameLength);
        }

        let email = self.email.trim();
        if !validation::is_valid_email(email) {
            return Err(ValidationError::InvalidEmail);
        }
        if email.chars().count() > validation::EMAIL_MAX_CHARS {
            return Err(ValidationError::EmailTooLong);
        }

        let phone = validation::non_blank(self.phone.as_deref());
        if phone
            .as_ref()
            .is_some_and(|p| p.chars().count() > validation::PHONE_MAX_CHARS)
        {
            return Err(ValidationError::PhoneTooLong);
        }

        if !(validation::GUESTS_MIN..=validation::GUESTS_MAX).contains(&self.guests) {
            return Err(ValidationError::GuestCount);
        }
        let guests = i32::try_from(self.guests).map_err(|_| ValidationError::GuestCount)?;

        let message = validation::non_blank(self.message.as_deref());
        if message
            .as_ref()
            .is_some_and(|m| m.chars().count() > validation::MESSAGE_MAX_CHARS)
        {
            return Err(ValidationError::MessageTooLong);
        }

        Ok(NewBooking {
            user_name: name.to_string(),
            user_email: email.to_string(),
            user_phone: phone,
            check_in,
            check_out,
            guests,
            message,
        })
    }
}

/// A booking request that passed validation. Only `BookingRequest::validate`
/// produces one.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct NewBooking {
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub rejected: i64,
}

impl StatusCounts {
    pub fn record(&mut self, status: BookingStatus) {
        match status {
            BookingStatus::Pending => self.pending += 1,
            BookingStatus::Confirmed => self.confirmed += 1,
            BookingStatus::Rejected => self.rejected += 1,
        }
    }
}
