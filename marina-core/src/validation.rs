/// Booking form rule violations, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("select check-in and check-out dates")]
    MissingDates,
    #[error("check-out must be after check-in")]
    CheckOutNotAfterCheckIn,
    #[error("check-in date cannot be in the past")]
    CheckInInPast,
    #[error("name must be between 2 and 100 characters")]
    NameLength,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email must be at most 255 characters")]
    EmailTooLong,
    #[error("phone must be at most 30 characters")]
    PhoneTooLong,
    #[error("guests must be between 1 and 10")]
    GuestCount,
    #[error("message must be at most 1000 characters")]
    MessageTooLong,
    #[error("only future dates can be changed")]
    DateNotInFuture,
}

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const PHONE_MAX_CHARS: usize = 30;
pub const MESSAGE_MAX_CHARS: usize = 1000;
pub const GUESTS_MIN: i64 = 1;
pub const GUESTS_MAX: i64 = 10;

/// Checks the shape of an email address.
///
/// Exactly one `@`, a non-empty local part, and a dotted domain whose labels
/// are non-empty. Length is checked separately so the two failures report
/// different messages.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    if !local.chars().all(valid_local) || !domain.chars().all(valid_domain) {
        return false;
    }

    domain.split('.').all(|label| !label.is_empty())
}

/// Trims an optional free-text field, mapping blank input to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
