pub mod availability;
pub mod booking;
pub mod booking_service;
pub mod content;
pub mod content_service;
pub mod events;
pub mod pii;
pub mod repository;
pub mod validation;

pub use availability::{AvailabilityMarker, BlockedCalendar, ToggleOutcome};
pub use booking::{Booking, BookingAction, BookingRequest, BookingStatus, NewBooking, StatusCounts};
pub use booking_service::{BookingService, DashboardStats, LifecycleRules};
pub use content::{ContentPath, Section, SiteContent};
pub use content_service::{ContentService, ImageUpload};
pub use events::{ChangeEvent, ChangeTable};
pub use validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    ValidationError(#[from] ValidationError),
    #[error("{0}")]
    ContentError(#[from] content::ContentError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
