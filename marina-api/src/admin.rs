use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDate, Utc};
use marina_core::{BookingAction, BookingStatus, DashboardStats, ToggleOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bookings::BookingView;
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub date: NaiveDate,
    pub outcome: ToggleOutcome,
    pub is_blocked: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/bookings", get(list_bookings))
        .route("/v1/admin/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/admin/bookings/{id}/reject", post(reject_booking))
        .route("/v1/admin/availability/{date}/toggle", post(toggle_date))
        .route("/v1/admin/stats", get(stats))
}

// ============================================================================
// Booking Review Handlers
// ============================================================================

/// GET /v1/admin/bookings?status=
async fn list_bookings(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListBookingsQuery>, AppError>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let bookings = state.bookings.list(query.status).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

/// POST /v1/admin/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.bookings.transition(id, BookingAction::Confirm).await?;
    Ok(Json(booking.into()))
}

/// POST /v1/admin/bookings/{id}/reject
async fn reject_booking(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.bookings.transition(id, BookingAction::Reject).await?;
    Ok(Json(booking.into()))
}

// ============================================================================
// Calendar & Dashboard
// ============================================================================

/// POST /v1/admin/availability/{date}/toggle
async fn toggle_date(
    State(state): State<AppState>,
    WithRejection(Path(date), _): WithRejection<Path<NaiveDate>, AppError>,
) -> Result<Json<ToggleResponse>, AppError> {
    let today = Utc::now().date_naive();
    let outcome = state.bookings.toggle_date(date, today).await?;
    Ok(Json(ToggleResponse {
        date,
        outcome,
        is_blocked: outcome.is_blocked(),
    }))
}

/// GET /v1/admin/stats
async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.bookings.stats().await?))
}
