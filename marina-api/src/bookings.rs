use axum::{
    extract::{Json, State},
    http::StatusCode,
    middleware,
    routing::post,
    Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use marina_core::{Booking, BookingAction, BookingRequest};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::intake_rate_limit_middleware;
use crate::state::AppState;

/// A booking plus the actions an admin may still take on it.
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub available_actions: &'static [BookingAction],
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        let available_actions = booking.available_actions();
        Self {
            booking,
            available_actions,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().route(
        "/v1/bookings",
        post(submit_booking)
            .route_layer(middleware::from_fn_with_state(state, intake_rate_limit_middleware)),
    )
}

/// POST /v1/bookings
async fn submit_booking(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<BookingRequest>, AppError>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let today = Utc::now().date_naive();
    let booking = state.bookings.submit(&req, today).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}
