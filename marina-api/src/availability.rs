use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct BlockedDatesResponse {
    pub blocked_dates: Vec<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/availability", get(blocked_dates))
}

/// GET /v1/availability?from=&to=
async fn blocked_dates(
    State(state): State<AppState>,
    WithRejection(Query(range), _): WithRejection<Query<RangeQuery>, AppError>,
) -> Result<Json<BlockedDatesResponse>, AppError> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if to < from {
            return Err(AppError::ValidationError(
                "'to' must not be before 'from'".to_string(),
            ));
        }
    }
    let blocked_dates = state.bookings.blocked_dates(range.from, range.to).await?;
    Ok(Json(BlockedDatesResponse { blocked_dates }))
}
