use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use marina_store::redis_repo::intake_rate_key;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Per-IP fixed-window limit on booking submissions. Fails open when Redis
/// is unavailable or not configured.
pub async fn intake_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(req).await);
    };

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = intake_rate_key(&ip);

    let rules = &state.business_rules;
    match redis
        .check_rate_limit(&key, rules.intake_rate_limit, rules.intake_rate_window_seconds)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => {
            warn!(%ip, "Booking intake rate limit exceeded");
            Err(AppError::RateLimited)
        }
        Err(e) => {
            warn!("Rate limiter unavailable, allowing request: {}", e);
            Ok(next.run(req).await)
        }
    }
}
