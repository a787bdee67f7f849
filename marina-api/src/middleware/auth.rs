use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// Session token issued by the identity provider. `sub` is the user's id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
}

/// The signed-in admin, available to handlers behind the admin middleware.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract and verify the session token
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;
    let user_id = verify_session(bearer.token(), &state.auth.secret)?;

    // 2. Check role membership
    if !state.roles.has_role(user_id, &state.auth.admin_role).await? {
        warn!(%user_id, "Session without admin role rejected");
        return Err(AppError::AuthorizationError(
            "Admin access required".to_string(),
        ));
    }

    // 3. Inject the admin
    req.extensions_mut().insert(AdminUser { user_id });

    Ok(next.run(req).await)
}

/// Decode an HS256 session token and return its subject.
pub fn verify_session(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid session: {}", e)))?;

    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::AuthenticationError("Invalid session subject".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str, ttl: Duration) -> String {
        let claims = SessionClaims {
            sub: sub.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_verify_session_returns_subject() {
        let user = Uuid::new_v4();
        let t = token(&user.to_string(), "secret", Duration::hours(1));
        assert_eq!(verify_session(&t, "secret").unwrap(), user);
    }

    #[test]
    fn test_verify_session_rejects_bad_tokens() {
        let user = Uuid::new_v4().to_string();
        assert!(verify_session(&token(&user, "other", Duration::hours(1)), "secret").is_err());
        assert!(verify_session(&token(&user, "secret", Duration::hours(-2)), "secret").is_err());
        assert!(verify_session(&token("not-a-uuid", "secret", Duration::hours(1)), "secret").is_err());
        assert!(verify_session("garbage", "secret").is_err());
    }
}
