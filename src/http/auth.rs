use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth::AuthService;
use crate::domain::user::{Capability, UserRole};
use crate::http::AppError;
use crate::AppState;

/// Authenticated caller, decoded from the access token without a
/// database round trip (the role rides in the token claims).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AppError::forbidden("not allowed for this role"))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let service = AuthService::new(
            state.db.clone(),
            state.paseto_access_key,
            state.paseto_refresh_key,
            state.access_ttl_minutes,
            state.refresh_ttl_days,
        );
        let session = service
            .authenticate_access_token(token)
            .map_err(|_| AppError::internal("failed to authenticate"))?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        Ok(AuthUser {
            user_id: session.user_id,
            role: session.role,
        })
    }
}
