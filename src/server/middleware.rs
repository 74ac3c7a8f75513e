use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use super::AppState;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::policy::Actor;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated user, loaded from the store on every request.
///
/// Rejects with 401 when the token is missing, invalid, expired, or names a
/// user that no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(&parts.headers) else {
            tracing::debug!("Missing bearer token");
            return Err(AppError::Auth("Not authorized, no token".to_string()));
        };

        let claims = state.tokens.validate(token)?;

        let user = state
            .store
            .get::<User>(claims.user_id())
            .await?
            .ok_or_else(|| AppError::Auth("Not authorized, user not found".to_string()))?;

        Ok(CurrentUser(user))
    }
}
