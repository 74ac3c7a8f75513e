//! Registration and login.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{fields, Profile, Role, User, UserResponse};
use crate::server::AppState;
use crate::store::Filter;

use super::extract::{required, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// User plus a freshly issued bearer token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

/// POST /api/auth/register
#[tracing::instrument(name = "auth.register", skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let name = required(req.name, "name")?;
    let phone = required(req.phone, "phone")?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("password is required"))?;
    let ward = required(req.ward, "ward")?;
    let district = required(req.district, "district")?;
    let region = required(req.state, "state")?;

    let role = req.role.unwrap_or_default();
    if role.is_moderator() {
        tracing::warn!(role = %role, "Refused self-registration with privileged role");
        return Err(AppError::Forbidden(format!(
            "Cannot self-register as {}",
            role
        )));
    }

    let existing: Option<User> = state
        .store
        .find_one(&Filter::new().eq(fields::PHONE, phone.as_str()))
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = state.passwords.hash(&password)?;
    let mut user = User::new(name, phone, password_hash, role, ward, district, region);
    if let Some(profile) = req.profile {
        user.profile = profile;
    }

    // A concurrent registration of the same phone surfaces as a 409 here
    state.store.create(&user).await?;
    let token = state.tokens.issue(&user.id)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

/// POST /api/auth/login
#[tracing::instrument(name = "auth.login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let phone = required(req.phone, "phone")?;
    let password = req.password.unwrap_or_default();

    let user: Option<User> = state
        .store
        .find_one(&Filter::new().eq(fields::PHONE, phone.as_str()))
        .await?;

    let user = match user {
        Some(user) if state.passwords.verify(&password, &user.password_hash) => user,
        _ => {
            tracing::debug!("Login rejected");
            return Err(AppError::Auth("Invalid phone or password".to_string()));
        }
    };

    let token = state.tokens.issue(&user.id)?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        token,
    }))
}
