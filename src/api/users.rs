//! User profile, push token and administration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{AppError, Result};
use crate::models::{fields, Profile, Role, User, UserResponse};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::{patch_of, Filter};

use super::extract::{non_empty, required, ApiJson};

/// Guarded profile writes before giving up with 409
const PROFILE_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub ward: Option<String>,
    pub is_verified: Option<bool>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub token: Option<String>,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserResponse>>> {
    authorize(&current.actor(), Operation::ManageUsers).into_result()?;

    let users: Vec<User> = state.store.list(&Filter::new()).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /api/users/profile
pub async fn get_profile(current: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&current.0))
}

/// PUT /api/users/profile
#[tracing::instrument(name = "users.update_profile", skip_all, fields(user_id = %current.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let changes = patch_of(
        [
            (fields::NAME, non_empty(req.name)),
            (fields::WARD, non_empty(req.ward)),
            (fields::DISTRICT, non_empty(req.district)),
            (fields::STATE, non_empty(req.state)),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, Value::String(v)))),
    );

    let user = patch_user(&state, current.id(), changes, req.profile).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Apply `changes` to a user, overlaying `profile` onto the stored profile.
///
/// Only the supplied fields are written. The profile is replaced under a
/// guard on its previous value and re-read if another write got there first.
async fn patch_user(
    state: &AppState,
    id: &str,
    mut changes: Map<String, Value>,
    profile: Option<Profile>,
) -> Result<User> {
    let Some(update) = profile else {
        let updated: Option<User> = if changes.is_empty() {
            state.store.get(id).await?
        } else {
            state.store.patch(id, &Filter::new(), changes).await?
        };
        return updated.ok_or_else(user_not_found);
    };

    for _ in 0..PROFILE_WRITE_ATTEMPTS {
        let user: User = state.store.get(id).await?.ok_or_else(user_not_found)?;
        let previous = serde_json::to_value(&user.profile)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut merged = user.profile;
        merged.merge(update.clone());
        changes.insert(
            fields::PROFILE.to_string(),
            serde_json::to_value(&merged).map_err(|e| AppError::Internal(e.to_string()))?,
        );

        let guard = Filter::new().eq(fields::PROFILE, previous);
        if let Some(updated) = state.store.patch(id, &guard, changes.clone()).await? {
            return Ok(updated);
        }
        tracing::debug!(user_id = %id, "Profile changed during update, retrying");
    }

    Err(AppError::Conflict(
        "Profile was modified concurrently, please retry".to_string(),
    ))
}

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

/// POST /api/users/push-token
#[tracing::instrument(name = "users.register_push_token", skip_all, fields(user_id = %current.id()))]
pub async fn register_push_token(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<PushTokenRequest>,
) -> Result<Json<Value>> {
    let token = required(req.token, "Push token")?;

    if !state.dispatcher.gateway().is_valid_token(&token) {
        // Stored anyway; the dispatcher skips it until the client re-registers
        tracing::warn!(token = %token, "Registered push token is not a valid gateway token");
    }

    let updated: Option<User> = state
        .store
        .patch(
            current.id(),
            &Filter::new(),
            patch_of([(fields::PUSH_TOKEN, Value::String(token))]),
        )
        .await?;

    if updated.is_none() {
        return Err(user_not_found());
    }

    Ok(Json(json!({ "message": "Push token registered successfully" })))
}

/// PUT /api/users/{id}
#[tracing::instrument(name = "users.admin_update", skip_all, fields(target = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    authorize(&current.actor(), Operation::ManageUsers).into_result()?;

    let mut changes = patch_of(
        [
            (fields::NAME, non_empty(req.name)),
            (fields::PHONE, non_empty(req.phone)),
            (fields::WARD, non_empty(req.ward)),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, Value::String(v)))),
    );
    if let Some(role) = req.role {
        changes.insert(fields::ROLE.to_string(), Value::String(role.as_str().to_string()));
    }
    if let Some(verified) = req.is_verified {
        changes.insert(fields::IS_VERIFIED.to_string(), Value::Bool(verified));
    }

    // Changing to a phone that is already taken yields 409
    let user = patch_user(&state, &id, changes, req.profile).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User updated by admin");
    Ok(Json(UserResponse::from(&user)))
}
