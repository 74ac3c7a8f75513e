//! Emergency requests.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{fields, Emergency, EmergencyType};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::{patch_of, Filter};
use crate::ward::WardKey;

use super::extract::{non_empty, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyRequest {
    #[serde(rename = "type")]
    pub kind: Option<EmergencyType>,
    pub details: Option<String>,
    pub ward: Option<String>,
    pub location: Option<String>,
    /// Defaults to the requester's phone
    pub contact_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyQuery {
    pub ward: Option<String>,
}

/// POST /api/emergency
#[tracing::instrument(name = "emergencies.create", skip_all, fields(user_id = %current.id()))]
pub async fn create_emergency(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<CreateEmergencyRequest>,
) -> Result<(StatusCode, Json<Emergency>)> {
    let kind = req
        .kind
        .ok_or_else(|| AppError::validation("type is required"))?;
    let ward = non_empty(req.ward).unwrap_or_else(|| current.0.ward.clone());
    if WardKey::new(&ward).is_empty() {
        return Err(AppError::validation("ward is required"));
    }
    let contact_number =
        non_empty(req.contact_number).unwrap_or_else(|| current.0.phone.clone());

    let emergency = Emergency::new(
        current.id().to_string(),
        kind,
        non_empty(req.details),
        ward,
        non_empty(req.location),
        contact_number,
    );
    state.store.create(&emergency).await?;

    tracing::info!(emergency_id = %emergency.id, kind = ?emergency.kind, "Emergency raised");
    Ok((StatusCode::CREATED, Json(emergency)))
}

/// GET /api/emergency?ward=
///
/// Active emergencies only.
pub async fn list_emergencies(
    State(state): State<AppState>,
    Query(query): Query<EmergencyQuery>,
) -> Result<Json<Vec<Emergency>>> {
    let mut filter = Filter::new().eq(fields::IS_ACTIVE, true);
    if let Some(ward) = non_empty(query.ward) {
        filter = filter.ward(fields::WARD, &WardKey::new(&ward));
    }

    let emergencies: Vec<Emergency> = state.store.list_recent(&filter).await?;
    Ok(Json(emergencies))
}

/// PUT /api/emergency/{id}/close
#[tracing::instrument(name = "emergencies.close", skip_all, fields(emergency_id = %id))]
pub async fn close_emergency(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Emergency>> {
    let emergency: Emergency = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Emergency not found"))?;

    authorize(
        &current.actor(),
        Operation::CloseEmergency {
            requester: &emergency.requester,
        },
    )
    .into_result()?;

    let closed: Option<Emergency> = state
        .store
        .patch(
            &id,
            &Filter::new(),
            patch_of([(fields::IS_ACTIVE, Value::Bool(false))]),
        )
        .await?;

    closed
        .map(Json)
        .ok_or_else(|| AppError::not_found("Emergency not found"))
}
