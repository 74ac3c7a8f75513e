//! Complaint endpoints.
//!
//! Creating a complaint notifies its ward. Resolving one is a conditional
//! update (`status != resolved`), so only the write that actually moves the
//! complaint into `resolved` stamps the resolver and notifies; repeated or
//! concurrent resolve requests see the condition fail and notify nobody.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{fields, timestamp, Complaint, ComplaintStatus, User};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::Filter;
use crate::ward::WardKey;

use super::details::{with_references, UserContact};
use super::extract::{non_empty, required, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Defaults to the reporter's ward
    pub ward: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaintRequest {
    pub status: Option<ComplaintStatus>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintQuery {
    pub ward: Option<String>,
}

/// Complaint with the reporter's name and phone
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintListing {
    #[serde(flatten)]
    pub complaint: Complaint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_details: Option<UserContact>,
}

async fn with_reporters(state: &AppState, filter: &Filter) -> Result<Vec<ComplaintListing>> {
    let complaints: Vec<Complaint> = state.store.list_recent(filter).await?;
    with_references(
        &state.store,
        complaints,
        |complaint| complaint.user.clone(),
        |complaint, user: Option<User>| ComplaintListing {
            user_details: user.map(UserContact::from),
            complaint,
        },
    )
    .await
}

/// POST /api/complaints
#[tracing::instrument(name = "complaints.create", skip_all, fields(user_id = %current.id()))]
pub async fn create_complaint(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<Complaint>)> {
    let title = required(req.title, "title")?;
    let description = required(req.description, "description")?;
    let ward = non_empty(req.ward).unwrap_or_else(|| current.0.ward.clone());
    if WardKey::new(&ward).is_empty() {
        return Err(AppError::validation("ward is required"));
    }

    let complaint = Complaint::new(
        current.id().to_string(),
        title,
        description,
        ward,
        non_empty(req.image_url),
    );
    state.store.create(&complaint).await?;

    tracing::info!(complaint_id = %complaint.id, ward = %complaint.ward, "Complaint submitted");
    state.triggers.complaint_created(&complaint).await;

    Ok((StatusCode::CREATED, Json(complaint)))
}

/// GET /api/complaints
///
/// Ward members and admins see the complaints of a ward (their own unless
/// `?ward=` names another one an admin may see); everyone else sees the
/// complaints they reported.
pub async fn list_complaints(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ComplaintQuery>,
) -> Result<Json<Vec<ComplaintListing>>> {
    let filter = if current.role().is_moderator() {
        let ward = non_empty(query.ward).unwrap_or_else(|| current.0.ward.clone());
        authorize(&current.actor(), Operation::ListWardComplaints { ward: &ward }).into_result()?;
        Filter::new().ward(fields::WARD, &WardKey::new(&ward))
    } else {
        Filter::new().eq(fields::USER, current.id())
    };

    Ok(Json(with_reporters(&state, &filter).await?))
}

/// GET /api/complaints/ward
pub async fn ward_feed(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ComplaintListing>>> {
    let filter = Filter::new().ward(fields::WARD, &WardKey::new(&current.0.ward));
    Ok(Json(with_reporters(&state, &filter).await?))
}

/// PUT /api/complaints/{id}
#[tracing::instrument(name = "complaints.update", skip_all, fields(complaint_id = %id))]
pub async fn update_complaint(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateComplaintRequest>,
) -> Result<Json<Complaint>> {
    let complaint: Complaint = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint not found"))?;

    authorize(
        &current.actor(),
        Operation::UpdateComplaint {
            ward: &complaint.ward,
        },
    )
    .into_result()?;

    let mut patch = Map::new();
    if let Some(assignee) = non_empty(req.assigned_to) {
        patch.insert(fields::ASSIGNED_TO.to_string(), Value::String(assignee));
    }

    match req.status {
        Some(ComplaintStatus::Resolved) => resolve(&state, &current, complaint, patch).await,
        Some(status) => {
            patch.insert(
                fields::STATUS.to_string(),
                Value::String(status.as_str().to_string()),
            );
            apply(&state, &id, patch).await
        }
        None if patch.is_empty() => Ok(Json(complaint)),
        None => apply(&state, &id, patch).await,
    }
}

/// Unconditional partial update
async fn apply(state: &AppState, id: &str, patch: Map<String, Value>) -> Result<Json<Complaint>> {
    let updated: Option<Complaint> = state.store.patch(id, &Filter::new(), patch).await?;
    updated
        .map(Json)
        .ok_or_else(|| AppError::not_found("Complaint not found"))
}

async fn resolve(
    state: &AppState,
    current: &CurrentUser,
    complaint: Complaint,
    mut patch: Map<String, Value>,
) -> Result<Json<Complaint>> {
    let mut transition = patch.clone();
    transition.insert(
        fields::STATUS.to_string(),
        Value::String(ComplaintStatus::Resolved.as_str().to_string()),
    );
    transition.insert(
        fields::RESOLVED_AT.to_string(),
        timestamp(Utc::now()),
    );
    transition.insert(
        fields::RESOLVED_BY.to_string(),
        Value::String(current.id().to_string()),
    );

    let not_resolved = Filter::new().ne(fields::STATUS, ComplaintStatus::Resolved.as_str());
    let resolved: Option<Complaint> = state
        .store
        .patch(&complaint.id, &not_resolved, transition)
        .await?;

    if let Some(resolved) = resolved {
        tracing::info!(
            complaint_id = %resolved.id,
            resolved_by = %current.id(),
            "Complaint resolved"
        );
        state.triggers.complaint_resolved(&resolved).await;
        return Ok(Json(resolved));
    }

    // Already resolved: no new transition, nothing to notify
    tracing::debug!(complaint_id = %complaint.id, "Complaint already resolved");
    if patch.is_empty() {
        let stored: Option<Complaint> = state.store.get(&complaint.id).await?;
        return stored
            .map(Json)
            .ok_or_else(|| AppError::not_found("Complaint not found"));
    }

    patch.remove(fields::STATUS);
    apply(state, &complaint.id, patch).await
}
