//! Ward announcements.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{fields, Announcement, Priority};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::Filter;
use crate::ward::WardKey;

use super::extract::{non_empty, required, ApiJson};

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub ward: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
pub struct WardQuery {
    pub ward: Option<String>,
}

/// POST /api/announcements
#[tracing::instrument(name = "announcements.create", skip_all, fields(user_id = %current.id()))]
pub async fn create_announcement(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>)> {
    authorize(&current.actor(), Operation::PostAnnouncement).into_result()?;

    let title = required(req.title, "title")?;
    let content = required(req.content, "content")?;
    let ward = non_empty(req.ward).unwrap_or_else(|| current.0.ward.clone());
    if WardKey::new(&ward).is_empty() {
        return Err(AppError::validation("ward is required"));
    }

    let announcement = Announcement::new(
        current.id().to_string(),
        title,
        content,
        &ward,
        req.priority.unwrap_or_default(),
    );
    state.store.create(&announcement).await?;

    tracing::info!(
        announcement_id = %announcement.id,
        ward = %announcement.ward,
        "Announcement posted"
    );
    state.triggers.announcement_posted(&announcement).await;

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// GET /api/announcements?ward=
pub async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<WardQuery>,
) -> Result<Json<Vec<Announcement>>> {
    let mut filter = Filter::new();
    if let Some(ward) = non_empty(query.ward) {
        filter = filter.ward(fields::WARD, &WardKey::new(&ward));
    }

    let announcements: Vec<Announcement> = state.store.list_recent(&filter).await?;
    Ok(Json(announcements))
}
