//! Business listings.
//!
//! Listings start `pending` unless an admin creates them. Only admins see
//! non-active listings or change a listing's status.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{fields, Business, BusinessStatus, Role, User};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::{patch_of, Filter};
use crate::ward::WardKey;

use super::details::{with_references, NameRef};
use super::extract::{non_empty, required, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub ward: Option<String>,
    pub status: Option<BusinessStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BusinessQuery {
    pub ward: Option<String>,
    pub status: Option<BusinessStatus>,
}

/// Business with its owner's name
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessListing {
    #[serde(flatten)]
    pub business: Business,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_details: Option<NameRef>,
}

/// POST /api/businesses
#[tracing::instrument(name = "businesses.create", skip_all, fields(user_id = %current.id()))]
pub async fn create_business(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<BusinessRequest>,
) -> Result<(StatusCode, Json<Business>)> {
    authorize(&current.actor(), Operation::RegisterBusiness).into_result()?;

    let name = required(req.name, "name")?;
    let ward = non_empty(req.ward).unwrap_or_else(|| current.0.ward.clone());
    if WardKey::new(&ward).is_empty() {
        return Err(AppError::validation("ward is required"));
    }

    let mut business = Business::new(
        current.id().to_string(),
        name,
        ward,
        current.role() == Role::Admin,
    );
    business.description = non_empty(req.description);
    business.category = non_empty(req.category);
    business.contact_number = non_empty(req.contact_number);
    business.address = non_empty(req.address);
    business.image_url = non_empty(req.image_url);

    state.store.create(&business).await?;
    tracing::info!(business_id = %business.id, status = ?business.status, "Business registered");

    Ok((StatusCode::CREATED, Json(business)))
}

/// GET /api/businesses?ward=&status=
pub async fn list_businesses(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BusinessQuery>,
) -> Result<Json<Vec<BusinessListing>>> {
    let status = match (current.role(), query.status) {
        (Role::Admin, Some(status)) => Some(status),
        (Role::Admin, None) => None,
        _ => Some(BusinessStatus::Active),
    };

    let mut filter = Filter::new();
    if let Some(status) = status {
        filter = filter.eq(fields::STATUS, status.as_str());
    }
    if let Some(ward) = non_empty(query.ward) {
        filter = filter.ward(fields::WARD, &WardKey::new(&ward));
    }

    let businesses: Vec<Business> = state.store.list_recent(&filter).await?;
    let listings = with_references(
        &state.store,
        businesses,
        |business| business.owner.clone(),
        |business, owner: Option<User>| BusinessListing {
            owner_details: owner.map(NameRef::from),
            business,
        },
    )
    .await?;
    Ok(Json(listings))
}

/// GET /api/businesses/my
pub async fn my_businesses(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Business>>> {
    let filter = Filter::new().eq(fields::OWNER, current.id());
    let businesses: Vec<Business> = state.store.list_recent(&filter).await?;
    Ok(Json(businesses))
}

/// PUT /api/businesses/{id}
#[tracing::instrument(name = "businesses.update", skip_all, fields(business_id = %id))]
pub async fn update_business(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<BusinessRequest>,
) -> Result<Json<Business>> {
    let business: Business = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Business not found"))?;

    let actor = current.actor();
    authorize(&actor, Operation::UpdateBusiness { owner: &business.owner }).into_result()?;

    // Only the supplied fields are written
    let mut changes = patch_of(
        [
            (fields::NAME, non_empty(req.name)),
            (fields::WARD, non_empty(req.ward)),
            (fields::DESCRIPTION, non_empty(req.description)),
            (fields::CATEGORY, non_empty(req.category)),
            (fields::CONTACT_NUMBER, non_empty(req.contact_number)),
            (fields::ADDRESS, non_empty(req.address)),
            (fields::IMAGE_URL, non_empty(req.image_url)),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, Value::String(v)))),
    );
    if let Some(status) = req.status {
        authorize(&actor, Operation::ModerateBusiness).into_result()?;
        changes.insert(
            fields::STATUS.to_string(),
            Value::String(status.as_str().to_string()),
        );
    }

    if changes.is_empty() {
        return Ok(Json(business));
    }

    let updated: Option<Business> = state.store.patch(&id, &Filter::new(), changes).await?;
    updated
        .map(Json)
        .ok_or_else(|| AppError::not_found("Business not found"))
}
