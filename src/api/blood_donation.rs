//! Blood donor registry and blood requests.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{
    fields, timestamp, BloodDonor, BloodGroup, Emergency, EmergencyType, User,
};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::{patch_of, Filter};
use crate::ward::WardKey;

use super::details::{with_references, UserContact};
use super::extract::{non_empty, required, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDonorRequest {
    pub blood_group: Option<String>,
    /// Defaults to the user's phone
    pub contact_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorQuery {
    pub ward: Option<String>,
    pub blood_group: Option<String>,
    /// Recipient group; only donors it can receive from are listed
    pub compatible_with: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequest {
    pub blood_group: Option<String>,
    pub details: Option<String>,
    pub location: Option<String>,
    pub urgency: Option<String>,
    pub contact_number: Option<String>,
}

/// Donor record with the registering user's contact details
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorListing {
    #[serde(flatten)]
    pub donor: BloodDonor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_details: Option<UserContact>,
}

fn parse_blood_group(raw: Option<String>, field: &str) -> Result<BloodGroup> {
    let raw = required(raw, field)?;
    raw.parse::<BloodGroup>()
        .map_err(|e| AppError::validation(e.to_string()))
}

fn not_registered() -> AppError {
    AppError::not_found("You are not registered as a donor")
}

/// POST /api/blood-donation/register
///
/// Registers the caller as a donor, or refreshes the existing registration.
#[tracing::instrument(name = "blood.register", skip_all, fields(user_id = %current.id()))]
pub async fn register_donor(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<RegisterDonorRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let blood_group = parse_blood_group(req.blood_group, "bloodGroup")?;
    let user = &current.0;
    let contact_number = non_empty(req.contact_number).unwrap_or_else(|| user.phone.clone());

    let donor = BloodDonor::new(user, blood_group, contact_number.clone());
    let refresh = patch_of([
        (fields::BLOOD_GROUP, Value::String(blood_group.as_str().to_string())),
        (fields::CONTACT_NUMBER, Value::String(contact_number)),
        (fields::WARD, Value::String(user.ward.clone())),
        (fields::DISTRICT, Value::String(user.district.clone())),
        (fields::STATE, Value::String(user.state.clone())),
        (fields::UPDATED_AT, timestamp(Utc::now())),
    ]);

    let upserted = state.store.upsert(&donor, refresh).await?;
    let (status, message) = if upserted.created {
        tracing::info!(blood_group = %blood_group, "Donor registered");
        (StatusCode::CREATED, "Successfully registered as blood donor")
    } else {
        (StatusCode::OK, "Donor registration updated")
    };

    Ok((
        status,
        Json(json!({ "message": message, "donor": upserted.document })),
    ))
}

/// PUT /api/blood-donation/availability
pub async fn update_availability(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> Result<Json<Value>> {
    let is_available = req
        .is_available
        .ok_or_else(|| AppError::validation("isAvailable is required"))?;

    let donor: BloodDonor = state
        .store
        .patch(
            current.id(),
            &Filter::new(),
            patch_of([
                (fields::IS_AVAILABLE, Value::Bool(is_available)),
                (fields::UPDATED_AT, timestamp(Utc::now())),
            ]),
        )
        .await?
        .ok_or_else(not_registered)?;

    Ok(Json(json!({
        "message": if is_available { "You are now available" } else { "You are now unavailable" },
        "donor": donor,
    })))
}

/// GET /api/blood-donation/my-status
pub async fn my_status(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>> {
    let donor: Option<BloodDonor> = state.store.get(current.id()).await?;
    if let Some(donor) = &donor {
        authorize(&current.actor(), Operation::ViewOwn { owner: &donor.user }).into_result()?;
    }

    Ok(Json(json!({
        "isRegistered": donor.is_some(),
        "donor": donor,
    })))
}

/// GET /api/blood-donation/donors?ward=&bloodGroup=&compatibleWith=
pub async fn list_donors(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<DonorQuery>,
) -> Result<Json<Vec<DonorListing>>> {
    let mut filter = Filter::new().eq(fields::IS_AVAILABLE, true);
    if let Some(ward) = non_empty(query.ward) {
        filter = filter.ward(fields::WARD, &WardKey::new(&ward));
    }
    if query.blood_group.is_some() {
        let group = parse_blood_group(query.blood_group, "bloodGroup")?;
        filter = filter.eq(fields::BLOOD_GROUP, group.as_str());
    }
    let recipient = match query.compatible_with {
        Some(raw) => Some(parse_blood_group(Some(raw), "compatibleWith")?),
        None => None,
    };

    let donors: Vec<BloodDonor> = state
        .store
        .list_recent::<BloodDonor>(&filter)
        .await?
        .into_iter()
        .filter(|d| recipient.map_or(true, |r| r.can_receive_from(d.blood_group)))
        .collect();

    let listings = with_references(
        &state.store,
        donors,
        |donor| donor.user.clone(),
        |donor, user: Option<User>| DonorListing {
            user_details: user.map(UserContact::from),
            donor,
        },
    )
    .await?;

    Ok(Json(listings))
}

/// POST /api/blood-donation/request
///
/// Raises a blood emergency in the requester's ward and alerts every other
/// member of that ward.
#[tracing::instrument(name = "blood.request", skip_all, fields(user_id = %current.id()))]
pub async fn request_blood(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<BloodRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let blood_group = parse_blood_group(req.blood_group, "bloodGroup")?;
    let user = &current.0;

    let details = format!(
        "Blood Group: {}. {} Urgency: {}",
        blood_group,
        non_empty(req.details).unwrap_or_default(),
        non_empty(req.urgency).unwrap_or_else(|| "normal".to_string()),
    );
    let contact_number = non_empty(req.contact_number).unwrap_or_else(|| user.phone.clone());

    let emergency = Emergency::new(
        user.id.clone(),
        EmergencyType::Blood,
        Some(details),
        user.ward.clone(),
        non_empty(req.location),
        contact_number,
    );
    state.store.create(&emergency).await?;

    let notified = state
        .triggers
        .blood_requested(user, &emergency, blood_group)
        .await;
    tracing::info!(
        emergency_id = %emergency.id,
        blood_group = %blood_group,
        notified,
        "Blood request submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Blood request submitted",
            "emergency": emergency,
            "notifiedUsers": notified,
        })),
    ))
}

/// PUT /api/blood-donation/complete
///
/// Records a donation made now and marks the donor unavailable.
pub async fn complete_donation(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>> {
    let now = timestamp(Utc::now());
    let donor: BloodDonor = state
        .store
        .patch(
            current.id(),
            &Filter::new(),
            patch_of([
                (fields::LAST_DONATION_DATE, now.clone()),
                (fields::IS_AVAILABLE, Value::Bool(false)),
                (fields::UPDATED_AT, now),
            ]),
        )
        .await?
        .ok_or_else(not_registered)?;

    tracing::info!(user_id = %current.id(), "Donation recorded");
    Ok(Json(json!({
        "message": "Donation recorded. Thank you!",
        "donor": donor,
    })))
}
