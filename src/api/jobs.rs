//! Job vacancies posted for businesses.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{fields, Business, Job, JobType};
use crate::policy::{authorize, Operation};
use crate::server::{AppState, CurrentUser};
use crate::store::Filter;
use crate::ward::WardKey;

use super::details::{with_references, NameRef};
use super::extract::{non_empty, required, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub business_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub salary_range: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<JobType>,
    /// Defaults to the business's ward
    pub ward: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub ward: Option<String>,
}

/// Job with the name of the business offering it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_details: Option<NameRef>,
}

/// POST /api/jobs
#[tracing::instrument(name = "jobs.create", skip_all, fields(user_id = %current.id()))]
pub async fn create_job(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>)> {
    let actor = current.actor();
    authorize(&actor, Operation::PostJob).into_result()?;

    let business_id = required(req.business_id, "businessId")?;
    let title = required(req.title, "title")?;

    let business: Business = state
        .store
        .get(&business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business not found"))?;
    authorize(&actor, Operation::UpdateBusiness { owner: &business.owner }).into_result()?;

    let ward = non_empty(req.ward).unwrap_or_else(|| business.ward.clone());
    let mut job = Job::new(business.id, title, ward);
    job.description = non_empty(req.description);
    job.skills_required = req
        .skills_required
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    job.salary_range = non_empty(req.salary_range);
    job.kind = req.kind.unwrap_or_default();

    state.store.create(&job).await?;
    tracing::info!(job_id = %job.id, business_id = %job.business, "Job posted");

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs?ward=
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<JobListing>>> {
    let mut filter = Filter::new().eq(fields::IS_ACTIVE, true);
    if let Some(ward) = non_empty(query.ward) {
        filter = filter.ward(fields::WARD, &WardKey::new(&ward));
    }

    let jobs: Vec<Job> = state.store.list_recent(&filter).await?;
    let listings = with_references(
        &state.store,
        jobs,
        |job| job.business.clone(),
        |job, business: Option<Business>| JobListing {
            business_details: business.map(NameRef::from),
            job,
        },
    )
    .await?;
    Ok(Json(listings))
}
