//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::repository;
use crate::models::job::{JobRow, JobStatus, JobUpdate, NewJob};
use crate::models::profile::PerformanceProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<NewJob>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    request.validate().map_err(AppError::Validation)?;
    let job = repository::create_job(&state.db, &request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(repository::list_jobs(&state.db, params.status).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(repository::get_job(&state.db, job_id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<JobUpdate>,
) -> Result<Json<JobRow>, AppError> {
    request.validate().map_err(AppError::Validation)?;
    Ok(Json(repository::update_job(&state.db, job_id, &request).await?))
}

/// DELETE /api/v1/jobs/:id
///
/// Cascades to candidates and evaluations.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete_job(&state.db, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/jobs/:id/performance-profile
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(profile): Json<PerformanceProfile>,
) -> Result<Json<JobRow>, AppError> {
    let profile = profile.normalized();
    Ok(Json(
        repository::set_performance_profile(&state.db, job_id, &profile).await?,
    ))
}
