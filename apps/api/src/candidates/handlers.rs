use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::candidates::repository;
use crate::errors::AppError;
use crate::jobs::repository::get_job;
use crate::models::candidate::{CandidateRow, CandidateStatusUpdate, NewCandidate};
use crate::state::AppState;

/// POST /api/v1/jobs/:id/candidates
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<NewCandidate>,
) -> Result<(StatusCode, Json<CandidateRow>), AppError> {
    request.validate().map_err(AppError::Validation)?;
    // 404 for an unknown job instead of a foreign-key violation.
    get_job(&state.db, job_id).await?;
    let candidate = repository::create_candidate(&state.db, job_id, &request).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// GET /api/v1/jobs/:id/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    get_job(&state.db, job_id).await?;
    Ok(Json(repository::list_candidates(&state.db, job_id).await?))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(repository::get_candidate(&state.db, candidate_id).await?))
}

/// PATCH /api/v1/candidates/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<CandidateStatusUpdate>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(
        repository::update_status(&state.db, candidate_id, request.status).await?,
    ))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete_candidate(&state.db, candidate_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
