use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::repository::{get_candidate, get_candidates_in_order, list_candidates};
use crate::errors::AppError;
use crate::evaluation::batch::{pair_results, run_tracked_batch, PgScoreRecorder};
use crate::evaluation::quick::{record_quick_score, QuickScore};
use crate::evaluation::repository;
use crate::evaluation::EvaluationSubmission;
use crate::jobs::repository::get_job;
use crate::models::candidate::CandidateRow;
use crate::models::evaluation::EvaluationRow;
use crate::models::job::{JobRow, JobStatus};
use crate::models::llm::LocalModel;
use crate::progress::{BatchRun, BatchRunView, ProgressState};
use crate::scoring_client::{
    validate_batch, BatchOutcome, CandidatePayload, CompareOutcome, JobPayload,
    QuickScoreOutcome, StatusReport,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QuickScoreRequest {
    #[serde(default)]
    pub model: LocalModel,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub models: Vec<LocalModel>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchScoreRequest {
    #[serde(default)]
    pub model: LocalModel,
    /// Defaults to every candidate of the job that has résumé text.
    pub candidate_ids: Option<Vec<Uuid>>,
}

#[derive(Serialize)]
pub struct QuickScoreResponse {
    #[serde(flatten)]
    pub outcome: QuickScoreOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationRow>,
}

#[derive(Serialize)]
pub struct BatchScoreResponse {
    #[serde(flatten)]
    pub outcome: BatchOutcome,
    pub saved: usize,
}

/// GET /api/v1/candidates/:id/evaluations
pub async fn handle_list_evaluations(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<EvaluationRow>>, AppError> {
    get_candidate(&state.db, candidate_id).await?;
    Ok(Json(
        repository::list_evaluations(&state.db, candidate_id).await?,
    ))
}

/// POST /api/v1/candidates/:id/evaluations
pub async fn handle_create_evaluation(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(submission): Json<EvaluationSubmission>,
) -> Result<(StatusCode, Json<EvaluationRow>), AppError> {
    let evaluation = submission.resolve().map_err(AppError::Validation)?;
    let row = repository::record_evaluation(&state.db, candidate_id, &evaluation).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/scoring/status
pub async fn handle_scoring_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.scoring.check_status().await)
}

/// POST /api/v1/candidates/:id/quick-score
///
/// The outcome is returned with 200 even when scoring failed; only a successful
/// score is persisted.
pub async fn handle_quick_score(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<QuickScoreRequest>,
) -> Result<Json<QuickScoreResponse>, AppError> {
    let candidate = get_candidate(&state.db, candidate_id).await?;
    let job = open_job(&state, candidate.job_id).await?;

    let outcome = state
        .scoring
        .evaluate_single(
            &JobPayload::from(&job),
            &CandidatePayload::from(&candidate),
            Some(request.model.as_str()),
        )
        .await?;

    let evaluation = match QuickScore::from_outcome(&outcome) {
        Some(quick) => {
            Some(record_quick_score(&state.db, candidate_id, request.model, quick).await?)
        }
        None => None,
    };
    Ok(Json(QuickScoreResponse {
        outcome,
        evaluation,
    }))
}

/// POST /api/v1/candidates/:id/quick-score/compare
pub async fn handle_compare_models(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareOutcome>, AppError> {
    let candidate = get_candidate(&state.db, candidate_id).await?;
    let job = get_job(&state.db, candidate.job_id).await?;
    let models: Vec<String> = request
        .models
        .iter()
        .map(|m| m.as_str().to_string())
        .collect();

    Ok(Json(
        state
            .scoring
            .compare_models(
                &JobPayload::from(&job),
                &CandidatePayload::from(&candidate),
                &models,
            )
            .await?,
    ))
}

/// POST /api/v1/jobs/:id/quick-score/batch
///
/// One round trip to the scoring service. Results are matched to candidates by position.
pub async fn handle_batch_quick_score(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<BatchScoreRequest>,
) -> Result<Json<BatchScoreResponse>, AppError> {
    let job = open_job(&state, job_id).await?;
    let candidates = batch_candidates(&state, job_id, request.candidate_ids.as_deref()).await?;
    let payloads: Vec<CandidatePayload> = candidates.iter().map(CandidatePayload::from).collect();

    let mut log_progress = |p: &ProgressState| {
        info!(
            "Batch quick score for job {job_id}: {}/{} {}",
            p.current, p.total, p.current_candidate_name
        );
    };
    let outcome = state
        .scoring
        .evaluate_batch(
            &JobPayload::from(&job),
            &payloads,
            Some(request.model.as_str()),
            Some(&mut log_progress as &mut (dyn FnMut(&ProgressState) + Send)),
        )
        .await?;

    let mut saved = 0;
    if outcome.success {
        for (candidate, item) in pair_results(&payloads, &outcome.results) {
            let Some(quick) = QuickScore::from_item(item) else {
                continue;
            };
            match record_quick_score(&state.db, candidate.id, request.model, quick).await {
                Ok(_) => saved += 1,
                Err(e) => warn!("Could not save quick score for candidate {}: {e}", candidate.id),
            }
        }
    }
    Ok(Json(BatchScoreResponse { outcome, saved }))
}

/// POST /api/v1/jobs/:id/batch-runs
///
/// Starts a tracked run in the background and returns it immediately; poll
/// `GET /api/v1/batch-runs/:id` for progress.
pub async fn handle_start_batch_run(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<BatchScoreRequest>,
) -> Result<(StatusCode, Json<BatchRunView>), AppError> {
    let job = open_job(&state, job_id).await?;
    let candidates = batch_candidates(&state, job_id, request.candidate_ids.as_deref()).await?;
    let job = JobPayload::from(&job);
    let payloads: Vec<CandidatePayload> = candidates.iter().map(CandidatePayload::from).collect();
    validate_batch(&job, &payloads)?;

    let run = BatchRun::start(job_id, request.model.as_str(), payloads.len() as u32);
    state.progress.save(&run).await?;
    let view = BatchRunView::from(run.clone());

    let scoring = state.scoring.clone();
    let store = Arc::clone(&state.progress);
    let recorder = PgScoreRecorder(state.db.clone());
    tokio::spawn(async move {
        run_tracked_batch(
            &scoring,
            store.as_ref(),
            &recorder,
            run,
            &job,
            &payloads,
            request.model,
        )
        .await;
    });

    Ok((StatusCode::ACCEPTED, Json(view)))
}

/// GET /api/v1/batch-runs/:id
pub async fn handle_get_batch_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<BatchRunView>, AppError> {
    let run = state
        .progress
        .load(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Batch run {run_id} not found")))?;
    Ok(Json(BatchRunView::from(run)))
}

/// Loads a job that still accepts scoring. Closed jobs are read-only.
async fn open_job(state: &AppState, job_id: Uuid) -> Result<JobRow, AppError> {
    let job = get_job(&state.db, job_id).await?;
    let status = job.status().map_err(|e| AppError::Internal(e.into()))?;
    if status == JobStatus::Closed {
        return Err(AppError::Conflict(format!(
            "Job {job_id} is closed and cannot be scored"
        )));
    }
    Ok(job)
}

async fn batch_candidates(
    state: &AppState,
    job_id: Uuid,
    ids: Option<&[Uuid]>,
) -> Result<Vec<CandidateRow>, AppError> {
    match ids {
        Some(ids) => get_candidates_in_order(&state.db, job_id, ids).await,
        None => Ok(list_candidates(&state.db, job_id)
            .await?
            .into_iter()
            .filter(|c| {
                c.resume_text
                    .as_deref()
                    .is_some_and(|text| !text.trim().is_empty())
            })
            .collect()),
    }
}
