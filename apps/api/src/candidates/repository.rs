use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, CandidateStatus, NewCandidate};

pub async fn create_candidate(
    pool: &PgPool,
    job_id: Uuid,
    candidate: &NewCandidate,
) -> Result<CandidateRow, AppError> {
    let row = sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates
            (id, job_id, name, email, phone, resume_text, resume_file_path, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(candidate.name.trim())
    .bind(&candidate.email)
    .bind(&candidate.phone)
    .bind(&candidate.resume_text)
    .bind(&candidate.resume_file_path)
    .bind(CandidateStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    info!("Created candidate {} for job {job_id}", row.id);
    Ok(row)
}

/// Candidates for a job, in intake order.
pub async fn list_candidates(pool: &PgPool, job_id: Uuid) -> Result<Vec<CandidateRow>, AppError> {
    Ok(sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE job_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?)
}

/// Fetches the requested candidates of a job, keeping the order of `ids`.
/// Fails if any id does not belong to the job.
pub async fn get_candidates_in_order(
    pool: &PgPool,
    job_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<CandidateRow>, AppError> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE job_id = $1 AND id = ANY($2)",
    )
    .bind(job_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    ids.iter()
        .map(|id| {
            rows.iter()
                .find(|r| r.id == *id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found in job {job_id}")))
        })
        .collect()
}

pub async fn get_candidate(pool: &PgPool, candidate_id: Uuid) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

pub async fn update_status(
    pool: &PgPool,
    candidate_id: Uuid,
    status: CandidateStatus,
) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>(
        "UPDATE candidates SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(candidate_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// Deletes the candidate and, by cascade, its evaluations.
pub async fn delete_candidate(pool: &PgPool, candidate_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Candidate {candidate_id} not found")));
    }
    Ok(())
}
