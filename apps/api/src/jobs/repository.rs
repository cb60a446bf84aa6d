use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobRow, JobStatus, JobUpdate, NewJob};
use crate::models::profile::PerformanceProfile;

pub async fn create_job(pool: &PgPool, job: &NewJob) -> Result<JobRow, AppError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, title, department, location, summary,
             must_have_requirements, preferred_requirements, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.title.trim())
    .bind(&job.department)
    .bind(&job.location)
    .bind(&job.summary)
    .bind(&job.must_have_requirements)
    .bind(&job.preferred_requirements)
    .bind(job.status.as_str())
    .fetch_one(pool)
    .await?;

    info!("Created job {} ({})", row.id, row.title);
    Ok(row)
}

pub async fn list_jobs(pool: &PgPool, status: Option<JobStatus>) -> Result<Vec<JobRow>, AppError> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?)
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

pub async fn update_job(pool: &PgPool, job_id: Uuid, update: &JobUpdate) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            title = COALESCE($2, title),
            department = COALESCE($3, department),
            location = COALESCE($4, location),
            summary = COALESCE($5, summary),
            must_have_requirements = COALESCE($6, must_have_requirements),
            preferred_requirements = COALESCE($7, preferred_requirements),
            status = COALESCE($8, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(update.title.as_deref().map(str::trim))
    .bind(&update.department)
    .bind(&update.location)
    .bind(&update.summary)
    .bind(&update.must_have_requirements)
    .bind(&update.preferred_requirements)
    .bind(update.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// Deletes the job; candidates and their evaluations go with it (ON DELETE CASCADE).
pub async fn delete_job(pool: &PgPool, job_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    info!("Deleted job {job_id} and its candidates");
    Ok(())
}

pub async fn set_performance_profile(
    pool: &PgPool,
    job_id: Uuid,
    profile: &PerformanceProfile,
) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET performance_profile = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(Json(profile))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}
