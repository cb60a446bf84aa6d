use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::{export_profile, profile_filename};
use crate::jobs::repository::get_job;
use crate::state::AppState;

/// GET /api/v1/jobs/:id/performance-profile/export
///
/// Markdown download. When archival is configured the document is also uploaded;
/// an upload failure does not fail the download.
pub async fn handle_export_profile(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = get_job(&state.db, job_id).await?;
    let profile = job
        .performance_profile
        .as_ref()
        .map(|p| &p.0)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!("Job {job_id} has no performance profile to export"))
        })?;

    let markdown = export_profile(profile, &job.title);
    let filename = profile_filename(&job.title);

    if let Some(archive) = &state.archive {
        if let Err(e) = archive.store(job_id, &filename, &markdown).await {
            warn!("Could not archive performance profile for job {job_id}: {e}");
        }
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        markdown,
    ))
}
