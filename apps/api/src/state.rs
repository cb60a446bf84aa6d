use std::sync::Arc;

use sqlx::PgPool;

use crate::export::archive::ProfileArchive;
use crate::progress::store::ProgressStore;
use crate::scoring_client::ScoringClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub scoring: ScoringClient,
    /// Batch-run progress. Redis when `REDIS_URL` is set, process memory otherwise.
    pub progress: Arc<dyn ProgressStore>,
    /// Present only when S3 is fully configured.
    pub archive: Option<ProfileArchive>,
}
