//! Tracked batch runs: candidates are scored one at a time so that progress can be
//! published after each one and polled through `GET /api/v1/batch-runs/:id`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::quick::{record_quick_score, QuickScore};
use crate::models::llm::LocalModel;
use crate::progress::store::ProgressStore;
use crate::progress::{BatchRun, ProgressState};
use crate::scoring_client::{BatchItemResult, CandidatePayload, JobPayload, ScoringClient};

/// Where successful quick scores are persisted.
#[async_trait]
pub trait ScoreRecorder: Send + Sync {
    async fn record(
        &self,
        candidate_id: Uuid,
        model: LocalModel,
        quick: QuickScore,
    ) -> Result<(), AppError>;
}

pub struct PgScoreRecorder(pub PgPool);

#[async_trait]
impl ScoreRecorder for PgScoreRecorder {
    async fn record(
        &self,
        candidate_id: Uuid,
        model: LocalModel,
        quick: QuickScore,
    ) -> Result<(), AppError> {
        record_quick_score(&self.0, candidate_id, model, quick).await?;
        Ok(())
    }
}

/// Pairs batch results with the candidates they were requested for, by position.
/// Extra results or candidates are dropped.
pub fn pair_results<'a>(
    candidates: &'a [CandidatePayload],
    results: &'a [BatchItemResult],
) -> Vec<(&'a CandidatePayload, &'a BatchItemResult)> {
    if candidates.len() != results.len() {
        warn!(
            "Pairing {} batch results with {} candidates",
            results.len(),
            candidates.len()
        );
    }
    candidates
        .iter()
        .zip(results)
        .inspect(|(candidate, result)| {
            if let Some(id) = result.candidate_id.as_deref() {
                if id != candidate.id.to_string() {
                    warn!(
                        "Batch result for {id} arrived in the slot of candidate {}",
                        candidate.id
                    );
                }
            }
        })
        .collect()
}

/// Scores every candidate in order, saving `run` to `store` before each candidate and
/// once more when finished. Individual failures are recorded in `run.results`; the run
/// only fails when no candidate could be scored.
pub async fn run_tracked_batch(
    client: &ScoringClient,
    store: &dyn ProgressStore,
    recorder: &dyn ScoreRecorder,
    mut run: BatchRun,
    job: &JobPayload,
    candidates: &[CandidatePayload],
    model: LocalModel,
) -> BatchRun {
    let total = candidates.len() as u32;
    info!(
        "Batch run {} started: {total} candidates for job {} with {}",
        run.id,
        job.id,
        model.as_str()
    );

    for (index, candidate) in candidates.iter().enumerate() {
        run.progress = ProgressState::new(index as u32, total, candidate.name.as_str());
        publish(store, &run).await;

        let mut item = match client
            .evaluate_single(job, candidate, Some(model.as_str()))
            .await
        {
            Ok(outcome) => BatchItemResult::from_outcome(candidate, outcome),
            Err(e) => BatchItemResult::failed(candidate, e.to_string()),
        };

        if let Some(quick) = QuickScore::from_item(&item) {
            if let Err(e) = recorder.record(candidate.id, model, quick).await {
                warn!("Could not save quick score for candidate {}: {e}", candidate.id);
                item.success = false;
                item.error = Some(format!("score could not be saved: {e}"));
            }
        }
        run.results.push(item);
    }

    let failures = run.results.iter().filter(|r| r.scored().is_none()).count();
    run.progress = ProgressState::new(total, total, "");
    let error = if total > 0 && failures == total as usize {
        Some(format!("all {total} candidates failed to score"))
    } else {
        None
    };
    run.finish(error);
    publish(store, &run).await;

    info!(
        "Batch run {} finished: {} scored, {failures} failed",
        run.id,
        total as usize - failures
    );
    run
}

async fn publish(store: &dyn ProgressStore, run: &BatchRun) {
    if let Err(e) = store.save(run).await {
        warn!("Could not publish progress for batch run {}: {e}", run.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::progress::store::{InMemoryProgressStore, ProgressStoreError};
    use crate::progress::BatchRunStatus;

    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryProgressStore,
        snapshots: Mutex<Vec<ProgressState>>,
    }

    #[async_trait]
    impl ProgressStore for RecordingStore {
        async fn save(&self, run: &BatchRun) -> Result<(), ProgressStoreError> {
            self.snapshots.lock().unwrap().push(run.progress.clone());
            self.inner.save(run).await
        }

        async fn load(&self, id: Uuid) -> Result<Option<BatchRun>, ProgressStoreError> {
            self.inner.load(id).await
        }
    }

    #[derive(Default)]
    struct MemoryRecorder {
        saved: Mutex<Vec<(Uuid, f64)>>,
    }

    #[async_trait]
    impl ScoreRecorder for MemoryRecorder {
        async fn record(
            &self,
            candidate_id: Uuid,
            _model: LocalModel,
            quick: QuickScore,
        ) -> Result<(), AppError> {
            self.saved.lock().unwrap().push((candidate_id, quick.score));
            Ok(())
        }
    }

    /// Scores every candidate 70 except those whose name contains "Broken".
    async fn spawn_scorer() -> String {
        let router = Router::new().route(
            "/api/evaluate_quick",
            post(|Json(body): Json<Value>| async move {
                let name = body["candidate"]["name"].as_str().unwrap_or_default();
                if name.contains("Broken") {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "model crashed"})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({"success": true, "score": 70, "model": body["model"]})),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn job() -> JobPayload {
        JobPayload {
            id: Uuid::new_v4(),
            title: "Data Engineer".to_string(),
            department: None,
            location: None,
            summary: None,
            must_have_requirements: vec!["SQL".to_string()],
            preferred_requirements: vec![],
        }
    }

    fn candidate(name: &str) -> CandidatePayload {
        CandidatePayload {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            resume_text: "Built pipelines in Spark and dbt.".to_string(),
        }
    }

    fn client(base_url: &str) -> ScoringClient {
        ScoringClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_pair_results_is_positional() {
        let candidates = vec![candidate("Ann"), candidate("Ben")];
        let results = vec![
            BatchItemResult {
                candidate_id: Some(candidates[0].id.to_string()),
                success: true,
                score: Some(60.0),
                ..Default::default()
            },
            BatchItemResult {
                success: true,
                score: Some(40.0),
                ..Default::default()
            },
            BatchItemResult::default(),
        ];
        let pairs = pair_results(&candidates, &results);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0.name, "Ben");
        assert_eq!(pairs[1].1.score, Some(40.0));
    }

    #[tokio::test]
    async fn test_tracked_batch_reports_progress_and_records_scores() {
        let base_url = spawn_scorer().await;
        let store = RecordingStore::default();
        let recorder = MemoryRecorder::default();
        let job = job();
        let candidates = vec![candidate("Ann"), candidate("Broken Bob"), candidate("Cy")];
        let run = BatchRun::start(job.id, LocalModel::default().as_str(), 3);
        let run_id = run.id;

        let run = run_tracked_batch(
            &client(&base_url),
            &store,
            &recorder,
            run,
            &job,
            &candidates,
            LocalModel::default(),
        )
        .await;

        assert_eq!(run.status, BatchRunStatus::Completed);
        assert_eq!(run.results.len(), 3);
        assert!(run.results[0].success);
        assert!(!run.results[1].success);
        assert_eq!(run.results[1].error.as_deref(), Some("model crashed"));
        assert_eq!(run.results[2].candidate_name.as_deref(), Some("Cy"));

        let saved = recorder.saved.lock().unwrap().clone();
        assert_eq!(saved, vec![(candidates[0].id, 70.0), (candidates[2].id, 70.0)]);

        let snapshots = store.snapshots.lock().unwrap().clone();
        assert_eq!(
            snapshots,
            vec![
                ProgressState::new(0, 3, "Ann"),
                ProgressState::new(1, 3, "Broken Bob"),
                ProgressState::new(2, 3, "Cy"),
                ProgressState::new(3, 3, ""),
            ]
        );

        let stored = store.load(run_id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatchRunStatus::Completed);
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_tracked_batch_fails_when_nothing_scores() {
        let base_url = spawn_scorer().await;
        let store = InMemoryProgressStore::default();
        let recorder = MemoryRecorder::default();
        let job = job();
        let candidates = vec![candidate("Broken One"), candidate("Broken Two")];

        let run = run_tracked_batch(
            &client(&base_url),
            &store,
            &recorder,
            BatchRun::start(job.id, "mistral:7b", 2),
            &job,
            &candidates,
            LocalModel::Mistral7b,
        )
        .await;

        assert_eq!(run.status, BatchRunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("all 2 candidates failed to score"));
        assert_eq!(run.progress, ProgressState::new(2, 2, ""));
        assert!(recorder.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracked_batch_records_validation_failures_per_candidate() {
        let base_url = spawn_scorer().await;
        let store = InMemoryProgressStore::default();
        let recorder = MemoryRecorder::default();
        let job = job();
        let mut no_resume = candidate("Dee");
        no_resume.resume_text.clear();
        let candidates = vec![no_resume, candidate("Eve")];

        let run = run_tracked_batch(
            &client(&base_url),
            &store,
            &recorder,
            BatchRun::start(job.id, "qwen2.5:7b", 2),
            &job,
            &candidates,
            LocalModel::default(),
        )
        .await;

        assert_eq!(run.status, BatchRunStatus::Completed);
        assert!(run.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("no resume text"));
        assert_eq!(run.results[1].scored(), Some(70.0));
    }
}
