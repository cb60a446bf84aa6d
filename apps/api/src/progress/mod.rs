//! Batch progress: the state a batch run reports and the display values derived from it.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring_client::BatchItemResult;

/// Fixed per-candidate time estimate used for the remaining-time hint. Not measured.
pub const SECONDS_PER_CANDIDATE: f64 = 15.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressState {
    pub current: u32,
    pub total: u32,
    pub current_candidate_name: String,
}

impl ProgressState {
    pub fn new(current: u32, total: u32, current_candidate_name: impl Into<String>) -> Self {
        Self {
            current,
            total,
            current_candidate_name: current_candidate_name.into(),
        }
    }
}

/// What a progress display shows for a given state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub current: u32,
    pub total: u32,
    pub current_candidate_name: String,
    pub percentage: u8,
    /// Present only while the run is past its first candidate and not yet done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_seconds_remaining: Option<u64>,
}

/// Pure projection from progress state to display state.
pub fn project(state: &ProgressState) -> ProgressView {
    ProgressView {
        current: state.current,
        total: state.total,
        current_candidate_name: state.current_candidate_name.clone(),
        percentage: percentage(state.current, state.total),
        estimated_seconds_remaining: estimated_seconds_remaining(state.current, state.total),
    }
}

/// round(current / total * 100), 0 when total is 0. Never above 100.
pub fn percentage(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (current as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// ceil((total - current) * 15), only while 0 < current < total.
pub fn estimated_seconds_remaining(current: u32, total: u32) -> Option<u64> {
    if current == 0 || current >= total {
        return None;
    }
    Some(((total - current) as f64 * SECONDS_PER_CANDIDATE).ceil() as u64)
}

// ────────────────────────────────────────────────────────────────────────────
// Batch runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchRunStatus {
    Running,
    Completed,
    Failed,
}

/// A tracked batch evaluation. Results are kept in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    pub id: Uuid,
    pub job_id: Uuid,
    pub model: String,
    pub status: BatchRunStatus,
    pub progress: ProgressState,
    pub results: Vec<BatchItemResult>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchRun {
    pub fn start(job_id: Uuid, model: &str, total: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            model: model.to_string(),
            status: BatchRunStatus::Running,
            progress: ProgressState::new(0, total, ""),
            results: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self, error: Option<String>) {
        self.status = if error.is_some() {
            BatchRunStatus::Failed
        } else {
            BatchRunStatus::Completed
        };
        self.error = error;
        self.progress.current_candidate_name.clear();
        self.finished_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRunView {
    #[serde(flatten)]
    pub run: BatchRun,
    pub display: ProgressView,
}

impl From<BatchRun> for BatchRunView {
    fn from(run: BatchRun) -> Self {
        let display = project(&run.progress);
        Self { run, display }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds away from zero
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn test_percentage_always_in_range() {
        for total in 0..=40u32 {
            for current in 0..=total {
                assert!(percentage(current, total) <= 100);
            }
        }
    }

    #[test]
    fn test_eta_only_while_in_flight() {
        assert_eq!(estimated_seconds_remaining(0, 10), None);
        assert_eq!(estimated_seconds_remaining(10, 10), None);
        assert_eq!(estimated_seconds_remaining(0, 0), None);
        assert_eq!(estimated_seconds_remaining(3, 10), Some(105));
        assert_eq!(estimated_seconds_remaining(9, 10), Some(15));
    }

    #[test]
    fn test_project_defaults() {
        let state: ProgressState = serde_json::from_str("{}").unwrap();
        let view = project(&state);
        assert_eq!(view.percentage, 0);
        assert_eq!(view.estimated_seconds_remaining, None);
        assert_eq!(view.current_candidate_name, "");
    }

    #[test]
    fn test_project_mid_run() {
        let view = project(&ProgressState::new(2, 8, "Ada Lovelace"));
        assert_eq!(view.percentage, 25);
        assert_eq!(view.estimated_seconds_remaining, Some(90));
        assert_eq!(view.current_candidate_name, "Ada Lovelace");
    }

    #[test]
    fn test_view_omits_eta_when_absent() {
        let json = serde_json::to_value(project(&ProgressState::new(4, 4, ""))).unwrap();
        assert!(json.get("estimated_seconds_remaining").is_none());
        assert_eq!(json["percentage"], 100);
    }

    #[test]
    fn test_finish_marks_status() {
        let mut run = BatchRun::start(Uuid::new_v4(), "qwen2.5:7b", 2);
        run.progress = ProgressState::new(1, 2, "Grace Hopper");
        run.finish(Some("scoring service unreachable".to_string()));
        assert_eq!(run.status, BatchRunStatus::Failed);
        assert!(run.finished_at.is_some());
        assert!(run.progress.current_candidate_name.is_empty());
    }
}
