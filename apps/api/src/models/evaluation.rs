use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::candidate::{QuickScoreAnalysis, Recommendation, ScoringModel};
use crate::models::llm::LlmProvider;
use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStage {
    Quick,
    Stage1,
    Stage2,
}

impl EvaluationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStage::Quick => "quick",
            EvaluationStage::Stage1 => "stage1",
            EvaluationStage::Stage2 => "stage2",
        }
    }
}

impl FromStr for EvaluationStage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(EvaluationStage::Quick),
            "stage1" => Ok(EvaluationStage::Stage1),
            "stage2" => Ok(EvaluationStage::Stage2),
            other => Err(UnknownVariant::new("evaluation stage", other)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-component sub-analysis (JSONB columns)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccomplishmentsAnalysis {
    pub comparable_work: String,
    pub scale_match: String,
    pub impact_evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryAnalysis {
    pub growth_pattern: String,
    pub progression_velocity: String,
    pub intentionality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationsAnalysis {
    pub must_haves_met: Vec<String>,
    pub must_haves_not_met: Vec<String>,
    pub preferred_met: Vec<String>,
    pub preferred_not_met: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

/// Immutable evaluation record. A candidate accumulates many; rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub score: f64,
    pub scoring_model: String,
    pub a_score: Option<f64>,
    pub t_score: Option<f64>,
    pub q_score: Option<f64>,
    pub accomplishments_analysis: Option<Json<AccomplishmentsAnalysis>>,
    pub trajectory_analysis: Option<Json<TrajectoryAnalysis>>,
    pub qualifications_analysis: Option<Json<QualificationsAnalysis>>,
    pub recommendation: Option<String>,
    pub reasoning: Option<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub interview_questions: Vec<String>,
    pub observations: Vec<String>,
    pub provider: String,
    pub model_id: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub cost_usd: f64,
    pub version: i32,
    pub evaluation_stage: String,
    pub created_at: DateTime<Utc>,
}

/// A fully resolved evaluation ready to be written. Scores and cost are already
/// computed; see `evaluation::repository::record_evaluation`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvaluation {
    pub stage: EvaluationStage,
    pub scoring_model: ScoringModel,
    pub score: f64,
    pub a_score: Option<f64>,
    pub t_score: Option<f64>,
    pub q_score: Option<f64>,
    pub accomplishments: Option<AccomplishmentsAnalysis>,
    pub trajectory: Option<TrajectoryAnalysis>,
    pub qualifications: Option<QualificationsAnalysis>,
    pub recommendation: Option<Recommendation>,
    pub reasoning: Option<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub interview_questions: Vec<String>,
    pub observations: Vec<String>,
    pub provider: LlmProvider,
    pub model_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    /// Quick stage only: projected onto the candidate's `quick_score_analysis`.
    pub quick_analysis: Option<QuickScoreAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trip() {
        for stage in [
            EvaluationStage::Quick,
            EvaluationStage::Stage1,
            EvaluationStage::Stage2,
        ] {
            assert_eq!(stage.as_str().parse::<EvaluationStage>().unwrap(), stage);
        }
        assert!("stage3".parse::<EvaluationStage>().is_err());
    }

    #[test]
    fn test_qualifications_analysis_defaults_missing_lists() {
        let analysis: QualificationsAnalysis =
            serde_json::from_str(r#"{"must_haves_met": ["Rust", "Postgres"]}"#).unwrap();
        assert_eq!(analysis.must_haves_met, vec!["Rust", "Postgres"]);
        assert!(analysis.preferred_not_met.is_empty());
    }
}
