//! Candidate evaluation: turns scoring results into append-only evaluation records.
//!
//! Two producers:
//! - quick scores from the local-model tier (`quick`, `batch`), and
//! - stage1/stage2 evaluations submitted by the hosted-model pipeline (`EvaluationSubmission`).
//!
//! Both go through `repository::record_evaluation`, which keeps the candidate's stage
//! columns in step with the newest evaluation.

pub mod batch;
pub mod handlers;
pub mod quick;
pub mod repository;

use serde::Deserialize;
use tracing::warn;

use crate::models::candidate::{Recommendation, ScoringModel};
use crate::models::evaluation::{
    AccomplishmentsAnalysis, EvaluationStage, NewEvaluation, QualificationsAnalysis,
    TrajectoryAnalysis,
};
use crate::models::llm::LlmProvider;
use crate::scoring::pricing::compute_cost_usd;
use crate::scoring::{check_overall_score, AtqComponents};

/// Request body for recording a hosted-tier evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSubmission {
    pub evaluation_stage: EvaluationStage,
    #[serde(default)]
    pub scoring_model: ScoringModel,
    /// Ignored for ATQ, where the score is computed from the components.
    pub score: Option<f64>,
    pub a_score: Option<f64>,
    pub t_score: Option<f64>,
    pub q_score: Option<f64>,
    pub accomplishments: Option<AccomplishmentsAnalysis>,
    pub trajectory: Option<TrajectoryAnalysis>,
    pub qualifications: Option<QualificationsAnalysis>,
    pub recommendation: Option<Recommendation>,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub interview_questions: Vec<String>,
    #[serde(default)]
    pub observations: Vec<String>,
    pub provider: LlmProvider,
    pub model_id: String,
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl EvaluationSubmission {
    /// Validates the submission and computes its overall score and cost.
    pub fn resolve(self) -> Result<NewEvaluation, String> {
        if self.evaluation_stage == EvaluationStage::Quick {
            return Err(
                "quick evaluations are recorded through the quick-score endpoints".to_string(),
            );
        }
        if self.model_id.trim().is_empty() {
            return Err("model_id cannot be empty".to_string());
        }

        let components = match (self.a_score, self.t_score, self.q_score) {
            (Some(a), Some(t), Some(q)) => Some(AtqComponents::new(a, t, q)?),
            (None, None, None) => None,
            _ => return Err("a_score, t_score and q_score must be provided together".to_string()),
        };

        let score = match self.scoring_model {
            ScoringModel::Atq => {
                let components = components
                    .ok_or_else(|| "ATQ evaluations require a_score, t_score and q_score".to_string())?;
                let computed = components.composite();
                if let Some(claimed) = self.score {
                    if (claimed - computed).abs() > 0.5 {
                        warn!(
                            "Submitted score {claimed} disagrees with ATQ composite {computed:.2}; storing composite"
                        );
                    }
                }
                computed
            }
            ScoringModel::Qer => check_overall_score(
                self.score
                    .ok_or_else(|| "QER evaluations require an overall score".to_string())?,
            )?,
        };

        let cost_usd = compute_cost_usd(
            self.provider,
            &self.model_id,
            self.input_tokens,
            self.output_tokens,
        );

        Ok(NewEvaluation {
            stage: self.evaluation_stage,
            scoring_model: self.scoring_model,
            score,
            a_score: components.map(|c| c.a),
            t_score: components.map(|c| c.t),
            q_score: components.map(|c| c.q),
            accomplishments: self.accomplishments,
            trajectory: self.trajectory,
            qualifications: self.qualifications,
            recommendation: self.recommendation,
            reasoning: self.reasoning,
            strengths: self.strengths,
            concerns: self.concerns,
            interview_questions: self.interview_questions,
            observations: self.observations,
            provider: self.provider,
            model_id: self.model_id.trim().to_string(),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cost_usd,
            quick_analysis: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(body: serde_json::Value) -> EvaluationSubmission {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_atq_score_computed_from_components() {
        let evaluation = submission(json!({
            "evaluation_stage": "stage1",
            "scoring_model": "ATQ",
            "score": 12,
            "a_score": 80, "t_score": 60, "q_score": 100,
            "recommendation": "INTERVIEW",
            "provider": "anthropic",
            "model_id": "claude-sonnet-4-5",
            "input_tokens": 10000,
            "output_tokens": 2000
        }))
        .resolve()
        .unwrap();

        assert!((evaluation.score - 78.0).abs() < 1e-9);
        assert_eq!(evaluation.a_score, Some(80.0));
        assert_eq!(evaluation.recommendation, Some(Recommendation::Interview));
        assert!((evaluation.cost_usd - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_model_defaults_to_atq() {
        let err = submission(json!({
            "evaluation_stage": "stage2",
            "score": 70,
            "provider": "anthropic",
            "model_id": "claude-sonnet-4-5"
        }))
        .resolve()
        .unwrap_err();
        assert!(err.contains("ATQ evaluations require"));
    }

    #[test]
    fn test_qer_uses_overall_score() {
        let evaluation = submission(json!({
            "evaluation_stage": "stage2",
            "scoring_model": "QER",
            "score": 66.5,
            "provider": "openai",
            "model_id": "gpt-4o"
        }))
        .resolve()
        .unwrap();
        assert_eq!(evaluation.score, 66.5);
        assert_eq!(evaluation.a_score, None);
        assert_eq!(evaluation.scoring_model, ScoringModel::Qer);
    }

    #[test]
    fn test_partial_components_rejected() {
        let err = submission(json!({
            "evaluation_stage": "stage1",
            "a_score": 80, "t_score": 60,
            "provider": "anthropic",
            "model_id": "claude-sonnet-4-5"
        }))
        .resolve()
        .unwrap_err();
        assert!(err.contains("together"));
    }

    #[test]
    fn test_quick_stage_rejected() {
        let err = submission(json!({
            "evaluation_stage": "quick",
            "a_score": 80, "t_score": 60, "q_score": 50,
            "provider": "ollama",
            "model_id": "qwen2.5:7b"
        }))
        .resolve()
        .unwrap_err();
        assert!(err.contains("quick-score"));
    }

    #[test]
    fn test_out_of_range_component_rejected() {
        let err = submission(json!({
            "evaluation_stage": "stage1",
            "a_score": 120, "t_score": 60, "q_score": 50,
            "provider": "anthropic",
            "model_id": "claude-sonnet-4-5"
        }))
        .resolve()
        .unwrap_err();
        assert!(err.contains("a_score"));
    }
}
