use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::repository::record_evaluation;
use crate::models::candidate::{QuickScoreAnalysis, ScoringModel};
use crate::models::evaluation::{EvaluationRow, EvaluationStage, NewEvaluation};
use crate::models::llm::{LlmProvider, LocalModel};
use crate::scoring::{check_overall_score, AtqComponents};
use crate::scoring_client::{BatchItemResult, QuickScoreOutcome, Usage};

/// The parts of a successful quick-score response worth persisting.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickScore {
    pub score: f64,
    pub reasoning: Option<String>,
    pub analysis: Option<QuickScoreAnalysis>,
    pub usage: Usage,
}

impl QuickScore {
    /// `None` unless the service reported success with a score and no error.
    pub fn from_outcome(outcome: &QuickScoreOutcome) -> Option<Self> {
        if !outcome.success || outcome.error.is_some() {
            return None;
        }
        Some(Self {
            score: outcome.score?,
            reasoning: outcome.reasoning.clone(),
            analysis: outcome.analysis.clone(),
            usage: outcome.usage.clone().unwrap_or_default(),
        })
    }

    pub fn from_item(item: &BatchItemResult) -> Option<Self> {
        if !item.success {
            return None;
        }
        Some(Self {
            score: item.scored()?,
            reasoning: item.reasoning.clone(),
            analysis: item.analysis.clone(),
            usage: item.usage.clone().unwrap_or_default(),
        })
    }
}

/// Builds the quick-stage evaluation for a local-model score. Local inference is free.
///
/// With an analysis the stored score is the ATQ composite of its three sub-scores;
/// without one the reported score is kept and the components stay empty.
pub fn quick_evaluation(model: LocalModel, quick: QuickScore) -> Result<NewEvaluation, String> {
    let reported = check_overall_score(quick.score)?;
    let quick_analysis = quick.analysis.filter(|a| match a.validate() {
        Ok(()) => true,
        Err(e) => {
            warn!("Dropping inconsistent quick-score analysis: {e}");
            false
        }
    });
    let analysis = quick_analysis.as_ref();
    let components = match analysis {
        Some(a) => Some(AtqComponents::new(
            a.accomplishments.score,
            a.trajectory.score,
            a.qualifications.score,
        )?),
        None => None,
    };
    let score = match components {
        Some(c) => {
            let computed = c.composite();
            if (reported - computed).abs() > 0.5 {
                warn!(
                    "Quick score {reported} from {} disagrees with ATQ composite {computed:.2}; storing composite",
                    model.as_str()
                );
            }
            computed
        }
        None => reported,
    };

    let reasoning = quick
        .reasoning
        .clone()
        .or_else(|| analysis.map(|a| a.reasoning.clone()))
        .filter(|r| !r.trim().is_empty());
    let observations = analysis
        .map(|a| a.observations.trim().to_string())
        .filter(|o| !o.is_empty())
        .into_iter()
        .collect();

    Ok(NewEvaluation {
        stage: EvaluationStage::Quick,
        scoring_model: ScoringModel::Atq,
        score,
        a_score: components.map(|c| c.a),
        t_score: components.map(|c| c.t),
        q_score: components.map(|c| c.q),
        accomplishments: None,
        trajectory: None,
        qualifications: None,
        recommendation: None,
        reasoning,
        strengths: Vec::new(),
        concerns: Vec::new(),
        interview_questions: Vec::new(),
        observations,
        provider: LlmProvider::Ollama,
        model_id: model.as_str().to_string(),
        input_tokens: quick.usage.input_tokens,
        output_tokens: quick.usage.output_tokens,
        cost_usd: 0.0,
        quick_analysis,
    })
}

/// Persists a quick score as a new evaluation and refreshes the candidate's quick columns.
pub async fn record_quick_score(
    pool: &PgPool,
    candidate_id: Uuid,
    model: LocalModel,
    quick: QuickScore,
) -> Result<EvaluationRow, AppError> {
    let evaluation = quick_evaluation(model, quick).map_err(AppError::Validation)?;
    record_evaluation(pool, candidate_id, &evaluation).await
}
