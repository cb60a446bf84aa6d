use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateStatus;
use crate::models::evaluation::{EvaluationRow, EvaluationStage, NewEvaluation};

/// Appends an evaluation and refreshes the candidate's projection for its stage.
///
/// CRITICAL: both writes happen in one transaction so the candidate's stage columns
/// always match the newest evaluation of that stage. Evaluations are never updated.
pub async fn record_evaluation(
    pool: &PgPool,
    candidate_id: Uuid,
    evaluation: &NewEvaluation,
) -> Result<EvaluationRow, AppError> {
    let mut tx = pool.begin().await?;

    // Row lock serializes version assignment per candidate.
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM candidates WHERE id = $1 FOR UPDATE")
            .bind(candidate_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!(
            "Candidate {candidate_id} not found"
        )));
    }

    let version: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM evaluations WHERE candidate_id = $1",
    )
    .bind(candidate_id)
    .fetch_one(&mut *tx)
    .await?;

    let row = insert_evaluation(&mut tx, candidate_id, version, evaluation).await?;
    project_onto_candidate(&mut tx, candidate_id, evaluation).await?;

    tx.commit().await?;

    info!(
        "Recorded {} evaluation v{version} for candidate {candidate_id}: score={:.1}",
        evaluation.stage.as_str(),
        evaluation.score
    );
    Ok(row)
}

async fn insert_evaluation(
    tx: &mut Transaction<'_, Postgres>,
    candidate_id: Uuid,
    version: i32,
    e: &NewEvaluation,
) -> Result<EvaluationRow, AppError> {
    Ok(sqlx::query_as::<_, EvaluationRow>(
        r#"
        INSERT INTO evaluations
            (id, candidate_id, score, scoring_model, a_score, t_score, q_score,
             accomplishments_analysis, trajectory_analysis, qualifications_analysis,
             recommendation, reasoning, strengths, concerns, interview_questions,
             observations, provider, model_id, input_tokens, output_tokens, cost_usd,
             version, evaluation_stage)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(e.score)
    .bind(e.scoring_model.as_str())
    .bind(e.a_score)
    .bind(e.t_score)
    .bind(e.q_score)
    .bind(e.accomplishments.as_ref().map(Json))
    .bind(e.trajectory.as_ref().map(Json))
    .bind(e.qualifications.as_ref().map(Json))
    .bind(e.recommendation.map(|r| r.as_str()))
    .bind(&e.reasoning)
    .bind(&e.strengths)
    .bind(&e.concerns)
    .bind(&e.interview_questions)
    .bind(&e.observations)
    .bind(e.provider.as_str())
    .bind(&e.model_id)
    .bind(e.input_tokens as i32)
    .bind(e.output_tokens as i32)
    .bind(e.cost_usd)
    .bind(version)
    .bind(e.stage.as_str())
    .fetch_one(&mut **tx)
    .await?)
}

/// Writes the stage columns, plus recommendation / scoring model / status.
/// A pending candidate becomes evaluated; later pipeline statuses are kept.
async fn project_onto_candidate(
    tx: &mut Transaction<'_, Postgres>,
    candidate_id: Uuid,
    e: &NewEvaluation,
) -> Result<(), AppError> {
    let sql = projection_sql(e.stage);
    let query = sqlx::query(&sql)
        .bind(candidate_id)
        .bind(e.recommendation.map(|r| r.as_str()))
        .bind(e.scoring_model.as_str())
        .bind(CandidateStatus::Pending.as_str())
        .bind(CandidateStatus::Evaluated.as_str());

    let query = match e.stage {
        EvaluationStage::Quick => query
            .bind(e.score.round() as i32)
            .bind(&e.model_id)
            .bind(e.quick_analysis.as_ref().map(Json)),
        EvaluationStage::Stage1 => query
            .bind(e.score)
            .bind(e.a_score)
            .bind(e.t_score)
            .bind(e.q_score),
        EvaluationStage::Stage2 => query.bind(e.score),
    };

    query.execute(&mut **tx).await?;
    Ok(())
}

/// `$1` candidate id, `$2`–`$5` shared columns, `$6` onwards the stage's own columns.
fn projection_sql(stage: EvaluationStage) -> String {
    const COMMON: &str = "recommendation = COALESCE($2, recommendation), \
         scoring_model = $3, \
         status = CASE WHEN status = $4 THEN $5 ELSE status END, \
         updated_at = NOW()";

    match stage {
        EvaluationStage::Quick => format!(
            "UPDATE candidates SET quick_score = $6, quick_score_model = $7, \
             quick_score_analysis = $8, {COMMON} WHERE id = $1"
        ),
        EvaluationStage::Stage1 => format!(
            "UPDATE candidates SET stage1_score = $6, stage1_a_score = $7, \
             stage1_t_score = $8, stage1_q_score = $9, {COMMON} WHERE id = $1"
        ),
        EvaluationStage::Stage2 => {
            format!("UPDATE candidates SET stage2_score = $6, {COMMON} WHERE id = $1")
        }
    }
}

/// Evaluation history for a candidate, newest first.
pub async fn list_evaluations(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Vec<EvaluationRow>, AppError> {
    Ok(sqlx::query_as::<_, EvaluationRow>(
        "SELECT * FROM evaluations WHERE candidate_id = $1 ORDER BY version DESC",
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::repository::{create_candidate, get_candidate};
    use crate::jobs::repository::{create_job, delete_job};
    use crate::models::candidate::{NewCandidate, Recommendation, ScoringModel};
    use crate::models::job::{JobStatus, NewJob};
    use crate::models::llm::LlmProvider;

    #[test]
    fn test_projection_sql_binds_stage_columns_after_common_ones() {
        let quick = projection_sql(EvaluationStage::Quick);
        assert!(quick.contains("quick_score = $6"));
        assert!(quick.contains("quick_score_analysis = $8"));
        assert!(!quick.contains("$9"));

        let stage1 = projection_sql(EvaluationStage::Stage1);
        assert!(stage1.contains("stage1_score = $6"));
        assert!(stage1.contains("stage1_q_score = $9"));
        assert!(!stage1.contains("quick_score"));

        let stage2 = projection_sql(EvaluationStage::Stage2);
        assert!(stage2.contains("stage2_score = $6"));
        assert!(!stage2.contains("$7"));

        for sql in [quick, stage1, stage2] {
            assert!(sql.contains("COALESCE($2, recommendation)"));
            assert!(sql.contains("WHEN status = $4 THEN $5"));
            assert!(sql.ends_with("WHERE id = $1"));
        }
    }

    fn evaluation(stage: EvaluationStage, score: f64) -> NewEvaluation {
        NewEvaluation {
            stage,
            scoring_model: ScoringModel::Atq,
            score,
            a_score: None,
            t_score: None,
            q_score: None,
            accomplishments: None,
            trajectory: None,
            qualifications: None,
            recommendation: None,
            reasoning: None,
            strengths: Vec::new(),
            concerns: Vec::new(),
            interview_questions: Vec::new(),
            observations: Vec::new(),
            provider: LlmProvider::Anthropic,
            model_id: "claude-sonnet-4-5".to_string(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            quick_analysis: None,
        }
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid) {
        let job = create_job(
            pool,
            &NewJob {
                title: "Platform Engineer".to_string(),
                department: None,
                location: None,
                summary: None,
                must_have_requirements: vec!["Rust".to_string()],
                preferred_requirements: Vec::new(),
                status: JobStatus::Active,
            },
        )
        .await
        .unwrap();
        let candidate = create_candidate(
            pool,
            job.id,
            &NewCandidate {
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: None,
                resume_text: Some("Built analytical engines".to_string()),
                resume_file_path: None,
            },
        )
        .await
        .unwrap();
        (job.id, candidate.id)
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_each_stage_projects_onto_candidate(pool: PgPool) {
        let (_, candidate_id) = seed(&pool).await;

        let mut quick = evaluation(EvaluationStage::Quick, 71.6);
        quick.provider = LlmProvider::Ollama;
        quick.model_id = "qwen2.5:7b".to_string();
        let first = record_evaluation(&pool, candidate_id, &quick).await.unwrap();
        assert_eq!(first.version, 1);

        let candidate = get_candidate(&pool, candidate_id).await.unwrap();
        assert_eq!(candidate.quick_score, Some(72));
        assert_eq!(candidate.quick_score_model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(candidate.stage1_score, None);
        assert_eq!(candidate.status, CandidateStatus::Evaluated.as_str());

        let mut stage1 = evaluation(EvaluationStage::Stage1, 78.0);
        stage1.a_score = Some(80.0);
        stage1.t_score = Some(60.0);
        stage1.q_score = Some(100.0);
        stage1.recommendation = Some(Recommendation::Interview);
        let second = record_evaluation(&pool, candidate_id, &stage1).await.unwrap();
        assert_eq!(second.version, 2);

        let stage2 = evaluation(EvaluationStage::Stage2, 83.5);
        let third = record_evaluation(&pool, candidate_id, &stage2).await.unwrap();
        assert_eq!(third.version, 3);

        let candidate = get_candidate(&pool, candidate_id).await.unwrap();
        assert_eq!(candidate.quick_score, Some(72));
        assert_eq!(candidate.stage1_score, Some(78.0));
        assert_eq!(
            (candidate.stage1_a_score, candidate.stage1_t_score, candidate.stage1_q_score),
            (Some(80.0), Some(60.0), Some(100.0))
        );
        assert_eq!(candidate.stage2_score, Some(83.5));
        // Stage 2 carried no recommendation, so stage 1's is kept.
        assert_eq!(
            candidate.recommendation.as_deref(),
            Some(Recommendation::Interview.as_str())
        );

        let versions: Vec<i32> = list_evaluations(&pool, candidate_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version)
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_deleting_job_removes_its_evaluations(pool: PgPool) {
        let (job_id, candidate_id) = seed(&pool).await;
        record_evaluation(&pool, candidate_id, &evaluation(EvaluationStage::Stage1, 64.0))
            .await
            .unwrap();
        record_evaluation(&pool, candidate_id, &evaluation(EvaluationStage::Stage2, 70.0))
            .await
            .unwrap();

        delete_job(&pool, job_id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evaluations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            get_candidate(&pool, candidate_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unknown_candidate_is_not_found(pool: PgPool) {
        let err = record_evaluation(&pool, Uuid::new_v4(), &evaluation(EvaluationStage::Stage2, 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
