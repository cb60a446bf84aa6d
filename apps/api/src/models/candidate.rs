use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Evaluated,
    Interviewing,
    Hired,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Evaluated => "evaluated",
            CandidateStatus::Interviewing => "interviewing",
            CandidateStatus::Hired => "hired",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for CandidateStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "evaluated" => Ok(CandidateStatus::Evaluated),
            "interviewing" => Ok(CandidateStatus::Interviewing),
            "hired" => Ok(CandidateStatus::Hired),
            "rejected" => Ok(CandidateStatus::Rejected),
            other => Err(UnknownVariant::new("candidate status", other)),
        }
    }
}

/// Categorical hiring disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Interview,
    PhoneScreen,
    Decline,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Interview => "INTERVIEW",
            Recommendation::PhoneScreen => "PHONE_SCREEN",
            Recommendation::Decline => "DECLINE",
        }
    }
}

impl FromStr for Recommendation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INTERVIEW" => Ok(Recommendation::Interview),
            "PHONE_SCREEN" => Ok(Recommendation::PhoneScreen),
            "DECLINE" => Ok(Recommendation::Decline),
            other => Err(UnknownVariant::new("recommendation", other)),
        }
    }
}

/// ATQ is the current composite; QER is kept so legacy evaluations still load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoringModel {
    #[default]
    Atq,
    Qer,
}

impl ScoringModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringModel::Atq => "ATQ",
            ScoringModel::Qer => "QER",
        }
    }
}

impl FromStr for ScoringModel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATQ" => Ok(ScoringModel::Atq),
            "QER" => Ok(ScoringModel::Qer),
            other => Err(UnknownVariant::new("scoring model", other)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quick-score analysis (stored as JSONB on the candidate)
// ────────────────────────────────────────────────────────────────────────────

/// A sub-score with the evidence the local model cited for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidencedScore {
    pub score: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationCounts {
    pub score: f64,
    pub must_haves_met: u32,
    pub must_haves_total: u32,
    pub preferred_met: u32,
    pub preferred_total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickScoreAnalysis {
    pub accomplishments: EvidencedScore,
    pub trajectory: EvidencedScore,
    pub qualifications: QualificationCounts,
    #[serde(default)]
    pub observations: String,
    #[serde(default)]
    pub reasoning: String,
}

impl QuickScoreAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        for (name, score) in [
            ("accomplishments", self.accomplishments.score),
            ("trajectory", self.trajectory.score),
            ("qualifications", self.qualifications.score),
        ] {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("{name} score {score} is outside 0-100"));
            }
        }
        let q = &self.qualifications;
        if q.must_haves_met > q.must_haves_total || q.preferred_met > q.preferred_total {
            return Err("qualification counts exceed their totals".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rows and requests
// ────────────────────────────────────────────────────────────────────────────

/// A candidate for one job.
///
/// The quick / stage1 / stage2 columns are independent projections of the latest
/// evaluation of each stage; any subset may be populated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_text: Option<String>,
    pub resume_file_path: Option<String>,
    pub quick_score: Option<i32>,
    pub quick_score_model: Option<String>,
    pub quick_score_analysis: Option<Json<QuickScoreAnalysis>>,
    pub stage1_score: Option<f64>,
    pub stage1_a_score: Option<f64>,
    pub stage1_t_score: Option<f64>,
    pub stage1_q_score: Option<f64>,
    pub stage2_score: Option<f64>,
    pub recommendation: Option<String>,
    pub scoring_model: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_text: Option<String>,
    pub resume_file_path: Option<String>,
}

impl NewCandidate {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        if let Some(email) = &self.email {
            if !email.is_empty() && !email.contains('@') {
                return Err(format!("'{email}' is not a valid email address"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateStatusUpdate {
    pub status: CandidateStatus,
}
