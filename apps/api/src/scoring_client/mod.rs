//! Scoring Client: the single point of entry for calls to the remote scoring service.
//!
//! RULE: No other module talks to the scoring service directly.
//!
//! Every operation reports transport and service failures as a tagged outcome
//! (`success: false`, `error`) and never as `Err`. The only `Err` a caller sees is a
//! `ValidationError`, raised before any request is sent.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::candidate::{CandidateRow, QuickScoreAnalysis};
use crate::models::job::JobRow;
use crate::models::llm::{LocalModel, ModelDescriptor};
use crate::progress::ProgressState;

const STATUS_PATH: &str = "/api/ollama/status";
const EVALUATE_PATH: &str = "/api/evaluate_quick";
const BATCH_PATH: &str = "/api/evaluate_quick/batch";
const COMPARE_PATH: &str = "/api/evaluate_quick/compare";

/// Raised when a request would carry a malformed job, candidate, or model list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("job title cannot be empty")]
    BlankJobTitle,

    #[error("job {0} has no must-have requirements to score against")]
    NoMustHaveRequirements(Uuid),

    #[error("candidate {0} has no name")]
    BlankCandidateName(Uuid),

    #[error("candidate '{0}' has no resume text")]
    MissingResume(String),

    #[error("candidate list cannot be empty")]
    EmptyCandidateList,

    #[error("model list cannot be empty")]
    EmptyModelList,

    #[error("model id cannot be blank")]
    BlankModel,
}

// ────────────────────────────────────────────────────────────────────────────
// Request payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: Uuid,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub must_have_requirements: Vec<String>,
    pub preferred_requirements: Vec<String>,
}

impl From<&JobRow> for JobPayload {
    fn from(job: &JobRow) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            department: job.department.clone(),
            location: job.location.clone(),
            summary: job.summary.clone(),
            must_have_requirements: job.must_have_requirements.clone(),
            preferred_requirements: job.preferred_requirements.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub resume_text: String,
}

impl From<&CandidateRow> for CandidatePayload {
    fn from(candidate: &CandidateRow) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            resume_text: candidate.resume_text.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    job: &'a JobPayload,
    candidate: &'a CandidatePayload,
    model: &'a str,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    job: &'a JobPayload,
    candidates: &'a [CandidatePayload],
    model: &'a str,
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    job: &'a JobPayload,
    candidate: &'a CandidatePayload,
    models: &'a [String],
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub available: bool,
    pub models: Vec<String>,
    pub configured_models: Vec<ModelDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    fn unavailable(error: String) -> Self {
        Self {
            available: false,
            models: Vec::new(),
            configured_models: LocalModel::default_descriptors(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusWire {
    available: bool,
    models: Vec<String>,
    configured_models: Option<Vec<ModelDescriptor>>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickScoreOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(
        deserialize_with = "lenient_analysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis: Option<QuickScoreAnalysis>,
    #[serde(alias = "ollama_available", skip_serializing_if = "Option::is_none")]
    pub provider_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry of a batch response, positionally matched to the request's candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchItemResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(
        deserialize_with = "lenient_analysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis: Option<QuickScoreAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn failed(candidate: &CandidatePayload, error: String) -> Self {
        Self {
            candidate_id: Some(candidate.id.to_string()),
            candidate_name: Some(candidate.name.clone()),
            success: false,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn from_outcome(candidate: &CandidatePayload, outcome: QuickScoreOutcome) -> Self {
        Self {
            candidate_id: Some(candidate.id.to_string()),
            candidate_name: Some(candidate.name.clone()),
            success: outcome.success,
            score: outcome.score,
            reasoning: outcome.reasoning,
            analysis: outcome.analysis,
            usage: outcome.usage,
            error: outcome.error,
        }
    }

    /// A result carries a usable score when the service produced one without error.
    pub fn scored(&self) -> Option<f64> {
        if self.error.is_some() {
            return None;
        }
        self.score
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOutcome {
    pub success: bool,
    pub results: Vec<BatchItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(alias = "ollama_available", skip_serializing_if = "Option::is_none")]
    pub provider_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelComparison {
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    pub results: Vec<ModelComparison>,
    #[serde(alias = "ollama_available", skip_serializing_if = "Option::is_none")]
    pub provider_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome types that can represent a failed call.
trait Outcome: DeserializeOwned {
    fn failed(error: String) -> Self;
}

impl Outcome for QuickScoreOutcome {
    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

impl Outcome for BatchOutcome {
    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

impl Outcome for CompareOutcome {
    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// HTTP client for the scoring service. Cheap to clone.
#[derive(Clone)]
pub struct ScoringClient {
    http: Client,
    base_url: String,
}

impl ScoringClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/ollama/status
    ///
    /// Never fails. When the service is unreachable, `configured_models` falls back
    /// to the built-in three-model set so the UI can still offer a choice.
    pub async fn check_status(&self) -> StatusReport {
        let response = match self.http.get(self.url(STATUS_PATH)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Scoring status check failed: {e}");
                return StatusReport::unavailable(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return StatusReport::unavailable(e.to_string()),
        };

        if !status.is_success() {
            let message = error_message(&body, status);
            warn!("Scoring status check returned {status}: {message}");
            return StatusReport::unavailable(message);
        }

        match serde_json::from_str::<StatusWire>(&body) {
            Ok(wire) => StatusReport {
                available: wire.available,
                models: wire.models,
                configured_models: wire
                    .configured_models
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(LocalModel::default_descriptors),
                error: wire.error,
            },
            Err(e) => StatusReport::unavailable(format!("invalid status response: {e}")),
        }
    }

    /// POST /api/evaluate_quick: quick score for one candidate.
    /// `model` defaults to the recommended local model.
    pub async fn evaluate_single(
        &self,
        job: &JobPayload,
        candidate: &CandidatePayload,
        model: Option<&str>,
    ) -> Result<QuickScoreOutcome, ValidationError> {
        validate_job(job)?;
        validate_candidate(candidate)?;
        let model = resolve_model(model)?;

        let request = EvaluateRequest {
            job,
            candidate,
            model,
        };
        let outcome: QuickScoreOutcome = self.post_json(EVALUATE_PATH, &request).await;

        debug!(
            "Quick score for candidate {} with {model}: success={} score={:?}",
            candidate.id, outcome.success, outcome.score
        );
        Ok(outcome)
    }

    /// POST /api/evaluate_quick/batch: all candidates in one round trip.
    ///
    /// `results` follow the order of `candidates`. A single response cannot carry
    /// incremental progress, so `on_progress` only sees the start
    /// `(0, total, first name)` and, on success, the end `(total, total, "")`.
    /// Tracked runs with per-candidate progress live in `evaluation::batch`.
    pub async fn evaluate_batch(
        &self,
        job: &JobPayload,
        candidates: &[CandidatePayload],
        model: Option<&str>,
        mut on_progress: Option<&mut (dyn FnMut(&ProgressState) + Send)>,
    ) -> Result<BatchOutcome, ValidationError> {
        validate_batch(job, candidates)?;
        let model = resolve_model(model)?;
        let total = candidates.len() as u32;

        if let Some(report) = on_progress.as_mut() {
            report(&ProgressState::new(0, total, candidates[0].name.as_str()));
        }

        let request = BatchRequest {
            job,
            candidates,
            model,
        };
        let outcome: BatchOutcome = self.post_json(BATCH_PATH, &request).await;

        if outcome.success {
            if let Some(report) = on_progress.as_mut() {
                report(&ProgressState::new(total, total, ""));
            }
        }
        if outcome.success && outcome.results.len() != candidates.len() {
            warn!(
                "Batch response carried {} results for {} candidates",
                outcome.results.len(),
                candidates.len()
            );
        }
        Ok(outcome)
    }

    /// POST /api/evaluate_quick/compare: one candidate scored by several models.
    pub async fn compare_models(
        &self,
        job: &JobPayload,
        candidate: &CandidatePayload,
        models: &[String],
    ) -> Result<CompareOutcome, ValidationError> {
        validate_job(job)?;
        validate_candidate(candidate)?;
        if models.is_empty() {
            return Err(ValidationError::EmptyModelList);
        }
        if models.iter().any(|m| m.trim().is_empty()) {
            return Err(ValidationError::BlankModel);
        }

        let request = CompareRequest {
            job,
            candidate,
            models,
        };
        Ok(self.post_json(COMPARE_PATH, &request).await)
    }

    /// Posts a JSON body and converts every failure mode into `T::failed`.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> T
    where
        B: Serialize + ?Sized,
        T: Outcome,
    {
        let response = match self.http.post(self.url(path)).json(body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Scoring request to {path} failed: {e}");
                return T::failed(e.to_string());
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                warn!("Could not read scoring response from {path}: {e}");
                return T::failed(e.to_string());
            }
        };

        if !status.is_success() {
            let message = error_message(&text, status);
            warn!("Scoring service returned {status} for {path}: {message}");
            return T::failed(message);
        }

        serde_json::from_str::<T>(&text).unwrap_or_else(|e| {
            warn!("Unparseable scoring response from {path}: {e}");
            T::failed(format!("invalid response from scoring service: {e}"))
        })
    }
}

/// `analysis` is optional detail: a malformed one is dropped instead of failing the
/// whole outcome and losing its score.
fn lenient_analysis<'de, D>(deserializer: D) -> Result<Option<QuickScoreAnalysis>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| !v.is_null())
        .and_then(|v| match serde_json::from_value(v) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("Ignoring malformed quick-score analysis: {e}");
                None
            }
        }))
}

/// Error text from a failed response: the body's `error` field when it has one
/// (a string, or an object with `message`), otherwise `HTTP <status>`.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed.as_ref().and_then(|v| match v.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj.get("message")?.as_str().map(str::to_string),
        _ => None,
    });
    from_body.unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Checks a job and its candidate list before any batch work starts.
pub fn validate_batch(job: &JobPayload, candidates: &[CandidatePayload]) -> Result<(), ValidationError> {
    validate_job(job)?;
    if candidates.is_empty() {
        return Err(ValidationError::EmptyCandidateList);
    }
    candidates.iter().try_for_each(validate_candidate)
}

fn validate_job(job: &JobPayload) -> Result<(), ValidationError> {
    if job.title.trim().is_empty() {
        return Err(ValidationError::BlankJobTitle);
    }
    if job.must_have_requirements.is_empty() {
        return Err(ValidationError::NoMustHaveRequirements(job.id));
    }
    Ok(())
}

fn validate_candidate(candidate: &CandidatePayload) -> Result<(), ValidationError> {
    if candidate.name.trim().is_empty() {
        return Err(ValidationError::BlankCandidateName(candidate.id));
    }
    if candidate.resume_text.trim().is_empty() {
        return Err(ValidationError::MissingResume(candidate.name.clone()));
    }
    Ok(())
}

fn resolve_model(model: Option<&str>) -> Result<&str, ValidationError> {
    match model {
        None => Ok(LocalModel::default().as_str()),
        Some(m) if m.trim().is_empty() => Err(ValidationError::BlankModel),
        Some(m) => Ok(m),
    }
}
