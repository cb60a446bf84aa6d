use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::PerformanceProfile;
use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Closed,
    #[default]
    Draft,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
            JobStatus::Draft => "draft",
        }
    }
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(JobStatus::Active),
            "closed" => Ok(JobStatus::Closed),
            "draft" => Ok(JobStatus::Draft),
            other => Err(UnknownVariant::new("job status", other)),
        }
    }
}

/// A job posting. Owns its candidates; deleting it cascades.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub must_have_requirements: Vec<String>,
    pub preferred_requirements: Vec<String>,
    pub status: String,
    pub performance_profile: Option<Json<PerformanceProfile>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRow {
    pub fn status(&self) -> Result<JobStatus, UnknownVariant> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub must_have_requirements: Vec<String>,
    #[serde(default)]
    pub preferred_requirements: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub must_have_requirements: Option<Vec<String>>,
    pub preferred_requirements: Option<Vec<String>>,
    pub status: Option<JobStatus>,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title cannot be empty".to_string());
        }
        check_requirements("must_have_requirements", &self.must_have_requirements)?;
        check_requirements("preferred_requirements", &self.preferred_requirements)
    }
}

impl JobUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("title cannot be empty".to_string());
            }
        }
        if let Some(reqs) = &self.must_have_requirements {
            check_requirements("must_have_requirements", reqs)?;
        }
        if let Some(reqs) = &self.preferred_requirements {
            check_requirements("preferred_requirements", reqs)?;
        }
        Ok(())
    }
}

fn check_requirements(field: &str, reqs: &[String]) -> Result<(), String> {
    match reqs.iter().position(|r| r.trim().is_empty()) {
        Some(idx) => Err(format!("{field}[{idx}] cannot be blank")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [JobStatus::Active, JobStatus::Closed, JobStatus::Draft] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("archived".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_new_job_defaults_to_draft() {
        let job: NewJob = serde_json::from_str(r#"{"title": "Platform Engineer"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Draft);
        assert!(job.must_have_requirements.is_empty());
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_blank_requirement_rejected() {
        let job = NewJob {
            title: "Data Engineer".to_string(),
            department: None,
            location: None,
            summary: None,
            must_have_requirements: vec!["SQL".to_string(), "  ".to_string()],
            preferred_requirements: vec![],
            status: JobStatus::Active,
        };
        assert_eq!(
            job.validate().unwrap_err(),
            "must_have_requirements[1] cannot be blank"
        );
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let update = JobUpdate {
            title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
