use serde::{Deserialize, Serialize};

/// Structured hiring criteria attached to a job. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceProfile {
    pub year_1_outcomes: Vec<String>,
    pub biggest_challenge: Option<String>,
    pub comparable_experience: Vec<String>,
    pub dealbreakers: Vec<String>,
    pub motivation_drivers: Vec<String>,
    pub must_have_requirements: Vec<String>,
    pub nice_to_have_requirements: Vec<String>,
    pub trajectory_patterns: Vec<String>,
    pub context_notes: Option<String>,
}

impl PerformanceProfile {
    /// Drops blank list items and blank free-text fields so that stored profiles
    /// only carry content that renders.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.year_1_outcomes,
            &mut self.comparable_experience,
            &mut self.dealbreakers,
            &mut self.motivation_drivers,
            &mut self.must_have_requirements,
            &mut self.nice_to_have_requirements,
            &mut self.trajectory_patterns,
        ] {
            list.retain(|item| !item.trim().is_empty());
        }
        self.biggest_challenge = self.biggest_challenge.filter(|s| !s.trim().is_empty());
        self.context_notes = self.context_notes.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == PerformanceProfile::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let profile: PerformanceProfile =
            serde_json::from_str(r#"{"dealbreakers": ["No ownership"]}"#).unwrap();
        assert_eq!(profile.dealbreakers, vec!["No ownership"]);
        assert!(profile.year_1_outcomes.is_empty());
        assert!(profile.biggest_challenge.is_none());
    }

    #[test]
    fn test_normalized_strips_blank_content() {
        let profile = PerformanceProfile {
            dealbreakers: vec!["".to_string(), "  ".to_string()],
            context_notes: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(profile.is_empty());
    }
}
