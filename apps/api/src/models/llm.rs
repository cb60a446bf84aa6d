use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::UnknownVariant;

/// Models served by the local (quick-score) tier.
///
/// The remote status check reports what is actually pulled on the host; this set
/// is the fallback the UI offers when that check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalModel {
    #[default]
    #[serde(rename = "qwen2.5:7b")]
    Qwen25_7b,
    #[serde(rename = "llama3.1:8b")]
    Llama31_8b,
    #[serde(rename = "mistral:7b")]
    Mistral7b,
}

impl LocalModel {
    pub const ALL: [LocalModel; 3] = [
        LocalModel::Qwen25_7b,
        LocalModel::Llama31_8b,
        LocalModel::Mistral7b,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocalModel::Qwen25_7b => "qwen2.5:7b",
            LocalModel::Llama31_8b => "llama3.1:8b",
            LocalModel::Mistral7b => "mistral:7b",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LocalModel::Qwen25_7b => "Qwen 2.5 7B",
            LocalModel::Llama31_8b => "Llama 3.1 8B",
            LocalModel::Mistral7b => "Mistral 7B",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LocalModel::Qwen25_7b => "Best structured output, recommended default",
            LocalModel::Llama31_8b => "Strong reasoning, slightly slower",
            LocalModel::Mistral7b => "Fastest, lighter analysis",
        }
    }

    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            id: self.as_str().to_string(),
            name: self.display_name().to_string(),
            description: self.description().to_string(),
        }
    }

    /// The fixed three-entry default set.
    pub fn default_descriptors() -> Vec<ModelDescriptor> {
        Self::ALL.iter().map(LocalModel::descriptor).collect()
    }
}

impl FromStr for LocalModel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocalModel::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("local model", s))
    }
}

/// A model offered for selection: id, display name, short description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Who ran an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
        }
    }

    /// Local inference has no per-token cost.
    pub fn is_local(&self) -> bool {
        matches!(self, LlmProvider::Ollama)
    }
}

impl FromStr for LlmProvider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(LlmProvider::Ollama),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(UnknownVariant::new("llm provider", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_set_has_three_entries() {
        let descriptors = LocalModel::default_descriptors();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[0].id, "qwen2.5:7b");
        assert!(descriptors.iter().all(|d| !d.name.is_empty()));
    }

    #[test]
    fn test_local_model_serde_uses_ollama_ids() {
        let json = serde_json::to_string(&LocalModel::Llama31_8b).unwrap();
        assert_eq!(json, "\"llama3.1:8b\"");
        let parsed: LocalModel = serde_json::from_str("\"mistral:7b\"").unwrap();
        assert_eq!(parsed, LocalModel::Mistral7b);
    }

    #[test]
    fn test_unknown_local_model_rejected() {
        let err = "gpt-4o".parse::<LocalModel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown local model 'gpt-4o'");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert!(LlmProvider::Ollama.is_local());
        assert!(!LlmProvider::Anthropic.is_local());
    }
}
