pub mod candidate;
pub mod evaluation;
pub mod job;
pub mod llm;
pub mod profile;

/// Error returned when a stored or submitted string is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
