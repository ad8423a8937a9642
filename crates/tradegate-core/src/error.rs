use thiserror::Error;

/// Engine errors surfaced to callers of the gate.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("External service '{service}' failed: {message}")]
    ExternalService { service: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn status_violation(expected: &str, actual: &str) -> Self {
        Self::Precondition(format!(
            "status transition requires '{}', subject is '{}'",
            expected, actual
        ))
    }
}
