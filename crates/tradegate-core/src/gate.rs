use crate::error::EngineError;
use crate::finding::Finding;
use crate::subject::GateStatus;
use serde::{Deserialize, Serialize};

/// The automated screening path's entire vocabulary.
///
/// `Approved` has no representation here, which makes the evaluation path
/// structurally incapable of writing a terminal positive state: the store's
/// screening update only accepts this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningOutcome {
    UnderReview,
    Rejected,
}

impl ScreeningOutcome {
    pub fn as_status(self) -> GateStatus {
        match self {
            Self::UnderReview => GateStatus::UnderReview,
            Self::Rejected => GateStatus::Rejected,
        }
    }
}

/// Derived clearance: no unresolved blocking findings.
pub fn is_clear(findings: &[Finding]) -> bool {
    !findings.iter().any(Finding::holds_subject)
}

/// The one unresolved blocking finding message shown as the hold reason,
/// when clearance fails.
pub fn held_reason(findings: &[Finding]) -> Option<String> {
    findings
        .iter()
        .find(|f| f.holds_subject())
        .map(|f| f.flag.message.clone())
}

/// Status produced by an evaluation run over the subject's full finding set.
pub fn screening_outcome(findings: &[Finding]) -> ScreeningOutcome {
    if is_clear(findings) {
        ScreeningOutcome::UnderReview
    } else {
        ScreeningOutcome::Rejected
    }
}

/// Human approval transition. Only a subject currently under review may be
/// approved; any other state is a precondition failure and leaves the
/// status unchanged.
pub fn approve_transition(current: GateStatus) -> Result<GateStatus, EngineError> {
    match current {
        GateStatus::UnderReview => Ok(GateStatus::Approved),
        other => Err(EngineError::status_violation(
            GateStatus::UnderReview.name(),
            other.name(),
        )),
    }
}

/// Human rejection transition, same precondition as approval.
pub fn reject_transition(current: GateStatus) -> Result<GateStatus, EngineError> {
    match current {
        GateStatus::UnderReview => Ok(GateStatus::Rejected),
        other => Err(EngineError::status_violation(
            GateStatus::UnderReview.name(),
            other.name(),
        )),
    }
}
