use crate::error::EngineError;
use crate::finding::{Finding, Resolution};
use crate::gate::ScreeningOutcome;
use crate::subject::{GateStatus, Subject};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Subject and finding persistence, consumed through conditional updates.
///
/// The two status mutators are deliberately asymmetric: the automated path
/// goes through `apply_screening`, whose vocabulary cannot express
/// `Approved`, while human decisions go through `apply_decision`, a
/// compare-and-set keyed on the expected current status so racing reviewers
/// lose with a precondition error instead of silently overwriting.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    async fn insert(&self, subject: Subject) -> Result<(), EngineError>;

    async fn load(&self, subject_id: &str) -> Result<Subject, EngineError>;

    /// Unconditional status write reachable only from screening outcomes.
    async fn apply_screening(
        &self,
        subject_id: &str,
        outcome: ScreeningOutcome,
    ) -> Result<(), EngineError>;

    /// Conditional status write: succeeds only if the subject is currently
    /// in `expected`.
    async fn apply_decision(
        &self,
        subject_id: &str,
        expected: GateStatus,
        next: GateStatus,
    ) -> Result<(), EngineError>;

    /// Append findings verbatim. No dedup and no merge: repeated evaluation
    /// produces repeated findings, each run being a distinct audit event.
    async fn append_findings(&self, findings: Vec<Finding>) -> Result<(), EngineError>;

    async fn findings_for(&self, subject_id: &str) -> Result<Vec<Finding>, EngineError>;

    async fn finding(&self, finding_id: &str) -> Result<Finding, EngineError>;

    /// Attach a resolution to an unresolved finding. Fails with a
    /// precondition error if the finding is already resolved.
    async fn resolve_finding(
        &self,
        finding_id: &str,
        resolution: Resolution,
    ) -> Result<Finding, EngineError>;
}

/// In-process store for tests and local orchestration.
#[derive(Default)]
pub struct InMemorySubjectStore {
    subjects: RwLock<BTreeMap<String, Subject>>,
    findings: RwLock<Vec<Finding>>,
}

impl InMemorySubjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubjectStore for InMemorySubjectStore {
    async fn insert(&self, subject: Subject) -> Result<(), EngineError> {
        let mut subjects = self.subjects.write();
        if subjects.contains_key(&subject.subject_id) {
            return Err(EngineError::Validation(format!(
                "subject '{}' already exists",
                subject.subject_id
            )));
        }
        subjects.insert(subject.subject_id.clone(), subject);
        Ok(())
    }

    async fn load(&self, subject_id: &str) -> Result<Subject, EngineError> {
        self.subjects
            .read()
            .get(subject_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("subject", subject_id))
    }

    async fn apply_screening(
        &self,
        subject_id: &str,
        outcome: ScreeningOutcome,
    ) -> Result<(), EngineError> {
        let mut subjects = self.subjects.write();
        let subject = subjects
            .get_mut(subject_id)
            .ok_or_else(|| EngineError::not_found("subject", subject_id))?;
        subject.status = outcome.as_status();
        subject.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn apply_decision(
        &self,
        subject_id: &str,
        expected: GateStatus,
        next: GateStatus,
    ) -> Result<(), EngineError> {
        let mut subjects = self.subjects.write();
        let subject = subjects
            .get_mut(subject_id)
            .ok_or_else(|| EngineError::not_found("subject", subject_id))?;
        if subject.status != expected {
            return Err(EngineError::status_violation(
                expected.name(),
                subject.status.name(),
            ));
        }
        subject.status = next;
        subject.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn append_findings(&self, new_findings: Vec<Finding>) -> Result<(), EngineError> {
        self.findings.write().extend(new_findings);
        Ok(())
    }

    async fn findings_for(&self, subject_id: &str) -> Result<Vec<Finding>, EngineError> {
        Ok(self
            .findings
            .read()
            .iter()
            .filter(|f| f.subject_id == subject_id)
            .cloned()
            .collect())
    }

    async fn finding(&self, finding_id: &str) -> Result<Finding, EngineError> {
        self.findings
            .read()
            .iter()
            .find(|f| f.finding_id == finding_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("finding", finding_id))
    }

    async fn resolve_finding(
        &self,
        finding_id: &str,
        resolution: Resolution,
    ) -> Result<Finding, EngineError> {
        let mut findings = self.findings.write();
        let finding = findings
            .iter_mut()
            .find(|f| f.finding_id == finding_id)
            .ok_or_else(|| EngineError::not_found("finding", finding_id))?;
        if finding.is_resolved() {
            return Err(EngineError::Precondition(format!(
                "finding '{}' is already resolved",
                finding_id
            )));
        }
        finding.resolution = Some(resolution);
        Ok(finding.clone())
    }
}
