use crate::analyst::DocumentAnalyst;
use crate::audit::{AuditAction, AuditSink, SubjectRef};
use crate::error::EngineError;
use crate::finding::{Finding, Flag, FlagType, Severity};
use crate::gate;
use crate::reference::ReferenceData;
use crate::rules::{self, RuleConfig, RuleContext};
use crate::store::SubjectStore;
use crate::subject::{GateStatus, Subject, SubjectBody};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct GateEngineConfig {
    pub rules: RuleConfig,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub subject_id: String,
    pub status: GateStatus,
    /// Findings recorded by this run, in rule order.
    pub findings: Vec<Finding>,
    /// Derived clearance over the subject's full unresolved finding set.
    pub clear: bool,
    /// The single reason clearance failed, when it did.
    pub held_reason: Option<String>,
}

/// The screening gate's upward-facing interface.
///
/// Evaluation is re-runnable and additive; every run, resolution, and human
/// decision is audited. The automated path cannot reach `Approved`: the
/// store's screening update only accepts `ScreeningOutcome`, and the
/// explicit `approve` call is the sole writer of the terminal positive
/// state.
pub struct GateEngine {
    store: Arc<dyn SubjectStore>,
    audit: Arc<dyn AuditSink>,
    reference: Arc<ReferenceData>,
    analyst: Option<Arc<dyn DocumentAnalyst>>,
    config: GateEngineConfig,
}

impl GateEngine {
    pub fn new(
        store: Arc<dyn SubjectStore>,
        audit: Arc<dyn AuditSink>,
        reference: Arc<ReferenceData>,
        config: GateEngineConfig,
    ) -> Self {
        Self {
            store,
            audit,
            reference,
            analyst: None,
            config,
        }
    }

    pub fn with_analyst(mut self, analyst: Arc<dyn DocumentAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    /// Validated intake. The subject enters the gate unscreened.
    pub async fn submit(&self, subject: Subject) -> Result<(), EngineError> {
        subject.validate()?;
        self.store.insert(subject).await
    }

    /// Screen a subject now.
    pub async fn evaluate(&self, subject_id: &str) -> Result<EvaluationReport, EngineError> {
        self.evaluate_at(subject_id, Utc::now()).await
    }

    /// Screen a subject against an explicit clock instant.
    pub async fn evaluate_at(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<EvaluationReport, EngineError> {
        let subject = self.store.load(subject_id).await?;
        let ctx = RuleContext::at(now).with_config(self.config.rules.clone());

        let mut flags = rules::evaluate(&subject, &self.reference, &ctx);
        flags.extend(self.document_pass(&subject).await);

        let run_findings: Vec<Finding> = flags
            .into_iter()
            .map(|flag| Finding::record(subject_id, flag))
            .collect();
        self.store.append_findings(run_findings.clone()).await?;

        // Clearance spans every finding the subject has ever accumulated,
        // not just this run's.
        let all_findings = self.store.findings_for(subject_id).await?;
        let outcome = gate::screening_outcome(&all_findings);
        self.store.apply_screening(subject_id, outcome).await?;

        let clear = gate::is_clear(&all_findings);
        let held_reason = gate::held_reason(&all_findings);

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "findings_recorded".to_string(),
            serde_json::json!(run_findings.len()),
        );
        metadata.insert("outcome".to_string(), serde_json::json!(outcome));
        metadata.insert(
            "subject_snapshot_hash".to_string(),
            serde_json::json!(snapshot_hash(&subject.body)),
        );
        self.audit_best_effort(
            "system:evaluator",
            AuditAction::EvaluationRecorded,
            SubjectRef::new(subject.kind(), subject_id),
            metadata,
        )
        .await;

        info!(
            subject_id,
            outcome = outcome.as_status().name(),
            findings = run_findings.len(),
            "evaluation recorded"
        );

        Ok(EvaluationReport {
            subject_id: subject_id.to_string(),
            status: outcome.as_status(),
            findings: run_findings,
            clear,
            held_reason,
        })
    }

    /// Attach a resolution to a finding. The only mutation findings permit.
    pub async fn resolve_finding(
        &self,
        finding_id: &str,
        resolver: &str,
        notes: &str,
    ) -> Result<Finding, EngineError> {
        let resolution = crate::finding::Resolution {
            resolver: resolver.to_string(),
            notes: notes.to_string(),
            resolved_at: Utc::now(),
        };
        let finding = self.store.resolve_finding(finding_id, resolution).await?;

        let subject = self.store.load(&finding.subject_id).await?;
        let mut metadata = BTreeMap::new();
        metadata.insert("finding_id".to_string(), serde_json::json!(finding_id));
        metadata.insert("notes".to_string(), serde_json::json!(notes));
        self.audit_best_effort(
            resolver,
            AuditAction::FindingResolved,
            SubjectRef::new(subject.kind(), finding.subject_id.clone()),
            metadata,
        )
        .await;

        Ok(finding)
    }

    /// Explicit human approval — the only path to the terminal positive
    /// state, and only from `UnderReview` with clearance intact.
    pub async fn approve(
        &self,
        subject_id: &str,
        approver: &str,
        notes: &str,
    ) -> Result<(), EngineError> {
        let subject = self.store.load(subject_id).await?;

        let findings = self.store.findings_for(subject_id).await?;
        if !gate::is_clear(&findings) {
            return Err(EngineError::Precondition(format!(
                "subject '{}' has unresolved blocking findings",
                subject_id
            )));
        }

        self.store
            .apply_decision(subject_id, GateStatus::UnderReview, GateStatus::Approved)
            .await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("notes".to_string(), serde_json::json!(notes));
        metadata.insert(
            "decision".to_string(),
            serde_json::json!(subject.kind().approved_label()),
        );
        self.audit_best_effort(
            approver,
            AuditAction::SubjectApproved,
            SubjectRef::new(subject.kind(), subject_id),
            metadata,
        )
        .await;

        info!(subject_id, approver, "subject approved");
        Ok(())
    }

    /// Explicit human rejection, same precondition as approval.
    pub async fn reject(
        &self,
        subject_id: &str,
        approver: &str,
        reason: &str,
    ) -> Result<(), EngineError> {
        let subject = self.store.load(subject_id).await?;

        self.store
            .apply_decision(subject_id, GateStatus::UnderReview, GateStatus::Rejected)
            .await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("reason".to_string(), serde_json::json!(reason));
        self.audit_best_effort(
            approver,
            AuditAction::SubjectRejected,
            SubjectRef::new(subject.kind(), subject_id),
            metadata,
        )
        .await;

        info!(subject_id, approver, "subject rejected");
        Ok(())
    }

    /// Derived clearance, recomputed from storage on every call.
    pub async fn clearance(&self, subject_id: &str) -> Result<bool, EngineError> {
        let findings = self.store.findings_for(subject_id).await?;
        Ok(gate::is_clear(&findings))
    }

    pub async fn audit_trail(
        &self,
        subject_id: &str,
    ) -> Result<Vec<crate::audit::AuditEntry>, EngineError> {
        self.audit.trail(subject_id).await
    }

    /// Free-text pass over instrument documents, delegated to the external
    /// collaborator. Failures downgrade to an advisory flag; notes are
    /// capped at medium severity and can never block or decide a state.
    async fn document_pass(&self, subject: &Subject) -> Vec<Flag> {
        let (analyst, raw_text) = match (&self.analyst, &subject.body) {
            (Some(analyst), SubjectBody::Instrument(instrument)) => {
                match instrument.raw_text.as_deref() {
                    Some(raw_text) => (analyst, raw_text),
                    None => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        };

        match analyst.review_document(&subject.subject_id, raw_text).await {
            Ok(notes) => notes
                .into_iter()
                .map(|note| {
                    let mut flag = Flag::new(FlagType::Documentation, Severity::Medium, note.message)
                        .needs_review()
                        .with_metadata("source", "document_analyst");
                    if let Some(recommendation) = note.recommendation {
                        flag = flag.with_recommendation(recommendation);
                    }
                    for (key, value) in note.details {
                        flag.metadata.insert(key, value);
                    }
                    flag
                })
                .collect(),
            Err(err) => {
                warn!(subject_id = %subject.subject_id, error = %err, "document analysis failed");
                vec![
                    Flag::new(
                        FlagType::Documentation,
                        Severity::Medium,
                        format!("document analysis unavailable: {}", err),
                    )
                    .with_recommendation("review the raw instrument text manually")
                    .needs_review()
                    .with_metadata("source", "document_analyst"),
                ]
            }
        }
    }

    async fn audit_best_effort(
        &self,
        actor: &str,
        action: AuditAction,
        subject_ref: SubjectRef,
        metadata: BTreeMap<String, serde_json::Value>,
    ) {
        // Best-effort durability: the audit write rides on top of the
        // synchronous transition and never rolls it back.
        if let Err(err) = self
            .audit
            .record(actor, action, subject_ref, metadata)
            .await
        {
            warn!(error = %err, "audit write failed; primary mutation kept");
        }
    }
}

fn snapshot_hash(body: &SubjectBody) -> String {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
