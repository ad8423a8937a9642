//! Append-only, hash-chained audit log.
//!
//! The audit log is the system of record for "was the gate actually
//! observed", independent of the mutable subject and finding tables. No
//! update or delete operation exists; each entry commits to its predecessor
//! through a SHA-256 chain so tampering is detectable.

use crate::error::EngineError;
use crate::subject::SubjectKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// What happened, from the gate's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EvaluationRecorded,
    FindingResolved,
    SubjectApproved,
    SubjectRejected,
    AnchorSubmitted,
    Custom(String),
}

/// Stable reference to the record an entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: String,
    pub id: String,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        Self {
            kind: kind.name().to_string(),
            id: id.into(),
        }
    }

    /// Reference for non-subject records (anchors, documents).
    pub fn object(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    pub subject_ref: SubjectRef,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Hash of the previous entry, `None` only for the first entry.
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

impl AuditEntry {
    fn finalize(
        actor: String,
        action: AuditAction,
        subject_ref: SubjectRef,
        metadata: BTreeMap<String, serde_json::Value>,
        previous_hash: Option<String>,
    ) -> Self {
        let entry_id = Uuid::new_v4();
        let timestamp = Utc::now();
        let entry_hash = compute_entry_hash(
            &entry_id,
            timestamp,
            &actor,
            &action,
            &subject_ref,
            &metadata,
            previous_hash.as_deref(),
        );
        Self {
            entry_id,
            timestamp,
            actor,
            action,
            subject_ref,
            metadata,
            previous_hash,
            entry_hash,
        }
    }
}

fn compute_entry_hash(
    entry_id: &Uuid,
    timestamp: DateTime<Utc>,
    actor: &str,
    action: &AuditAction,
    subject_ref: &SubjectRef,
    metadata: &BTreeMap<String, serde_json::Value>,
    previous_hash: Option<&str>,
) -> String {
    let hash_input = format!(
        "{}{}{}{}{}{}{}",
        entry_id,
        timestamp.to_rfc3339(),
        actor,
        serde_json::to_string(action).unwrap_or_default(),
        serde_json::to_string(subject_ref).unwrap_or_default(),
        serde_json::to_string(metadata).unwrap_or_default(),
        previous_hash.unwrap_or("")
    );

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify hash correctness and linkage over a stored chain.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    let mut previous_hash: Option<&str> = None;
    for entry in entries {
        let expected = compute_entry_hash(
            &entry.entry_id,
            entry.timestamp,
            &entry.actor,
            &entry.action,
            &entry.subject_ref,
            &entry.metadata,
            previous_hash,
        );
        if entry.entry_hash != expected {
            return false;
        }
        if entry.previous_hash.as_deref() != previous_hash {
            return false;
        }
        previous_hash = Some(entry.entry_hash.as_str());
    }
    true
}

/// Append-only audit sink. Writes never require read-modify-write from the
/// caller's side and there is no removal surface.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        actor: &str,
        action: AuditAction,
        subject_ref: SubjectRef,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<AuditEntry, EngineError>;

    /// Entries touching one record id, in append order.
    async fn trail(&self, subject_id: &str) -> Result<Vec<AuditEntry>, EngineError>;
}

/// In-process audit sink.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn verify(&self) -> bool {
        verify_chain(&self.entries.read())
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(
        &self,
        actor: &str,
        action: AuditAction,
        subject_ref: SubjectRef,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<AuditEntry, EngineError> {
        let mut entries = self.entries.write();
        let previous_hash = entries.last().map(|entry| entry.entry_hash.clone());
        let entry = AuditEntry::finalize(
            actor.to_string(),
            action,
            subject_ref,
            metadata,
            previous_hash,
        );
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn trail(&self, subject_id: &str) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.subject_ref.id == subject_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn record_sample(sink: &MemoryAuditSink, id: &str) -> AuditEntry {
        sink.record(
            "system:evaluator",
            AuditAction::EvaluationRecorded,
            SubjectRef::new(SubjectKind::Deal, id),
            BTreeMap::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn entries_chain_and_verify() {
        let sink = MemoryAuditSink::new();
        let first = record_sample(&sink, "deal-1").await;
        let second = record_sample(&sink, "deal-1").await;

        assert!(first.previous_hash.is_none());
        assert_eq!(second.previous_hash.as_deref(), Some(first.entry_hash.as_str()));
        assert!(sink.verify());
    }

    #[tokio::test]
    async fn tampered_entry_breaks_verification() {
        let sink = MemoryAuditSink::new();
        record_sample(&sink, "deal-1").await;
        record_sample(&sink, "deal-1").await;

        let mut entries = sink.entries();
        entries[0].actor = "someone-else".to_string();
        assert!(!verify_chain(&entries));
    }

    #[tokio::test]
    async fn trail_filters_by_subject() {
        let sink = MemoryAuditSink::new();
        record_sample(&sink, "deal-1").await;
        record_sample(&sink, "deal-2").await;
        record_sample(&sink, "deal-1").await;

        let trail = sink.trail("deal-1").await.unwrap();
        assert_eq!(trail.len(), 2);
        assert!(trail.iter().all(|e| e.subject_ref.id == "deal-1"));
    }
}
