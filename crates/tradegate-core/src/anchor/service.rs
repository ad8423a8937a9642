use crate::anchor::canonical::canonical_digest;
use crate::anchor::chain::{AnchorMemo, LedgerRegistry};
use crate::audit::{AuditAction, AuditSink, SubjectRef};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-chain submission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

/// One chain's view of an anchor request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSubmission {
    pub network: String,
    pub tx_hash: Option<String>,
    pub status: ChainStatus,
    pub detail: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Aggregate anchor state across its requested chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

/// Tamper-evident timestamp record for one object state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofAnchor {
    pub anchor_id: String,
    pub object_type: String,
    pub object_id: String,
    /// SHA-256 hex digest over the canonicalized object.
    pub canonical_hash: String,
    pub requested_chains: Vec<String>,
    pub submissions: BTreeMap<String, ChainSubmission>,
    pub status: AnchorStatus,
    pub requested_at: DateTime<Utc>,
}

impl ProofAnchor {
    /// Recompute the aggregate from per-chain states: confirmed only when
    /// every requested chain confirmed; failed only when every requested
    /// chain failed; pending when nothing went out (dry-run); submitted
    /// otherwise.
    fn recompute_status(&mut self) {
        let submissions: Vec<&ChainSubmission> = self.submissions.values().collect();
        if submissions.is_empty() {
            self.status = AnchorStatus::Pending;
            return;
        }

        if submissions.iter().all(|s| s.status == ChainStatus::Confirmed) {
            self.status = AnchorStatus::Confirmed;
        } else if submissions.iter().all(|s| s.status == ChainStatus::Failed) {
            self.status = AnchorStatus::Failed;
        } else if submissions.iter().all(|s| s.status == ChainStatus::Pending) {
            self.status = AnchorStatus::Pending;
        } else {
            self.status = AnchorStatus::Submitted;
        }
    }
}

/// Anchoring front end: canonicalize, hash, submit per chain, track state.
///
/// Callers treat `anchor` as fire-and-forget-with-status and poll through
/// `refresh`; nothing here blocks on ledger finality.
pub struct AnchorService {
    registry: LedgerRegistry,
    audit: Arc<dyn AuditSink>,
    anchors: RwLock<BTreeMap<String, ProofAnchor>>,
}

impl AnchorService {
    pub fn new(registry: LedgerRegistry, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            registry,
            audit,
            anchors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Anchor one object state to the requested chains.
    pub async fn anchor(
        &self,
        object_type: &str,
        object_id: &str,
        object_data: &serde_json::Value,
        requested_chains: &[String],
    ) -> Result<ProofAnchor, EngineError> {
        if requested_chains.is_empty() {
            return Err(EngineError::Validation(
                "at least one chain must be requested".to_string(),
            ));
        }

        let canonical_hash = canonical_digest(object_data)?;
        let memo = AnchorMemo {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            digest: canonical_hash.clone(),
        };

        let mut anchor = ProofAnchor {
            anchor_id: Uuid::new_v4().to_string(),
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            canonical_hash,
            requested_chains: requested_chains.to_vec(),
            submissions: BTreeMap::new(),
            status: AnchorStatus::Pending,
            requested_at: Utc::now(),
        };

        // Each chain is an isolated side effect; outcomes never interact.
        for network in requested_chains {
            let submission = self.submit_to_chain(network, &memo).await;
            self.audit_submission(&anchor, &submission).await;
            anchor.submissions.insert(network.clone(), submission);
        }

        anchor.recompute_status();
        info!(
            anchor_id = %anchor.anchor_id,
            object_id,
            status = ?anchor.status,
            "anchor request processed"
        );

        self.anchors
            .write()
            .insert(anchor.anchor_id.clone(), anchor.clone());
        Ok(anchor)
    }

    pub fn get(&self, anchor_id: &str) -> Result<ProofAnchor, EngineError> {
        self.anchors
            .read()
            .get(anchor_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("anchor", anchor_id))
    }

    /// Poll submitted chains for confirmation and recompute the aggregate.
    pub async fn refresh(&self, anchor_id: &str) -> Result<ProofAnchor, EngineError> {
        let mut anchor = self.get(anchor_id)?;

        for submission in anchor.submissions.values_mut() {
            if submission.status != ChainStatus::Submitted {
                continue;
            }
            let (Some(client), Some(tx_hash)) = (
                self.registry.get(&submission.network),
                submission.tx_hash.as_deref(),
            ) else {
                continue;
            };

            match client.check_confirmation(tx_hash).await {
                Ok(true) => submission.status = ChainStatus::Confirmed,
                Ok(false) => {}
                Err(err) => {
                    // Transient lookup failures leave the submission as-is;
                    // the transaction may still confirm later.
                    warn!(network = %submission.network, error = %err, "confirmation check failed");
                }
            }
        }

        anchor.recompute_status();
        self.anchors
            .write()
            .insert(anchor.anchor_id.clone(), anchor.clone());
        Ok(anchor)
    }

    async fn submit_to_chain(&self, network: &str, memo: &AnchorMemo) -> ChainSubmission {
        let client = match self.registry.get(network) {
            Some(client) => client,
            None => {
                return ChainSubmission {
                    network: network.to_string(),
                    tx_hash: None,
                    status: ChainStatus::Failed,
                    detail: Some(format!("no ledger client registered for '{}'", network)),
                    submitted_at: None,
                };
            }
        };

        if !client.has_credentials() {
            // Explicit dry-run: the request is persisted, nothing is sent.
            return ChainSubmission {
                network: network.to_string(),
                tx_hash: None,
                status: ChainStatus::Pending,
                detail: Some("no signing credentials configured; dry-run".to_string()),
                submitted_at: None,
            };
        }

        match client.submit(memo).await {
            Ok(tx_hash) => ChainSubmission {
                network: network.to_string(),
                tx_hash: Some(tx_hash),
                status: ChainStatus::Submitted,
                detail: None,
                submitted_at: Some(Utc::now()),
            },
            Err(err) => {
                warn!(network, error = %err, "ledger submission failed");
                ChainSubmission {
                    network: network.to_string(),
                    tx_hash: None,
                    status: ChainStatus::Failed,
                    detail: Some(err.to_string()),
                    submitted_at: None,
                }
            }
        }
    }

    async fn audit_submission(&self, anchor: &ProofAnchor, submission: &ChainSubmission) {
        let mut metadata = BTreeMap::new();
        metadata.insert("anchor_id".to_string(), serde_json::json!(anchor.anchor_id));
        metadata.insert("network".to_string(), serde_json::json!(submission.network));
        metadata.insert("status".to_string(), serde_json::json!(submission.status));
        metadata.insert(
            "canonical_hash".to_string(),
            serde_json::json!(anchor.canonical_hash),
        );
        if let Some(tx_hash) = &submission.tx_hash {
            metadata.insert("tx_hash".to_string(), serde_json::json!(tx_hash));
        }

        if let Err(err) = self
            .audit
            .record(
                "system:anchor",
                AuditAction::AnchorSubmitted,
                SubjectRef::object(anchor.object_type.clone(), anchor.object_id.clone()),
                metadata,
            )
            .await
        {
            warn!(error = %err, "audit write failed for anchor submission");
        }
    }
}
