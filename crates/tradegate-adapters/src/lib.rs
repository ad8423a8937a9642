//! Deterministic collaborator adapters for tradegate.
//!
//! Ledger clients and document analysts used by tests and local
//! orchestration. Behavior is fixed so flows exercising them replay
//! identically.

#![deny(unsafe_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use tradegate_core::analyst::{AdvisoryNote, DocumentAnalyst};
use tradegate_core::anchor::{AnchorMemo, LedgerClient};
use tradegate_core::error::EngineError;

/// Deterministic ledger client for local anchoring.
///
/// Transaction ids derive from the network name and a submission counter,
/// so repeated runs produce the same sequence.
pub struct MockLedgerClient {
    network: &'static str,
    credentials: bool,
    auto_confirm: bool,
    submissions: Mutex<u64>,
}

impl MockLedgerClient {
    pub fn new(network: &'static str) -> Self {
        Self {
            network,
            credentials: true,
            auto_confirm: true,
            submissions: Mutex::new(0),
        }
    }

    /// Simulate a deployment with no signing credentials (dry-run mode).
    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// Leave submissions unconfirmed until the test confirms them.
    pub fn without_auto_confirm(mut self) -> Self {
        self.auto_confirm = false;
        self
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    fn network(&self) -> &'static str {
        self.network
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn submit(&self, memo: &AnchorMemo) -> Result<String, EngineError> {
        let mut submissions = self.submissions.lock();
        *submissions += 1;
        Ok(format!(
            "{}-tx-{:04}-{}",
            self.network,
            *submissions,
            &memo.digest[..8.min(memo.digest.len())]
        ))
    }

    async fn check_confirmation(&self, _tx_hash: &str) -> Result<bool, EngineError> {
        Ok(self.auto_confirm)
    }
}

/// Ledger client that fails every submission, for chaos flows.
pub struct FailingLedgerClient {
    network: &'static str,
    reason: String,
}

impl FailingLedgerClient {
    pub fn new(network: &'static str, reason: impl Into<String>) -> Self {
        Self {
            network,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LedgerClient for FailingLedgerClient {
    fn network(&self) -> &'static str {
        self.network
    }

    fn has_credentials(&self) -> bool {
        true
    }

    async fn submit(&self, _memo: &AnchorMemo) -> Result<String, EngineError> {
        Err(EngineError::external(self.network, self.reason.clone()))
    }

    async fn check_confirmation(&self, _tx_hash: &str) -> Result<bool, EngineError> {
        Err(EngineError::external(self.network, self.reason.clone()))
    }
}

/// Document analyst returning a fixed set of advisory notes.
pub struct ScriptedAnalyst {
    notes: Vec<AdvisoryNote>,
}

impl ScriptedAnalyst {
    pub fn new(notes: Vec<AdvisoryNote>) -> Self {
        Self { notes }
    }

    /// A single generic note, enough for most flows.
    pub fn single(message: impl Into<String>) -> Self {
        Self::new(vec![AdvisoryNote {
            message: message.into(),
            recommendation: None,
            details: Default::default(),
        }])
    }
}

#[async_trait]
impl DocumentAnalyst for ScriptedAnalyst {
    async fn review_document(
        &self,
        _subject_id: &str,
        _raw_text: &str,
    ) -> Result<Vec<AdvisoryNote>, EngineError> {
        Ok(self.notes.clone())
    }
}

/// Document analyst that always fails, for downgrade-path flows.
#[derive(Default)]
pub struct UnavailableAnalyst;

#[async_trait]
impl DocumentAnalyst for UnavailableAnalyst {
    async fn review_document(
        &self,
        _subject_id: &str,
        _raw_text: &str,
    ) -> Result<Vec<AdvisoryNote>, EngineError> {
        Err(EngineError::external("text-gen", "service unavailable"))
    }
}
