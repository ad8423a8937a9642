use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Memo payload embedded in the anchoring transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorMemo {
    pub object_type: String,
    pub object_id: String,
    pub digest: String,
}

/// Pluggable ledger network client.
///
/// Implementations submit a minimal self-transfer carrying the memo and
/// report confirmation through the network's own finality semantics.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn network(&self) -> &'static str;

    /// Whether signing credentials are configured for this network. Without
    /// them the anchor request stays in dry-run.
    fn has_credentials(&self) -> bool;

    async fn submit(&self, memo: &AnchorMemo) -> Result<String, EngineError>;

    async fn check_confirmation(&self, tx_hash: &str) -> Result<bool, EngineError>;
}

/// Registry of ledger clients keyed by network name.
#[derive(Default)]
pub struct LedgerRegistry {
    clients: HashMap<String, Arc<dyn LedgerClient>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, client: Arc<dyn LedgerClient>) {
        self.clients.insert(client.network().to_string(), client);
    }

    pub fn get(&self, network: &str) -> Option<Arc<dyn LedgerClient>> {
        self.clients.get(network).cloned()
    }

    pub fn has(&self, network: &str) -> bool {
        self.clients.contains_key(network)
    }
}
