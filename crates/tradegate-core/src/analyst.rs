use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One suggestion from the text-generation collaborator's read of an
/// unstructured document. The detail map is open: the collaborator may
/// return fields this engine does not know about, and they are carried
/// through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryNote {
    pub message: String,
    pub recommendation: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

/// External text-generation collaborator, consumed as a black box.
///
/// Output is additive and advisory only: the engine converts notes into
/// non-blocking, capped-severity flags and never lets them decide a
/// terminal state.
#[async_trait]
pub trait DocumentAnalyst: Send + Sync {
    async fn review_document(
        &self,
        subject_id: &str,
        raw_text: &str,
    ) -> Result<Vec<AdvisoryNote>, EngineError>;
}
