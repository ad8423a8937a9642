use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Policy area a flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    Sanctions,
    ExportControl,
    Licensing,
    Aml,
    Documentation,
    IncotermObligation,
    ValueThreshold,
    CommodityRestriction,
    FieldFormat,
    FieldMismatch,
    Expiry,
}

/// Ordered severity scale. Ordering is relied on by callers ranking findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One rule's verdict on a subject.
///
/// A `Flag` is the pure evaluator output: it carries no identifier and no
/// timestamp, so evaluating the same subject against the same reference data
/// twice yields byte-identical ordered flags. Severity and the blocking bit
/// are set independently by each rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub flag_type: FlagType,
    pub severity: Severity,
    pub message: String,
    pub recommendation: Option<String>,
    pub requires_human_review: bool,
    pub blocks_execution: bool,
    /// Open detail map; external collaborators may contribute unknown keys.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Flag {
    pub fn new(flag_type: FlagType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            flag_type,
            severity,
            message: message.into(),
            recommendation: None,
            requires_human_review: false,
            blocks_execution: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocks_execution = true;
        self
    }

    pub fn needs_review(mut self) -> Self {
        self.requires_human_review = true;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }
}

/// Reviewer identity and notes attached when a finding is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolver: String,
    pub notes: String,
    pub resolved_at: DateTime<Utc>,
}

/// A persisted flag. Immutable once created; resolution is the only
/// permitted mutation and only appends reviewer identity and notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: String,
    pub subject_id: String,
    #[serde(flatten)]
    pub flag: Flag,
    pub recorded_at: DateTime<Utc>,
    pub resolution: Option<Resolution>,
}

impl Finding {
    /// Wrap a pure flag for persistence under a subject.
    pub fn record(subject_id: impl Into<String>, flag: Flag) -> Self {
        Self {
            finding_id: Uuid::new_v4().to_string(),
            subject_id: subject_id.into(),
            flag,
            recorded_at: Utc::now(),
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// An unresolved blocking finding is what holds a subject.
    pub fn holds_subject(&self) -> bool {
        self.flag.blocks_execution && !self.is_resolved()
    }

    /// Attach a resolution. Fails if the finding is already resolved; the
    /// original flag content is never edited.
    pub fn resolve(
        &mut self,
        resolver: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<(), EngineError> {
        if self.is_resolved() {
            return Err(EngineError::Precondition(format!(
                "finding '{}' is already resolved",
                self.finding_id
            )));
        }
        self.resolution = Some(Resolution {
            resolver: resolver.into(),
            notes: notes.into(),
            resolved_at: Utc::now(),
        });
        Ok(())
    }
}
