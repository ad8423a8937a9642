use crate::error::EngineError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Screening gate status shared by every subject kind.
///
/// The automated evaluation path can only produce `UnderReview` or
/// `Rejected`; `Approved` is reachable exclusively through an explicit
/// human decision recorded against a subject currently in `UnderReview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Unscreened,
    UnderReview,
    Rejected,
    Approved,
}

impl GateStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unscreened => "unscreened",
            Self::UnderReview => "under_review",
            Self::Rejected => "rejected",
            Self::Approved => "approved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Deal,
    Instrument,
    Proposal,
}

impl SubjectKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Instrument => "instrument",
            Self::Proposal => "proposal",
        }
    }

    /// Domain wording for the terminal positive state of this kind.
    pub fn approved_label(self) -> &'static str {
        match self {
            Self::Deal => "cleared",
            Self::Instrument => "verified",
            Self::Proposal => "approved",
        }
    }
}

/// Delivery terms on a physical deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Incoterm {
    Exw,
    Fob,
    Cif,
    Ddp,
    Other(String),
}

/// Physical commodity trade entering screening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub commodity_id: String,
    pub quantity_mt: f64,
    /// Contract value in minor units (cents).
    pub value_minor: u64,
    pub currency: String,
    pub origin_country: String,
    pub destination_country: String,
    pub incoterm: Incoterm,
}

/// Expected terms snapshot an instrument is cross-checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedTerms {
    pub amount_minor: u64,
    pub currency: String,
    pub beneficiary: Option<String>,
}

/// Banking instrument (letter of credit, guarantee) under verification.
/// Fields are optional because instruments frequently arrive as partially
/// parsed documents; absent fields are screened as findings, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_type: String,
    pub amount_minor: Option<u64>,
    pub currency: Option<String>,
    pub bic: Option<String>,
    pub beneficiary: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub raw_text: Option<String>,
    pub expected: Option<ExpectedTerms>,
}

/// Payment terms ladder, ordered by credit exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    Prepay,
    Net15,
    Net30,
}

impl PaymentTerms {
    /// Exposure rank: prepay(0) < net-15(1) < net-30(2).
    pub fn rank(self) -> u8 {
        match self {
            Self::Prepay => 0,
            Self::Net15 => 1,
            Self::Net30 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Prepay => "prepay",
            Self::Net15 => "net-15",
            Self::Net30 => "net-30",
        }
    }
}

/// Commercial proposal awaiting approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub counterparty: String,
    pub value_minor: u64,
    pub currency: String,
    pub margin_percent: f64,
    pub payment_terms: PaymentTerms,
    /// 0..100 counterparty credit score from the pricing desk, when on file.
    pub counterparty_score: Option<u8>,
    pub fields: BTreeMap<String, String>,
}

/// Kind-specific payload of a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectBody {
    Deal(Deal),
    Instrument(Instrument),
    Proposal(Proposal),
}

impl SubjectBody {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::Deal(_) => SubjectKind::Deal,
            Self::Instrument(_) => SubjectKind::Instrument,
            Self::Proposal(_) => SubjectKind::Proposal,
        }
    }
}

/// An identified record moving through the screening gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    pub status: GateStatus,
    pub body: SubjectBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(body: SubjectBody) -> Self {
        let now = Utc::now();
        Self {
            subject_id: Uuid::new_v4().to_string(),
            status: GateStatus::Unscreened,
            body,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = subject_id.into();
        self
    }

    pub fn kind(&self) -> SubjectKind {
        self.body.kind()
    }

    /// Intake validation. Malformed subjects are rejected before any
    /// persistence; domain risk is the evaluator's job, not this one.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.subject_id.trim().is_empty() {
            return Err(EngineError::Validation("subject id is empty".to_string()));
        }

        match &self.body {
            SubjectBody::Deal(deal) => {
                if deal.currency.trim().is_empty() {
                    return Err(EngineError::Validation("deal currency is empty".to_string()));
                }
                if deal.commodity_id.trim().is_empty() {
                    return Err(EngineError::Validation(
                        "deal commodity id is empty".to_string(),
                    ));
                }
                if !deal.quantity_mt.is_finite() || deal.quantity_mt < 0.0 {
                    return Err(EngineError::Validation(format!(
                        "deal quantity '{}' is not a valid tonnage",
                        deal.quantity_mt
                    )));
                }
            }
            SubjectBody::Instrument(instrument) => {
                if instrument.instrument_type.trim().is_empty() {
                    return Err(EngineError::Validation(
                        "instrument type is empty".to_string(),
                    ));
                }
            }
            SubjectBody::Proposal(proposal) => {
                if proposal.currency.trim().is_empty() {
                    return Err(EngineError::Validation(
                        "proposal currency is empty".to_string(),
                    ));
                }
                if !proposal.margin_percent.is_finite() {
                    return Err(EngineError::Validation(
                        "proposal margin is not a number".to_string(),
                    ));
                }
                if let Some(score) = proposal.counterparty_score {
                    if score > 100 {
                        return Err(EngineError::Validation(format!(
                            "counterparty score {} exceeds 100",
                            score
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
