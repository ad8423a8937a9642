use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sanctions-risk tier assigned to a jurisdiction by compliance staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionsTier {
    Low,
    Medium,
    High,
    Critical,
}

impl SanctionsTier {
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Slowly-changing jurisdiction row, quarterly reviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub country_code: String,
    pub sanctions_tier: SanctionsTier,
    pub aml_notes: Option<String>,
    pub licensing_notes: Option<String>,
    pub required_documents: Vec<String>,
    pub source_urls: Vec<String>,
    pub last_reviewed_on: Option<NaiveDate>,
    pub reviewed_by: Option<String>,
}

impl JurisdictionProfile {
    pub fn new(country_code: impl Into<String>, sanctions_tier: SanctionsTier) -> Self {
        Self {
            country_code: country_code.into(),
            sanctions_tier,
            aml_notes: None,
            licensing_notes: None,
            required_documents: Vec::new(),
            source_urls: Vec::new(),
            last_reviewed_on: None,
            reviewed_by: None,
        }
    }

    pub fn with_required_documents(mut self, documents: &[&str]) -> Self {
        self.required_documents = documents.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_aml_notes(mut self, notes: impl Into<String>) -> Self {
        self.aml_notes = Some(notes.into());
        self
    }
}

/// Commodity row with restriction flag and category-implied paperwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityProfile {
    pub commodity_id: String,
    pub name: String,
    pub category: String,
    pub hs_code: String,
    pub restricted: bool,
    pub restriction_reason: Option<String>,
    pub required_documents: Vec<String>,
}

impl CommodityProfile {
    pub fn new(
        commodity_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        hs_code: impl Into<String>,
    ) -> Self {
        Self {
            commodity_id: commodity_id.into(),
            name: name.into(),
            category: category.into(),
            hs_code: hs_code.into(),
            restricted: false,
            restriction_reason: None,
            required_documents: Vec::new(),
        }
    }

    pub fn restricted(mut self, reason: impl Into<String>) -> Self {
        self.restricted = true;
        self.restriction_reason = Some(reason.into());
        self
    }

    pub fn with_required_documents(mut self, documents: &[&str]) -> Self {
        self.required_documents = documents.iter().map(|d| d.to_string()).collect();
        self
    }
}

/// Read-only reference snapshot handed to the evaluator.
///
/// Lookups return `Option`; a missing row is domain data the rules turn
/// into findings, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    jurisdictions: BTreeMap<String, JurisdictionProfile>,
    commodities: BTreeMap<String, CommodityProfile>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jurisdiction(mut self, profile: JurisdictionProfile) -> Self {
        self.jurisdictions
            .insert(profile.country_code.to_ascii_uppercase(), profile);
        self
    }

    pub fn with_commodity(mut self, profile: CommodityProfile) -> Self {
        self.commodities
            .insert(profile.commodity_id.clone(), profile);
        self
    }

    pub fn jurisdiction(&self, country_code: &str) -> Option<&JurisdictionProfile> {
        self.jurisdictions
            .get(&country_code.to_ascii_uppercase())
    }

    pub fn commodity(&self, commodity_id: &str) -> Option<&CommodityProfile> {
        self.commodities.get(commodity_id)
    }
}
