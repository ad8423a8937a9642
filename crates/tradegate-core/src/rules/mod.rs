//! Pure, deterministic rule evaluation.
//!
//! `evaluate` is a total function from (subject, reference data, context) to
//! an ordered flag list. Rules run in a fixed order, never perform I/O, and
//! model missing reference rows as flags rather than errors, so evaluating
//! the same input twice yields identical output.

pub mod deal;
pub mod instrument;
pub mod proposal;

use crate::finding::Flag;
use crate::reference::ReferenceData;
use crate::subject::{Subject, SubjectBody};
use chrono::{DateTime, Utc};

pub use deal::DealRuleConfig;
pub use instrument::InstrumentRuleConfig;
pub use proposal::ProposalRuleConfig;

/// Threshold configuration for every rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    pub deal: DealRuleConfig,
    pub instrument: InstrumentRuleConfig,
    pub proposal: ProposalRuleConfig,
}

/// Explicit evaluation context.
///
/// The clock is injected here instead of read ambiently so expiry and
/// AML-window rules stay pure and testable against a fixed instant.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub now: DateTime<Utc>,
    pub config: RuleConfig,
}

impl RuleContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            config: RuleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuleConfig) -> Self {
        self.config = config;
        self
    }
}

/// Run the rule set applicable to the subject kind.
pub fn evaluate(subject: &Subject, reference: &ReferenceData, ctx: &RuleContext) -> Vec<Flag> {
    match &subject.body {
        SubjectBody::Deal(deal) => deal::evaluate_deal(deal, reference, ctx),
        SubjectBody::Instrument(instrument) => instrument::evaluate_instrument(instrument, ctx),
        SubjectBody::Proposal(proposal) => proposal::evaluate_proposal(proposal, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{JurisdictionProfile, ReferenceData, SanctionsTier};
    use crate::subject::{Deal, Incoterm, Subject, SubjectBody};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn evaluation_is_deterministic_across_runs() {
        let reference = ReferenceData::new()
            .with_jurisdiction(JurisdictionProfile::new("IR", SanctionsTier::Critical))
            .with_jurisdiction(JurisdictionProfile::new("CH", SanctionsTier::Low));

        let subject = Subject::new(SubjectBody::Deal(Deal {
            commodity_id: "unknown-commodity".to_string(),
            quantity_mt: 1_000.0,
            value_minor: 12_000_000,
            currency: "USD".to_string(),
            origin_country: "CH".to_string(),
            destination_country: "IR".to_string(),
            incoterm: Incoterm::Ddp,
        }));

        let ctx = RuleContext::at(fixed_now());
        let first = evaluate(&subject, &reference, &ctx);
        let second = evaluate(&subject, &reference, &ctx);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
