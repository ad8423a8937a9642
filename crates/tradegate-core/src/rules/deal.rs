use crate::finding::{Flag, FlagType, Severity};
use crate::reference::{ReferenceData, SanctionsTier};
use crate::subject::{Deal, Incoterm};
use std::collections::BTreeSet;

use super::RuleContext;

/// Deal screening thresholds, in minor units (cents).
#[derive(Debug, Clone)]
pub struct DealRuleConfig {
    /// Advisory threshold for possible reporting obligations.
    pub reporting_advisory_minor: u64,
    /// Enhanced due diligence kicks in at this value.
    pub enhanced_diligence_minor: u64,
    /// Regulatory reporting consideration kicks in at this value.
    pub reporting_consideration_minor: u64,
}

impl Default for DealRuleConfig {
    fn default() -> Self {
        Self {
            // $10,000.00
            reporting_advisory_minor: 1_000_000,
            // $50,000.00
            enhanced_diligence_minor: 5_000_000,
            // $100,000.00
            reporting_consideration_minor: 10_000_000,
        }
    }
}

/// Evaluate a deal against jurisdiction and commodity reference data.
///
/// Rule order is fixed: destination sanctions, origin sanctions, AML value
/// thresholds, commodity restriction, incoterm advisory, required documents,
/// reporting advisory.
pub fn evaluate_deal(deal: &Deal, reference: &ReferenceData, ctx: &RuleContext) -> Vec<Flag> {
    let config = &ctx.config.deal;
    let mut flags = Vec::new();

    sanctions_flag(&mut flags, reference, &deal.destination_country, "destination");
    sanctions_flag(&mut flags, reference, &deal.origin_country, "origin");

    if deal.value_minor >= config.enhanced_diligence_minor {
        flags.push(
            Flag::new(
                FlagType::Aml,
                Severity::High,
                format!(
                    "deal value {} {} meets the enhanced due diligence threshold",
                    format_minor(deal.value_minor),
                    deal.currency
                ),
            )
            .with_recommendation(
                "perform enhanced counterparty due diligence and retain supporting evidence",
            )
            .needs_review(),
        );
    }

    if deal.value_minor >= config.reporting_consideration_minor {
        flags.push(
            Flag::new(
                FlagType::Aml,
                Severity::High,
                format!(
                    "deal value {} {} meets the regulatory reporting consideration threshold",
                    format_minor(deal.value_minor),
                    deal.currency
                ),
            )
            .with_recommendation("assess whether a regulatory transaction report is required")
            .needs_review(),
        );
    }

    match reference.commodity(&deal.commodity_id) {
        None => {
            flags.push(
                Flag::new(
                    FlagType::CommodityRestriction,
                    Severity::High,
                    format!(
                        "commodity '{}' is not present in the commodity reference table",
                        deal.commodity_id
                    ),
                )
                .with_recommendation("have compliance classify the commodity before clearance")
                .needs_review()
                .blocking(),
            );
        }
        Some(profile) if profile.restricted => {
            let reason = profile
                .restriction_reason
                .as_deref()
                .unwrap_or("restricted by compliance policy");
            flags.push(
                Flag::new(
                    FlagType::CommodityRestriction,
                    Severity::High,
                    format!("commodity '{}' is restricted: {}", profile.name, reason),
                )
                .with_recommendation("confirm licensing position with the export control desk")
                .needs_review()
                .blocking(),
            );
        }
        Some(_) => {}
    }

    incoterm_flag(&mut flags, &deal.incoterm);

    let documents = required_documents(deal, reference);
    if !documents.is_empty() {
        let listed = documents.iter().cloned().collect::<Vec<_>>();
        flags.push(
            Flag::new(
                FlagType::Documentation,
                Severity::Medium,
                format!(
                    "shipment requires {} document(s): {}",
                    listed.len(),
                    listed.join(", ")
                ),
            )
            .with_recommendation("collect the listed documents before execution")
            .with_metadata("required_documents", listed),
        );
    }

    if deal.value_minor >= config.reporting_advisory_minor
        && deal.value_minor < config.enhanced_diligence_minor
    {
        flags.push(
            Flag::new(
                FlagType::ValueThreshold,
                Severity::Low,
                format!(
                    "deal value {} {} is above the reporting advisory threshold",
                    format_minor(deal.value_minor),
                    deal.currency
                ),
            )
            .with_recommendation("no action required; kept for aggregate monitoring"),
        );
    }

    flags
}

fn sanctions_flag(flags: &mut Vec<Flag>, reference: &ReferenceData, country: &str, role: &str) {
    match reference.jurisdiction(country) {
        None => {
            flags.push(
                Flag::new(
                    FlagType::Sanctions,
                    Severity::High,
                    format!(
                        "{} jurisdiction '{}' is not present in the jurisdiction reference table",
                        role, country
                    ),
                )
                .with_recommendation("have compliance review and classify the jurisdiction")
                .needs_review(),
            );
        }
        Some(profile) => match profile.sanctions_tier {
            SanctionsTier::Critical => {
                flags.push(
                    Flag::new(
                        FlagType::Sanctions,
                        Severity::Critical,
                        format!(
                            "{} jurisdiction '{}' carries a critical sanctions-risk tier",
                            role, profile.country_code
                        ),
                    )
                    .with_recommendation("escalate to sanctions counsel; do not execute")
                    .needs_review()
                    .blocking(),
                );
            }
            SanctionsTier::High => {
                flags.push(
                    Flag::new(
                        FlagType::Sanctions,
                        Severity::High,
                        format!(
                            "{} jurisdiction '{}' carries a high sanctions-risk tier",
                            role, profile.country_code
                        ),
                    )
                    .with_recommendation("screen all parties against current sanctions lists")
                    .needs_review(),
                );
            }
            SanctionsTier::Medium => {
                flags.push(
                    Flag::new(
                        FlagType::Sanctions,
                        Severity::Medium,
                        format!(
                            "{} jurisdiction '{}' carries a medium sanctions-risk tier",
                            role, profile.country_code
                        ),
                    )
                    .with_recommendation("verify counterparty screening is current"),
                );
            }
            SanctionsTier::Low => {}
        },
    }
}

fn incoterm_flag(flags: &mut Vec<Flag>, incoterm: &Incoterm) {
    // Informational obligations only; incoterm advisories never block.
    let flag = match incoterm {
        Incoterm::Ddp => Some(
            Flag::new(
                FlagType::IncotermObligation,
                Severity::Medium,
                "DDP places import clearance, duties, and taxes on the seller",
            )
            .with_recommendation("confirm destination import licensing and duty funding"),
        ),
        Incoterm::Fob => Some(
            Flag::new(
                FlagType::IncotermObligation,
                Severity::Low,
                "FOB transfers risk at the load port; confirm marine insurance is arranged",
            ),
        ),
        Incoterm::Cif => Some(
            Flag::new(
                FlagType::IncotermObligation,
                Severity::Low,
                "CIF requires seller-arranged freight and minimum-cover insurance",
            ),
        ),
        Incoterm::Exw => Some(
            Flag::new(
                FlagType::IncotermObligation,
                Severity::Low,
                "EXW places export clearance on the buyer; confirm the buyer can export",
            ),
        ),
        Incoterm::Other(_) => None,
    };
    if let Some(flag) = flag {
        flags.push(flag);
    }
}

fn required_documents(deal: &Deal, reference: &ReferenceData) -> BTreeSet<String> {
    let mut documents = BTreeSet::new();
    for country in [&deal.origin_country, &deal.destination_country] {
        if let Some(profile) = reference.jurisdiction(country) {
            documents.extend(profile.required_documents.iter().cloned());
        }
    }
    if let Some(profile) = reference.commodity(&deal.commodity_id) {
        documents.extend(profile.required_documents.iter().cloned());
    }
    documents
}

fn format_minor(value_minor: u64) -> String {
    format!("{}.{:02}", value_minor / 100, value_minor % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{CommodityProfile, JurisdictionProfile};
    use chrono::TimeZone;
    use chrono::Utc;

    fn ctx() -> RuleContext {
        RuleContext::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn reference() -> ReferenceData {
        ReferenceData::new()
            .with_jurisdiction(
                JurisdictionProfile::new("KP", SanctionsTier::Critical)
                    .with_required_documents(&["end-user certificate"]),
            )
            .with_jurisdiction(JurisdictionProfile::new("SY", SanctionsTier::High))
            .with_jurisdiction(JurisdictionProfile::new("EG", SanctionsTier::Medium))
            .with_jurisdiction(
                JurisdictionProfile::new("CH", SanctionsTier::Low)
                    .with_required_documents(&["certificate of origin"]),
            )
            .with_commodity(
                CommodityProfile::new("wheat-milling", "Milling wheat", "agri", "1001.99")
                    .with_required_documents(&["phytosanitary certificate"]),
            )
            .with_commodity(
                CommodityProfile::new("uranium-ore", "Uranium ore", "nuclear", "2612.10")
                    .restricted("dual-use nuclear material"),
            )
    }

    fn deal(value_minor: u64, destination: &str, commodity: &str, incoterm: Incoterm) -> Deal {
        Deal {
            commodity_id: commodity.to_string(),
            quantity_mt: 100.0,
            value_minor,
            currency: "USD".to_string(),
            origin_country: "CH".to_string(),
            destination_country: destination.to_string(),
            incoterm,
        }
    }

    #[test]
    fn critical_destination_unknown_commodity_high_value_scenario() {
        // $120,000 DDP into a critical-tier destination with an unknown commodity.
        let deal = deal(12_000_000, "KP", "no-such-commodity", Incoterm::Ddp);
        let flags = evaluate_deal(&deal, &reference(), &ctx());

        let sanctions = flags
            .iter()
            .find(|f| f.flag_type == FlagType::Sanctions && f.severity == Severity::Critical)
            .expect("critical sanctions flag");
        assert!(sanctions.blocks_execution);

        let aml: Vec<_> = flags
            .iter()
            .filter(|f| f.flag_type == FlagType::Aml && f.severity == Severity::High)
            .collect();
        assert_eq!(aml.len(), 2, "both AML thresholds crossed at $120k");

        let commodity = flags
            .iter()
            .find(|f| f.flag_type == FlagType::CommodityRestriction)
            .expect("commodity unknown flag");
        assert_eq!(commodity.severity, Severity::High);
        assert!(commodity.blocks_execution);

        assert!(flags.len() >= 3);
    }

    #[test]
    fn restricted_commodity_blocks() {
        let deal = deal(2_000_000, "CH", "uranium-ore", Incoterm::Fob);
        let flags = evaluate_deal(&deal, &reference(), &ctx());

        let restriction = flags
            .iter()
            .find(|f| f.flag_type == FlagType::CommodityRestriction)
            .unwrap();
        assert!(restriction.blocks_execution);
        assert!(restriction.message.contains("dual-use"));
    }

    #[test]
    fn incoterm_advisories_never_block() {
        for incoterm in [Incoterm::Ddp, Incoterm::Fob, Incoterm::Cif, Incoterm::Exw] {
            let deal = deal(500_000, "CH", "wheat-milling", incoterm);
            let flags = evaluate_deal(&deal, &reference(), &ctx());
            let advisory = flags
                .iter()
                .find(|f| f.flag_type == FlagType::IncotermObligation)
                .unwrap();
            assert!(!advisory.blocks_execution);
        }
    }

    #[test]
    fn reporting_advisory_band_is_low_and_exclusive() {
        // $12,000: above the advisory floor, below enhanced due diligence.
        let deal_low = deal(1_200_000, "CH", "wheat-milling", Incoterm::Fob);
        let flags = evaluate_deal(&deal_low, &reference(), &ctx());

        let advisory = flags
            .iter()
            .find(|f| f.flag_type == FlagType::ValueThreshold)
            .unwrap();
        assert_eq!(advisory.severity, Severity::Low);
        assert!(flags.iter().all(|f| f.flag_type != FlagType::Aml));

        // $50,000 exactly: enhanced due diligence, no low advisory.
        let deal = deal(5_000_000, "CH", "wheat-milling", Incoterm::Fob);
        let flags = evaluate_deal(&deal, &reference(), &ctx());
        assert!(flags.iter().any(|f| f.flag_type == FlagType::Aml));
        assert!(flags.iter().all(|f| f.flag_type != FlagType::ValueThreshold));
    }

    #[test]
    fn required_documents_aggregate_across_jurisdictions_and_commodity() {
        let deal = deal(500_000, "KP", "wheat-milling", Incoterm::Fob);
        let flags = evaluate_deal(&deal, &reference(), &ctx());

        let documentation = flags
            .iter()
            .find(|f| f.flag_type == FlagType::Documentation)
            .unwrap();
        assert!(documentation.message.contains("certificate of origin"));
        assert!(documentation.message.contains("end-user certificate"));
        assert!(documentation.message.contains("phytosanitary certificate"));
        assert!(!documentation.blocks_execution);
    }

    #[test]
    fn medium_tier_destination_yields_medium_non_blocking() {
        let deal = deal(500_000, "EG", "wheat-milling", Incoterm::Fob);
        let flags = evaluate_deal(&deal, &reference(), &ctx());
        let sanctions = flags
            .iter()
            .find(|f| f.flag_type == FlagType::Sanctions)
            .unwrap();
        assert_eq!(sanctions.severity, Severity::Medium);
        assert!(!sanctions.blocks_execution);
    }
}
