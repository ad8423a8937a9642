use crate::finding::{Flag, FlagType, Severity};
use crate::subject::{PaymentTerms, Proposal};

use super::RuleContext;

/// Proposal screening thresholds.
#[derive(Debug, Clone)]
pub struct ProposalRuleConfig {
    /// Margin below this percentage is a blocking error.
    pub min_margin_percent: f64,
    /// Margin below this (and at/above the minimum) is a warning.
    pub warn_margin_percent: f64,
    /// Credit score required to extend net-30 terms.
    pub net30_min_score: u8,
    /// Credit score required to extend net-15 terms.
    pub net15_min_score: u8,
    /// High-value advisory threshold in minor units.
    pub high_value_minor: u64,
    /// Scores below this are considered marginal credit.
    pub marginal_score: u8,
    /// Fields every proposal must carry.
    pub required_fields: Vec<String>,
}

impl Default for ProposalRuleConfig {
    fn default() -> Self {
        Self {
            min_margin_percent: 15.0,
            warn_margin_percent: 20.0,
            net30_min_score: 80,
            net15_min_score: 65,
            // $10,000.00
            high_value_minor: 1_000_000,
            marginal_score: 70,
            required_fields: vec![
                "commodity".to_string(),
                "quantity".to_string(),
                "delivery_terms".to_string(),
                "validity".to_string(),
            ],
        }
    }
}

impl ProposalRuleConfig {
    /// Most generous payment terms the score bands support.
    pub fn recommended_terms(&self, score: Option<u8>) -> PaymentTerms {
        match score {
            Some(score) if score >= self.net30_min_score => PaymentTerms::Net30,
            Some(score) if score >= self.net15_min_score => PaymentTerms::Net15,
            // No score on file reads as no demonstrated credit.
            _ => PaymentTerms::Prepay,
        }
    }
}

/// Evaluate a commercial proposal.
///
/// Rule order is fixed: payment terms vs credit score, margin, required
/// fields, high-value-with-marginal-credit advisory.
pub fn evaluate_proposal(proposal: &Proposal, ctx: &RuleContext) -> Vec<Flag> {
    let config = &ctx.config.proposal;
    let mut flags = Vec::new();

    let recommended = config.recommended_terms(proposal.counterparty_score);
    if proposal.payment_terms.rank() > recommended.rank() {
        let scored = proposal
            .counterparty_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        flags.push(
            Flag::new(
                FlagType::ValueThreshold,
                Severity::High,
                format!(
                    "proposed terms {} exceed {} recommended for credit score {}",
                    proposal.payment_terms.name(),
                    recommended.name(),
                    scored
                ),
            )
            .with_recommendation(format!("tighten terms to {} or escalate", recommended.name()))
            .with_metadata("proposed_rank", proposal.payment_terms.rank())
            .with_metadata("recommended_rank", recommended.rank())
            .needs_review(),
        );
    }

    if proposal.counterparty_score.is_none() {
        flags.push(
            Flag::new(
                FlagType::Documentation,
                Severity::Medium,
                format!("no credit score on file for '{}'", proposal.counterparty),
            )
            .with_recommendation("request a credit assessment from the pricing desk")
            .needs_review(),
        );
    }

    if proposal.margin_percent < config.min_margin_percent {
        flags.push(
            Flag::new(
                FlagType::ValueThreshold,
                Severity::High,
                format!(
                    "margin {:.1}% is below the {:.0}% floor",
                    proposal.margin_percent, config.min_margin_percent
                ),
            )
            .with_recommendation("reprice or obtain a documented margin exception")
            .needs_review()
            .blocking(),
        );
    } else if proposal.margin_percent < config.warn_margin_percent {
        flags.push(
            Flag::new(
                FlagType::ValueThreshold,
                Severity::Medium,
                format!(
                    "margin {:.1}% is inside the {:.0}-{:.0}% caution band",
                    proposal.margin_percent, config.min_margin_percent, config.warn_margin_percent
                ),
            )
            .with_recommendation("confirm the margin holds after logistics costs"),
        );
    }

    let missing: Vec<&str> = config
        .required_fields
        .iter()
        .filter(|field| {
            proposal
                .fields
                .get(field.as_str())
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|field| field.as_str())
        .collect();
    if !missing.is_empty() {
        flags.push(
            Flag::new(
                FlagType::Documentation,
                Severity::Medium,
                format!("proposal is missing required field(s): {}", missing.join(", ")),
            )
            .with_recommendation("complete the proposal before sending to the counterparty")
            .with_metadata("missing_fields", missing)
            .needs_review(),
        );
    }

    if proposal.value_minor > config.high_value_minor {
        if let Some(score) = proposal.counterparty_score {
            if score < config.marginal_score {
                flags.push(
                    Flag::new(
                        FlagType::ValueThreshold,
                        Severity::Low,
                        format!(
                            "high-value proposal against marginal credit (score {})",
                            score
                        ),
                    )
                    .with_recommendation("consider credit insurance or a reduced first tranche"),
                );
            }
        }
    }

    flags
}
