use crate::finding::{Flag, FlagType, Severity};
use crate::subject::Instrument;
use regex::Regex;
use std::sync::LazyLock;

use super::RuleContext;

/// SWIFT BIC: 6 letters, 2 alphanumerics, optional 3-char branch code.
static BIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$").expect("BIC pattern is valid")
});

/// Instrument verification thresholds.
#[derive(Debug, Clone)]
pub struct InstrumentRuleConfig {
    /// Expiring within this many days raises an advisory.
    pub expiry_warning_days: i64,
    /// Amount cross-check tolerance in minor units (one cent).
    pub amount_tolerance_minor: u64,
}

impl Default for InstrumentRuleConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: 30,
            amount_tolerance_minor: 1,
        }
    }
}

/// Evaluate a banking instrument.
///
/// Rule order is fixed: BIC format, expected-terms cross-checks, expiry.
/// The free-text document pass is not part of this function; it consults an
/// external collaborator and is appended separately by the engine as
/// advisory-only flags.
pub fn evaluate_instrument(instrument: &Instrument, ctx: &RuleContext) -> Vec<Flag> {
    let config = &ctx.config.instrument;
    let mut flags = Vec::new();

    match instrument.bic.as_deref() {
        None => {
            flags.push(
                Flag::new(
                    FlagType::FieldFormat,
                    Severity::Medium,
                    "no BIC present on the instrument",
                )
                .with_recommendation("obtain the issuing bank's BIC before verification")
                .needs_review(),
            );
        }
        Some(bic) if !BIC_PATTERN.is_match(bic) => {
            flags.push(
                Flag::new(
                    FlagType::FieldFormat,
                    Severity::Critical,
                    format!("BIC '{}' does not match the SWIFT BIC format", bic),
                )
                .with_recommendation("reject or re-request the instrument from the issuing bank")
                .needs_review()
                .blocking(),
            );
        }
        Some(_) => {}
    }

    if let Some(expected) = &instrument.expected {
        cross_check_flags(&mut flags, instrument, expected, config.amount_tolerance_minor);
    }

    if let Some(expiry) = instrument.expiry_date {
        let days_remaining = (expiry - ctx.now.date_naive()).num_days();
        if days_remaining < 0 {
            flags.push(
                Flag::new(
                    FlagType::Expiry,
                    Severity::Critical,
                    format!("instrument expired {} day(s) ago", -days_remaining),
                )
                .with_recommendation("request a re-issued instrument with a valid expiry")
                .with_metadata("days_remaining", days_remaining)
                .needs_review()
                .blocking(),
            );
        } else if days_remaining <= config.expiry_warning_days {
            flags.push(
                Flag::new(
                    FlagType::Expiry,
                    Severity::Medium,
                    format!("instrument expires in {} day(s)", days_remaining),
                )
                .with_recommendation("confirm shipment and presentation fit inside the validity window")
                .with_metadata("days_remaining", days_remaining)
                .needs_review(),
            );
        }
    }

    flags
}

fn cross_check_flags(
    flags: &mut Vec<Flag>,
    instrument: &Instrument,
    expected: &crate::subject::ExpectedTerms,
    tolerance_minor: u64,
) {
    match instrument.amount_minor {
        Some(amount) => {
            if amount.abs_diff(expected.amount_minor) > tolerance_minor {
                flags.push(
                    Flag::new(
                        FlagType::FieldMismatch,
                        Severity::Critical,
                        format!(
                            "instrument amount {} differs from expected {}",
                            amount, expected.amount_minor
                        ),
                    )
                    .with_recommendation("reconcile the amount with the underlying contract")
                    .needs_review()
                    .blocking(),
                );
            }
        }
        None => {
            flags.push(
                Flag::new(
                    FlagType::FieldMismatch,
                    Severity::Critical,
                    "instrument has no amount to check against the expected terms",
                )
                .with_recommendation("obtain the instrument amount from the issuing bank")
                .needs_review()
                .blocking(),
            );
        }
    }

    match instrument.currency.as_deref() {
        Some(currency) if currency == expected.currency => {}
        Some(currency) => {
            flags.push(
                Flag::new(
                    FlagType::FieldMismatch,
                    Severity::Critical,
                    format!(
                        "instrument currency '{}' differs from expected '{}'",
                        currency, expected.currency
                    ),
                )
                .needs_review()
                .blocking(),
            );
        }
        None => {
            flags.push(
                Flag::new(
                    FlagType::FieldMismatch,
                    Severity::Critical,
                    "instrument has no currency to check against the expected terms",
                )
                .needs_review()
                .blocking(),
            );
        }
    }

    if let (Some(actual), Some(expected_beneficiary)) =
        (instrument.beneficiary.as_deref(), expected.beneficiary.as_deref())
    {
        if actual != expected_beneficiary {
            flags.push(
                Flag::new(
                    FlagType::FieldMismatch,
                    Severity::Critical,
                    format!(
                        "beneficiary '{}' differs from expected '{}'",
                        actual, expected_beneficiary
                    ),
                )
                .with_recommendation("confirm the beneficiary with the counterparty")
                .needs_review()
                .blocking(),
            );
        }
    }
}
