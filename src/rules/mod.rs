//! Rule evaluators (C1, §4.1).
//!
//! Each evaluator family implements [`RuleEvaluator`] for one or more
//! [`RuleKind`] variants (mirroring the credit/business/loan/equipment/
//! geographic families in §4.1), reading its required criteria keys out of
//! the rule's open `criteria` mapping. An evaluator never panics past its
//! contract for a malformed rule — a missing/wrong-shaped criteria key comes
//! back as a non-passed [`RuleOutcome`] whose reason carries the parse
//! error, never an `Err`. True programming-bug panics are still possible in
//! principle; the rule engine (C2) wraps every call in [`evaluate_guarded`]
//! to convert those into an `EvaluatorError`-shaped outcome instead of
//! taking down the whole run.

pub mod business;
pub mod credit;
pub mod equipment;
pub mod geographic;
pub mod loan;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::types::{Application, Business, Equipment, Guarantor, Program, Rule, RuleKind};

/// Everything one rule evaluation needs: the application graph, the program
/// it's being weighed against, the rule itself, and an injected "now" so
/// evaluators stay pure functions of their inputs (§5, §9 Design Notes).
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub application: &'a Application,
    pub business: &'a Business,
    pub guarantor: &'a Guarantor,
    pub equipment: &'a Equipment,
    pub program: &'a Program,
    pub rule: &'a Rule,
    pub today: NaiveDate,
}

/// The result of evaluating one rule against one application.
///
/// `score` is already normalized to `[0, 100 × weight]` per §4.1 — a full
/// pass yields `100 × weight`, a hard fail yields `0`, a near miss may yield
/// a partial-credit value in between.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub passed: bool,
    pub score: Decimal,
    pub reason: String,
    pub evidence: serde_json::Value,
    pub weight: Decimal,
    pub mandatory: bool,
}

impl RuleOutcome {
    /// Build a failed outcome for a rule whose criteria could not be parsed
    /// (§4.1 error policy): `passed = false`, score `0`, mandatory flag
    /// preserved from the rule.
    fn bad_criteria(rule: &Rule, message: impl Into<String>) -> Self {
        let message = message.into();
        RuleOutcome {
            passed: false,
            score: dec!(0),
            reason: message.clone(),
            evidence: json!({ "error": message }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        }
    }
}

/// Strategy interface for one rule-kind family (§9 Design Notes: "prefer a
/// registry keyed by rule-kind to a giant switch").
pub trait RuleEvaluator: Send + Sync {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome;
}

/// Score contribution shared by every evaluator family: full credit on a
/// pass, `partial_credit ∈ [0,1]` scaled credit on a near miss, zero
/// otherwise. Carried over from the original rule engine's
/// `_calculate_score` helper (see SPEC_FULL.md).
pub fn scored(passed: bool, weight: Decimal, partial_credit: Decimal) -> Decimal {
    if passed {
        return dec!(100) * weight;
    }
    if partial_credit > dec!(0) {
        return dec!(100) * weight * partial_credit;
    }
    dec!(0)
}

/// Partial-credit formula (§4.1): linear from 1.0 at `gap = 0` down to 0.0
/// at `gap = band`; zero beyond the band. `band <= 0` never awards credit.
pub fn partial_credit_linear(gap: Decimal, band: Decimal) -> Decimal {
    if band <= dec!(0) || gap < dec!(0) {
        return dec!(0);
    }
    let fraction = dec!(1) - (gap / band);
    fraction.max(dec!(0))
}

/// Build the default registry mapping every [`RuleKind`] to the evaluator
/// that handles it, mirroring the original engine's
/// `_register_default_evaluators`.
pub fn default_registry() -> HashMap<RuleKind, Box<dyn RuleEvaluator>> {
    let mut registry: HashMap<RuleKind, Box<dyn RuleEvaluator>> = HashMap::new();

    let credit = credit::CreditEvaluator;
    registry.insert(RuleKind::MinFico, Box::new(credit));
    registry.insert(RuleKind::MinPaynet, Box::new(credit));
    registry.insert(RuleKind::CreditTier, Box::new(credit));
    registry.insert(RuleKind::MaxCreditUtilization, Box::new(credit));

    let business = business::BusinessEvaluator;
    registry.insert(RuleKind::TimeInBusiness, Box::new(business));
    registry.insert(RuleKind::MinRevenue, Box::new(business));
    registry.insert(RuleKind::LegalStructure, Box::new(business));

    let loan = loan::LoanEvaluator;
    registry.insert(RuleKind::MinLoanAmount, Box::new(loan));
    registry.insert(RuleKind::MaxLoanAmount, Box::new(loan));
    registry.insert(RuleKind::MinLoanTerm, Box::new(loan));
    registry.insert(RuleKind::MaxLoanTerm, Box::new(loan));
    registry.insert(RuleKind::MinDownPayment, Box::new(loan));
    registry.insert(RuleKind::MaxLtv, Box::new(loan));

    let equipment = equipment::EquipmentEvaluator;
    registry.insert(RuleKind::EquipmentType, Box::new(equipment));
    registry.insert(RuleKind::EquipmentAge, Box::new(equipment));
    registry.insert(RuleKind::EquipmentCondition, Box::new(equipment));

    let geographic = geographic::GeographicEvaluator;
    registry.insert(RuleKind::ExcludedStates, Box::new(geographic));
    registry.insert(RuleKind::ExcludedIndustries, Box::new(geographic));
    registry.insert(RuleKind::AllowedStates, Box::new(geographic));
    registry.insert(RuleKind::AllowedIndustries, Box::new(geographic));

    registry
}

/// Run an evaluator, converting any unwind into an `EvaluatorError`-shaped
/// outcome (§7 kind 4) instead of letting it escape into the rule engine.
pub fn evaluate_guarded(evaluator: &dyn RuleEvaluator, ctx: &RuleContext) -> RuleOutcome {
    match catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(ctx))) {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "evaluator panicked".to_string());
            RuleOutcome {
                passed: false,
                score: dec!(0),
                reason: format!("evaluator error: {message}"),
                evidence: json!({ "error": message }),
                weight: ctx.rule.weight,
                mandatory: ctx.rule.mandatory,
            }
        }
    }
}
