//! Rate & probability scorer (C3, §4.4). Pure decimal formulas over a
//! program's `rate_metadata`, documented in the same style as the teacher's
//! amortization algorithms: algorithm, then invariants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{AdjustmentRow, Guarantor, RateMetadata};

/// Variables the adjustment grammar may reference (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct RateContext {
    pub equipment_age_years: Option<i32>,
    pub fico: Option<i32>,
}

impl RateContext {
    pub fn from_guarantor_and_age(guarantor: &Guarantor, equipment_age_years: Option<i32>) -> Self {
        RateContext {
            equipment_age_years,
            fico: guarantor.fico_score,
        }
    }

    fn resolve(&self, var: &str) -> Option<i64> {
        match var {
            "equipment_age" => self.equipment_age_years.map(i64::from),
            "fico" => self.fico.map(i64::from),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

/// Parse `<var> <op> <int>`. Whitespace around the operator is ignored.
/// Returns `None` for anything unparseable; callers treat that as `false`,
/// never an error (§4.4).
fn parse_condition(condition: &str) -> Option<(String, CompareOp, i64)> {
    let s = condition.trim().to_lowercase();

    let (op, op_len) = if s.contains("<=") {
        (CompareOp::Le, "<=")
    } else if s.contains(">=") {
        (CompareOp::Ge, ">=")
    } else if s.contains('<') {
        (CompareOp::Lt, "<")
    } else if s.contains('>') {
        (CompareOp::Gt, ">")
    } else {
        return None;
    };

    let idx = s.find(op_len)?;
    let var = s[..idx].trim().to_string();
    let rhs = s[idx + op_len.len()..].trim();
    let rhs: i64 = rhs.parse().ok()?;

    if var != "equipment_age" && var != "fico" {
        return None;
    }

    Some((var, op, rhs))
}

/// Evaluate one adjustment condition against a context. Absent variable or
/// unparseable condition → `false` (§4.4).
fn eval_condition(condition: &str, ctx: &RateContext) -> bool {
    let Some((var, op, rhs)) = parse_condition(condition) else {
        return false;
    };
    match ctx.resolve(&var) {
        Some(lhs) => op.apply(lhs, rhs),
        None => false,
    }
}

/// Resolve the base rate: first row whose amount band contains
/// `requested_amount` inclusive, with term bounds honored when present.
pub fn resolve_base_rate(rate_metadata: &RateMetadata, requested_amount: Decimal, requested_term_months: i32) -> Option<Decimal> {
    rate_metadata
        .base_rates
        .iter()
        .find(|row| {
            let in_amount_band = requested_amount >= row.min_amount && requested_amount <= row.max_amount;
            if !in_amount_band {
                return false;
            }
            let term_ok = row
                .min_term
                .map(|min_term| requested_term_months >= min_term)
                .unwrap_or(true)
                && row
                    .max_term
                    .map(|max_term| requested_term_months <= max_term)
                    .unwrap_or(true);
            term_ok
        })
        .map(|row| row.rate)
}

/// Apply every matching adjustment to a base rate, clamped to `>= 0`.
pub fn apply_adjustments(base_rate: Decimal, adjustments: &[AdjustmentRow], ctx: &RateContext) -> Decimal {
    let total_delta: Decimal = adjustments
        .iter()
        .filter(|row| eval_condition(&row.condition, ctx))
        .map(|row| row.delta)
        .sum();

    (base_rate + total_delta).max(dec!(0)).round_dp(2)
}

/// Full estimated rate for a program: resolve base, then apply adjustments.
/// `None` when no base-rate row matches (§4.4).
pub fn estimate_rate(rate_metadata: &RateMetadata, requested_amount: Decimal, requested_term_months: i32, ctx: &RateContext) -> Option<Decimal> {
    let base = resolve_base_rate(rate_metadata, requested_amount, requested_term_months)?;
    Some(apply_adjustments(base, &rate_metadata.adjustments, ctx))
}

/// Piecewise-linear approval-probability heuristic (§4.4). `fit_score` is
/// assumed already clamped to `[0,100]`.
pub fn approval_probability(mandatory_all_passed: bool, fit_score: Decimal) -> Decimal {
    if !mandatory_all_passed {
        return dec!(0);
    }

    let probability = if fit_score >= dec!(90) {
        (dec!(90) + (fit_score - dec!(90))).min(dec!(100))
    } else if fit_score >= dec!(80) {
        interpolate(fit_score, dec!(80), dec!(90), dec!(70), dec!(89))
    } else if fit_score >= dec!(70) {
        interpolate(fit_score, dec!(70), dec!(80), dec!(50), dec!(69))
    } else if fit_score >= dec!(60) {
        interpolate(fit_score, dec!(60), dec!(70), dec!(30), dec!(49))
    } else {
        interpolate(fit_score, dec!(0), dec!(60), dec!(10), dec!(29)).max(dec!(10))
    };

    probability.round_dp(2)
}

/// Linear interpolation of `x` between `(x0, y0)` and `(x1, y1)`.
fn interpolate(x: Decimal, x0: Decimal, x1: Decimal, y0: Decimal, y1: Decimal) -> Decimal {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Standard-amortization monthly payment estimate, grounded on the teacher's
/// PMT formula. `rate` is a percent (e.g. `6.75` for 6.75%); `term_months` the
/// loan term. Optional per §4.3 — callers decide whether to surface it.
pub fn estimate_monthly_payment(principal: Decimal, rate_percent: Decimal, term_months: i32) -> Decimal {
    if principal <= dec!(0) || term_months <= 0 {
        return dec!(0);
    }

    let n = Decimal::from(term_months);
    let apr = rate_percent / dec!(100);

    if apr == dec!(0) {
        return (principal / n).round_dp(2);
    }

    let monthly_rate = apr / dec!(12);
    let one_plus_r = dec!(1) + monthly_rate;
    let one_plus_r_n = power_decimal(one_plus_r, term_months.max(0) as u32);
    let denominator = one_plus_r_n - dec!(1);

    if denominator == dec!(0) {
        return (principal / n).round_dp(2);
    }

    let payment = principal * monthly_rate * one_plus_r_n / denominator;
    payment.round_dp(2)
}

fn power_decimal(base: Decimal, exp: u32) -> Decimal {
    if exp == 0 {
        return dec!(1);
    }
    let mut result = dec!(1);
    let mut current_base = base;
    let mut remaining_exp = exp;
    while remaining_exp > 0 {
        if remaining_exp % 2 == 1 {
            result *= current_base;
        }
        current_base *= current_base;
        remaining_exp /= 2;
    }
    result
}
