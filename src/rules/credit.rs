//! Credit family: `min_fico`, `min_paynet`, `credit_tier`,
//! `max_credit_utilization` (§4.1).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::{partial_credit_linear, scored, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::{Rule, RuleKind};

const FICO_BAND: Decimal = dec!(50);
const PAYNET_BAND: Decimal = dec!(20);

#[derive(Debug, Clone, Copy)]
pub struct CreditEvaluator;

impl RuleEvaluator for CreditEvaluator {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        match ctx.rule.kind {
            RuleKind::MinFico => eval_min_fico(ctx),
            RuleKind::MinPaynet => eval_min_paynet(ctx),
            RuleKind::CreditTier => eval_credit_tier(ctx),
            RuleKind::MaxCreditUtilization => eval_max_credit_utilization(ctx),
            other => RuleOutcome::bad_criteria(
                ctx.rule,
                format!("CreditEvaluator cannot handle rule kind {other}"),
            ),
        }
    }
}

fn required_i64(rule: &Rule, key: &str) -> Result<i64, RuleOutcome> {
    rule.criteria
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RuleOutcome::bad_criteria(rule, format!("criteria '{key}' missing or not an integer")))
}

fn eval_min_fico(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_score = match required_i64(rule, "min_score") {
        Ok(v) => v,
        Err(outcome) => return outcome,
    };

    let Some(actual) = ctx.guarantor.fico_score else {
        return RuleOutcome {
            passed: false,
            score: dec!(0),
            reason: format!("FICO score is required (minimum: {min_score})"),
            evidence: json!({ "actual": null, "required": min_score }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        };
    };

    let passed = actual as i64 >= min_score;
    let gap = (min_score - actual as i64).max(0);
    let partial = if passed { dec!(0) } else { partial_credit_linear(Decimal::from(gap), FICO_BAND) };
    let score = scored(passed, rule.weight, partial);

    let reason = if passed {
        format!("FICO score {actual} meets minimum requirement of {min_score}")
    } else {
        format!("FICO score {actual} is below minimum requirement of {min_score} (gap: {gap})")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": min_score, "gap": gap }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_min_paynet(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_score = match required_i64(rule, "min_score") {
        Ok(v) => v,
        Err(outcome) => return outcome,
    };

    let Some(actual) = ctx.guarantor.paynet_score else {
        return RuleOutcome {
            passed: false,
            score: dec!(0),
            reason: format!("PayNet score is required (minimum: {min_score})"),
            evidence: json!({ "actual": null, "required": min_score }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        };
    };

    let passed = actual as i64 >= min_score;
    let gap = (min_score - actual as i64).max(0);
    let partial = if passed { dec!(0) } else { partial_credit_linear(Decimal::from(gap), PAYNET_BAND) };
    let score = scored(passed, rule.weight, partial);

    let reason = if passed {
        format!("PayNet score {actual} meets minimum requirement of {min_score}")
    } else {
        format!("PayNet score {actual} is below minimum requirement of {min_score} (gap: {gap})")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": min_score, "gap": gap }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_credit_tier(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_fico = rule.criteria.get("min_fico").and_then(|v| v.as_i64());
    let min_paynet = rule.criteria.get("min_paynet").and_then(|v| v.as_i64());
    let tier_name = rule.criteria.get("tier_name").and_then(|v| v.as_str());

    if min_fico.is_none() && min_paynet.is_none() {
        return RuleOutcome::bad_criteria(rule, "credit_tier requires at least one of min_fico, min_paynet");
    }

    let mut failures = Vec::new();

    if let Some(min_fico) = min_fico {
        match ctx.guarantor.fico_score {
            Some(actual) if actual as i64 >= min_fico => {}
            Some(actual) => failures.push(format!("FICO {actual} below tier floor {min_fico}")),
            None => failures.push(format!("FICO score required for tier (floor {min_fico})")),
        }
    }

    if let Some(min_paynet) = min_paynet {
        match ctx.guarantor.paynet_score {
            Some(actual) if actual as i64 >= min_paynet => {}
            Some(actual) => failures.push(format!("PayNet {actual} below tier floor {min_paynet}")),
            None => failures.push(format!("PayNet score required for tier (floor {min_paynet})")),
        }
    }

    let passed = failures.is_empty();
    let score = scored(passed, rule.weight, dec!(0));
    let reason = if passed {
        format!("Meets credit tier requirements{}", tier_name.map(|t| format!(" for {t}")).unwrap_or_default())
    } else {
        failures.join("; ")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({
            "actual_fico": ctx.guarantor.fico_score,
            "actual_paynet": ctx.guarantor.paynet_score,
            "required_fico": min_fico,
            "required_paynet": min_paynet,
            "tier_name": tier_name,
        }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_max_credit_utilization(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let max_percentage = match rule.criteria.get("max_percentage").and_then(|v| v.as_f64()) {
        Some(v) => v,
        None => return RuleOutcome::bad_criteria(rule, "criteria 'max_percentage' missing or not a number"),
    };

    let Some(actual) = ctx.guarantor.credit_utilization_percent else {
        let passed = !rule.mandatory;
        return RuleOutcome {
            passed,
            score: scored(passed, rule.weight, dec!(0)),
            reason: if passed {
                "Credit utilization not reported; guideline rule passes by default".to_string()
            } else {
                "Credit utilization is required but not reported".to_string()
            },
            evidence: json!({ "actual": null, "required": max_percentage }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        };
    };

    let actual_f64 = actual.to_string().parse::<f64>().unwrap_or(f64::MAX);
    let passed = actual_f64 <= max_percentage;
    let score = scored(passed, rule.weight, dec!(0));
    let reason = if passed {
        format!("Credit utilization {actual}% within maximum of {max_percentage}%")
    } else {
        format!("Credit utilization {actual}% exceeds maximum of {max_percentage}%")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": max_percentage }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}
