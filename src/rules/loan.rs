//! Loan family: `min_loan_amount`, `max_loan_amount`, `min_loan_term`,
//! `max_loan_term`, `min_down_payment`, `max_ltv` (§4.1). None of these
//! kinds allow partial credit.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::{scored, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::{Rule, RuleKind};

#[derive(Debug, Clone, Copy)]
pub struct LoanEvaluator;

impl RuleEvaluator for LoanEvaluator {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        match ctx.rule.kind {
            RuleKind::MinLoanAmount => eval_bound(ctx, "min_amount", true, ctx.application.requested_amount, "loan amount"),
            RuleKind::MaxLoanAmount => eval_bound(ctx, "max_amount", false, ctx.application.requested_amount, "loan amount"),
            RuleKind::MinLoanTerm => eval_bound(
                ctx,
                "min_months",
                true,
                Decimal::from(ctx.application.requested_term_months),
                "loan term (months)",
            ),
            RuleKind::MaxLoanTerm => eval_bound(
                ctx,
                "max_months",
                false,
                Decimal::from(ctx.application.requested_term_months),
                "loan term (months)",
            ),
            RuleKind::MinDownPayment => eval_min_down_payment(ctx),
            RuleKind::MaxLtv => eval_max_ltv(ctx),
            other => RuleOutcome::bad_criteria(
                ctx.rule,
                format!("LoanEvaluator cannot handle rule kind {other}"),
            ),
        }
    }
}

/// Shared bound check: `is_minimum` true means `actual >= bound`, false means `actual <= bound`.
fn eval_bound(ctx: &RuleContext, key: &str, is_minimum: bool, actual: Decimal, label: &str) -> RuleOutcome {
    let rule = ctx.rule;
    let bound = match rule.criteria.get(key).and_then(|v| v.as_f64()) {
        Some(v) => Decimal::try_from(v).unwrap_or(dec!(0)),
        None => return RuleOutcome::bad_criteria(rule, format!("criteria '{key}' missing or not a number")),
    };

    let passed = if is_minimum { actual >= bound } else { actual <= bound };
    let score = scored(passed, rule.weight, dec!(0));
    let comparator = if is_minimum { "below minimum" } else { "above maximum" };
    let reason = if passed {
        format!("{label} {actual} satisfies bound {bound}")
    } else {
        format!("{label} {actual} is {comparator} {bound}")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": bound }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_min_down_payment(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_percentage = match rule.criteria.get("min_percentage").and_then(|v| v.as_f64()) {
        Some(v) => Decimal::try_from(v).unwrap_or(dec!(0)),
        None => return RuleOutcome::bad_criteria(rule, "criteria 'min_percentage' missing or not a number"),
    };

    let actual = ctx.application.down_payment_pct();
    let passed = actual >= min_percentage;
    let score = scored(passed, rule.weight, dec!(0));
    let reason = if passed {
        format!("Down payment {actual}% meets minimum of {min_percentage}%")
    } else {
        format!("Down payment {actual}% is below minimum of {min_percentage}%")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": min_percentage }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_max_ltv(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let max_percentage = match rule.criteria.get("max_percentage").and_then(|v| v.as_f64()) {
        Some(v) => Decimal::try_from(v).unwrap_or(dec!(0)),
        None => return RuleOutcome::bad_criteria(rule, "criteria 'max_percentage' missing or not a number"),
    };

    if ctx.equipment.cost == dec!(0) {
        return undefined_ltv(rule, max_percentage);
    }

    let actual = (ctx.application.requested_amount / ctx.equipment.cost) * dec!(100);
    let actual = actual.round_dp(2);
    let passed = actual <= max_percentage;
    let score = scored(passed, rule.weight, dec!(0));

    let mut evidence = json!({ "actual": actual, "required": max_percentage });
    let reason = if passed {
        format!("LTV {actual}% within maximum of {max_percentage}%")
    } else {
        let excess = (actual - max_percentage).max(dec!(0));
        evidence["excess"] = json!(excess);
        format!("LTV {actual}% exceeds maximum of {max_percentage}% (excess: {excess}%)")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence,
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn undefined_ltv(rule: &Rule, max_percentage: Decimal) -> RuleOutcome {
    RuleOutcome {
        passed: false,
        score: dec!(0),
        reason: "LTV undefined".to_string(),
        evidence: json!({ "actual": null, "required": max_percentage }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Application, ApplicationStatus, Business, Equipment, EquipmentCondition, Guarantor,
        LegalStructure, Program,
    };
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    fn make_rule(kind: RuleKind, criteria: serde_json::Value) -> Rule {
        Rule {
            id: Uuid::new_v4(),
            program_id: Uuid::new_v4(),
            kind,
            rule_name: "test".into(),
            criteria,
            weight: dec!(1.00),
            mandatory: true,
            active: true,
        }
    }

    fn ctx_for(application: &Application, equipment: &Equipment, rule: &Rule) -> (Business, Guarantor, Program) {
        let business = Business {
            id: Uuid::new_v4(),
            legal_structure: LegalStructure::Llc,
            industry: "Construction".into(),
            established_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            annual_revenue: None,
            state: "TX".into(),
            city: "Austin".into(),
            zip: "78701".into(),
        };
        let guarantor = Guarantor {
            id: Uuid::new_v4(),
            fico_score: None,
            paynet_score: None,
            credit_utilization_percent: None,
            has_bankruptcy: false,
            bankruptcy_discharge_date: None,
            is_homeowner: false,
            is_us_citizen: true,
        };
        let program = Program {
            id: Uuid::new_v4(),
            lender_id: Uuid::new_v4(),
            name: "Default".into(),
            eligibility: Default::default(),
            rate_metadata: Default::default(),
            min_fit_score: dec!(0),
            active: true,
            credit_tier: None,
            rules: vec![],
            created_order: 0,
        };
        let _ = rule;
        (business, guarantor, program)
    }

    #[test]
    fn max_ltv_matches_spec_scenario_5() {
        let application = Application {
            id: Uuid::new_v4(),
            requested_amount: dec!(38000),
            requested_term_months: 60,
            down_payment_percentage: None,
            down_payment_amount: None,
            comparable_debt_payments: None,
            status: ApplicationStatus::Submitted,
            business_id: Uuid::new_v4(),
            guarantor_id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
        };
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::New,
            cost: dec!(40000),
            year_manufactured: None,
        };
        let rule = make_rule(RuleKind::MaxLtv, json!({ "max_percentage": 90 }));
        let (business, guarantor, program) = ctx_for(&application, &equipment, &rule);

        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };

        let outcome = LoanEvaluator.evaluate(&ctx);
        assert!(!outcome.passed);
        assert_eq!(outcome.evidence["actual"], json!(dec!(95.00)));
        assert_eq!(outcome.evidence["excess"], json!(dec!(5.00)));
    }

    #[test]
    fn max_ltv_zero_cost_is_undefined() {
        let application = Application {
            id: Uuid::new_v4(),
            requested_amount: dec!(38000),
            requested_term_months: 60,
            down_payment_percentage: None,
            down_payment_amount: None,
            comparable_debt_payments: None,
            status: ApplicationStatus::Submitted,
            business_id: Uuid::new_v4(),
            guarantor_id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
        };
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::New,
            cost: dec!(0),
            year_manufactured: None,
        };
        let rule = make_rule(RuleKind::MaxLtv, json!({ "max_percentage": 90 }));
        let (business, guarantor, program) = ctx_for(&application, &equipment, &rule);

        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };

        let outcome = LoanEvaluator.evaluate(&ctx);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "LTV undefined");
    }
}
