//! Business family: `time_in_business`, `min_revenue`, `legal_structure` (§4.1).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::{partial_credit_linear, scored, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::RuleKind;

const TIME_IN_BUSINESS_BAND_MONTHS: Decimal = dec!(6);

#[derive(Debug, Clone, Copy)]
pub struct BusinessEvaluator;

impl RuleEvaluator for BusinessEvaluator {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        match ctx.rule.kind {
            RuleKind::TimeInBusiness => eval_time_in_business(ctx),
            RuleKind::MinRevenue => eval_min_revenue(ctx),
            RuleKind::LegalStructure => eval_legal_structure(ctx),
            other => RuleOutcome::bad_criteria(
                ctx.rule,
                format!("BusinessEvaluator cannot handle rule kind {other}"),
            ),
        }
    }
}

fn eval_time_in_business(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_years = rule.criteria.get("min_years").and_then(|v| v.as_i64());
    let min_months = rule.criteria.get("min_months").and_then(|v| v.as_i64());

    let required_months = match (min_years, min_months) {
        (Some(years), None) => years * 12,
        (None, Some(months)) => months,
        (Some(_), Some(_)) => {
            return RuleOutcome::bad_criteria(
                rule,
                "time_in_business requires exactly one of min_years, min_months",
            )
        }
        (None, None) => {
            return RuleOutcome::bad_criteria(
                rule,
                "time_in_business requires exactly one of min_years, min_months",
            )
        }
    };

    let actual_months = ctx.business.months_in_business(ctx.today);
    let passed = actual_months >= required_months;
    let gap = (required_months - actual_months).max(0);
    let partial = if passed {
        dec!(0)
    } else {
        partial_credit_linear(Decimal::from(gap), TIME_IN_BUSINESS_BAND_MONTHS)
    };
    let score = scored(passed, rule.weight, partial);

    let reason = if passed {
        format!("{actual_months} months in business meets minimum of {required_months}")
    } else {
        format!("{actual_months} months in business is below minimum of {required_months} (gap: {gap})")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual_months, "required": required_months, "gap": gap }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_min_revenue(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let min_amount = match rule.criteria.get("min_amount").and_then(|v| v.as_f64()) {
        Some(v) => Decimal::try_from(v).unwrap_or(dec!(0)),
        None => return RuleOutcome::bad_criteria(rule, "criteria 'min_amount' missing or not a number"),
    };

    let Some(actual) = ctx.business.annual_revenue else {
        return RuleOutcome {
            passed: false,
            score: dec!(0),
            reason: format!("Annual revenue is required (minimum: {min_amount})"),
            evidence: json!({ "actual": null, "required": min_amount }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        };
    };

    let passed = actual >= min_amount;
    let shortfall = (min_amount - actual).max(dec!(0));
    let allowed_shortfall = min_amount * dec!(0.20);
    let partial = if passed {
        dec!(0)
    } else {
        partial_credit_linear(shortfall, allowed_shortfall)
    };
    let score = scored(passed, rule.weight, partial);

    let reason = if passed {
        format!("Annual revenue {actual} meets minimum of {min_amount}")
    } else {
        format!("Annual revenue {actual} is below minimum of {min_amount} (shortfall: {shortfall})")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": min_amount, "shortfall": shortfall }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_legal_structure(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let allowed = match rule.criteria.get("allowed_structures").and_then(|v| v.as_array()) {
        Some(arr) => arr.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>(),
        None => return RuleOutcome::bad_criteria(rule, "criteria 'allowed_structures' missing or not an array"),
    };

    let actual = ctx.business.legal_structure.to_string();
    let passed = allowed.iter().any(|s| s.eq_ignore_ascii_case(&actual));
    let score = scored(passed, rule.weight, dec!(0));

    let reason = if passed {
        format!("Legal structure {actual} is an allowed structure")
    } else {
        format!("Legal structure {actual} is not in allowed list: {}", allowed.join(", "))
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "required": allowed }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Application, ApplicationStatus, Business, Equipment, EquipmentCondition, Guarantor,
        LegalStructure, Program, Rule,
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

    fn base_ctx_parts() -> (Application, Business, Guarantor, Equipment, Program) {
        let application = Application {
            id: Uuid::new_v4(),
            requested_amount: dec!(50000),
            requested_term_months: 60,
            down_payment_percentage: None,
            down_payment_amount: None,
            comparable_debt_payments: None,
            status: ApplicationStatus::Submitted,
            business_id: Uuid::new_v4(),
            guarantor_id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
        };
        let business = Business {
            id: Uuid::new_v4(),
            legal_structure: LegalStructure::Llc,
            industry: "Construction".into(),
            established_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            annual_revenue: Some(dec!(500000)),
            state: "TX".into(),
            city: "Austin".into(),
            zip: "78701".into(),
        };
        let guarantor = Guarantor {
            id: Uuid::new_v4(),
            fico_score: Some(700),
            paynet_score: None,
            credit_utilization_percent: None,
            has_bankruptcy: false,
            bankruptcy_discharge_date: None,
            is_homeowner: true,
            is_us_citizen: true,
        };
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::New,
            cost: dec!(100000),
            year_manufactured: None,
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
        (application, business, guarantor, equipment, program)
    }

    #[test]
    fn time_in_business_years_and_months_are_equivalent() {
        let (application, business, guarantor, equipment, program) = base_ctx_parts();
        let rule_years = make_rule(RuleKind::TimeInBusiness, json!({ "min_years": 5 }));
        let rule_months = make_rule(RuleKind::TimeInBusiness, json!({ "min_months": 60 }));
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let ctx_years = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule_years,
            today,
        };
        let ctx_months = RuleContext { rule: &rule_months, ..ctx_years };

        assert_eq!(
            BusinessEvaluator.evaluate(&ctx_years).passed,
            BusinessEvaluator.evaluate(&ctx_months).passed
        );
    }

    #[test]
    fn legal_structure_rejects_when_not_in_list() {
        let (application, mut business, guarantor, equipment, program) = base_ctx_parts();
        business.legal_structure = LegalStructure::SoleProp;
        let rule = make_rule(RuleKind::LegalStructure, json!({ "allowed_structures": ["llc", "corporation"] }));
        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(!BusinessEvaluator.evaluate(&ctx).passed);
    }

    #[test]
    fn min_revenue_missing_fails() {
        let (application, mut business, guarantor, equipment, program) = base_ctx_parts();
        business.annual_revenue = None;
        let rule = make_rule(RuleKind::MinRevenue, json!({ "min_amount": 250000 }));
        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(!BusinessEvaluator.evaluate(&ctx).passed);
    }
}
