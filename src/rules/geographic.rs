//! Geographic/industry family: `excluded_states`, `excluded_industries`,
//! `allowed_states`, `allowed_industries` (§4.1). These are rule-level
//! checks, distinct from the Tier-1 lender-level exclusions in §4.3.

use rust_decimal_macros::dec;
use serde_json::json;

use super::{scored, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::RuleKind;

#[derive(Debug, Clone, Copy)]
pub struct GeographicEvaluator;

impl RuleEvaluator for GeographicEvaluator {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        match ctx.rule.kind {
            RuleKind::ExcludedStates => eval_membership(ctx, "states", ctx.business.state.to_uppercase(), true, false),
            RuleKind::AllowedStates => eval_membership(ctx, "states", ctx.business.state.to_uppercase(), true, true),
            RuleKind::ExcludedIndustries => {
                eval_membership(ctx, "industries", ctx.business.industry.clone(), false, false)
            }
            RuleKind::AllowedIndustries => {
                eval_membership(ctx, "industries", ctx.business.industry.clone(), false, true)
            }
            other => RuleOutcome::bad_criteria(
                ctx.rule,
                format!("GeographicEvaluator cannot handle rule kind {other}"),
            ),
        }
    }
}

/// `uppercase_compare` controls case normalization (states are upper-cased,
/// industries are compared case-insensitively). `pass_if_member` is `true`
/// for `allowed_*` rules, `false` for `excluded_*` rules.
fn eval_membership(
    ctx: &RuleContext,
    key: &str,
    actual: String,
    uppercase_compare: bool,
    pass_if_member: bool,
) -> RuleOutcome {
    let rule = ctx.rule;
    let list = match rule.criteria.get(key).and_then(|v| v.as_array()) {
        Some(arr) => arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect::<Vec<_>>(),
        None => return RuleOutcome::bad_criteria(rule, format!("criteria '{key}' missing or not an array")),
    };

    let is_member = if uppercase_compare {
        list.iter().any(|s| s.to_uppercase() == actual)
    } else {
        list.iter().any(|s| s.eq_ignore_ascii_case(&actual))
    };

    let passed = is_member == pass_if_member;
    let score = scored(passed, rule.weight, dec!(0));

    let verb = if pass_if_member { "not in allowed list" } else { "excluded" };
    let reason = if passed {
        format!("'{actual}' satisfies {key} policy")
    } else {
        format!("'{actual}' is {verb}: {}", list.join(", "))
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "list": list }),
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

    #[test]
    fn excluded_states_rejects_member() {
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
            annual_revenue: None,
            state: "ca".into(),
            city: "LA".into(),
            zip: "90001".into(),
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
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::New,
            cost: dec!(10000),
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
        let rule = make_rule(RuleKind::ExcludedStates, json!({ "states": ["CA"] }));
        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(!GeographicEvaluator.evaluate(&ctx).passed);
    }
}
