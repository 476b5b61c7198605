//! Equipment family: `equipment_type`, `equipment_age`, `equipment_condition` (§4.1).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::{partial_credit_linear, scored, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::RuleKind;

const EQUIPMENT_AGE_BAND_YEARS: Decimal = dec!(2);

#[derive(Debug, Clone, Copy)]
pub struct EquipmentEvaluator;

impl RuleEvaluator for EquipmentEvaluator {
    fn evaluate(&self, ctx: &RuleContext) -> RuleOutcome {
        match ctx.rule.kind {
            RuleKind::EquipmentType => eval_equipment_type(ctx),
            RuleKind::EquipmentAge => eval_equipment_age(ctx),
            RuleKind::EquipmentCondition => eval_equipment_condition(ctx),
            other => RuleOutcome::bad_criteria(
                ctx.rule,
                format!("EquipmentEvaluator cannot handle rule kind {other}"),
            ),
        }
    }
}

fn string_list(value: &serde_json::Value, key: &str) -> Option<Vec<String>> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

fn eval_equipment_type(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let allowed = string_list(&rule.criteria, "allowed_types");
    let excluded = string_list(&rule.criteria, "excluded_types");

    if allowed.is_none() && excluded.is_none() {
        return RuleOutcome::bad_criteria(rule, "equipment_type requires allowed_types and/or excluded_types");
    }

    let actual = ctx.equipment.equipment_type.to_lowercase();

    let is_excluded = excluded
        .as_ref()
        .map(|list| list.iter().any(|s| s.to_lowercase() == actual))
        .unwrap_or(false);

    let passed = if is_excluded {
        false
    } else if let Some(list) = &allowed {
        list.iter().any(|s| s.to_lowercase() == actual)
    } else {
        true
    };

    let score = scored(passed, rule.weight, dec!(0));
    let reason = if is_excluded {
        format!("Equipment type '{}' is excluded", ctx.equipment.equipment_type)
    } else if passed {
        format!("Equipment type '{}' is allowed", ctx.equipment.equipment_type)
    } else {
        format!("Equipment type '{}' is not in allowed list", ctx.equipment.equipment_type)
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({
            "actual": ctx.equipment.equipment_type,
            "allowed_types": allowed,
            "excluded_types": excluded,
        }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_equipment_age(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let max_age_years = match rule.criteria.get("max_age_years").and_then(|v| v.as_i64()) {
        Some(v) => v,
        None => return RuleOutcome::bad_criteria(rule, "criteria 'max_age_years' missing or not an integer"),
    };

    let Some(actual_age) = ctx.equipment.age_years(ctx.today) else {
        return RuleOutcome {
            passed: false,
            score: dec!(0),
            reason: "year required".to_string(),
            evidence: json!({ "actual": null, "required": max_age_years }),
            weight: rule.weight,
            mandatory: rule.mandatory,
        };
    };

    let passed = (actual_age as i64) <= max_age_years;
    let over = ((actual_age as i64) - max_age_years).max(0);
    let partial = if passed {
        dec!(0)
    } else {
        partial_credit_linear(Decimal::from(over), EQUIPMENT_AGE_BAND_YEARS)
    };
    let score = scored(passed, rule.weight, partial);

    let reason = if passed {
        format!("Equipment age {actual_age} years within maximum of {max_age_years} years")
    } else {
        format!("Equipment age {actual_age} years exceeds maximum of {max_age_years} years (over by {over})")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual_age, "required": max_age_years, "over": over }),
        weight: rule.weight,
        mandatory: rule.mandatory,
    }
}

fn eval_equipment_condition(ctx: &RuleContext) -> RuleOutcome {
    let rule = ctx.rule;
    let allowed = string_list(&rule.criteria, "allowed_conditions");
    let excluded = string_list(&rule.criteria, "excluded_conditions");

    if allowed.is_none() && excluded.is_none() {
        return RuleOutcome::bad_criteria(rule, "equipment_condition requires allowed_conditions and/or excluded_conditions");
    }

    let actual = ctx.equipment.condition.to_string();

    let is_excluded = excluded
        .as_ref()
        .map(|list| list.iter().any(|s| s.eq_ignore_ascii_case(&actual)))
        .unwrap_or(false);

    let passed = if is_excluded {
        false
    } else if let Some(list) = &allowed {
        list.iter().any(|s| s.eq_ignore_ascii_case(&actual))
    } else {
        true
    };

    let score = scored(passed, rule.weight, dec!(0));
    let reason = if is_excluded {
        format!("Equipment condition {actual} is excluded")
    } else if passed {
        format!("Equipment condition {actual} is allowed")
    } else {
        format!("Equipment condition {actual} is not in allowed list")
    };

    RuleOutcome {
        passed,
        score,
        reason,
        evidence: json!({ "actual": actual, "allowed_conditions": allowed, "excluded_conditions": excluded }),
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

    fn base() -> (Application, Business, Guarantor, Program) {
        (
            Application {
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
            },
            Business {
                id: Uuid::new_v4(),
                legal_structure: LegalStructure::Llc,
                industry: "Construction".into(),
                established_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                annual_revenue: None,
                state: "TX".into(),
                city: "Austin".into(),
                zip: "78701".into(),
            },
            Guarantor {
                id: Uuid::new_v4(),
                fico_score: None,
                paynet_score: None,
                credit_utilization_percent: None,
                has_bankruptcy: false,
                bankruptcy_discharge_date: None,
                is_homeowner: false,
                is_us_citizen: true,
            },
            Program {
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
            },
        )
    }

    #[test]
    fn excluded_type_wins_over_allowed() {
        let (application, business, guarantor, program) = base();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Forklift".into(),
            condition: EquipmentCondition::New,
            cost: dec!(10000),
            year_manufactured: None,
        };
        let rule = make_rule(
            RuleKind::EquipmentType,
            json!({ "allowed_types": ["forklift", "excavator"], "excluded_types": ["forklift"] }),
        );
        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(!EquipmentEvaluator.evaluate(&ctx).passed);
    }

    #[test]
    fn equipment_age_requires_year_when_not_new() {
        let (application, business, guarantor, program) = base();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::Used,
            cost: dec!(10000),
            year_manufactured: None,
        };
        let rule = make_rule(RuleKind::EquipmentAge, json!({ "max_age_years": 10 }));
        let ctx = RuleContext {
            application: &application,
            business: &business,
            guarantor: &guarantor,
            equipment: &equipment,
            program: &program,
            rule: &rule,
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        let outcome = EquipmentEvaluator.evaluate(&ctx);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason, "year required");
    }

    #[test]
    fn equipment_age_matches_spec_adjustment_scenario_6() {
        let (application, business, guarantor, program) = base();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            equipment_type: "Excavator".into(),
            condition: EquipmentCondition::Used,
            cost: dec!(10000),
            year_manufactured: Some(2006),
        };
        assert_eq!(equipment.age_years(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()), Some(20));
    }
}
