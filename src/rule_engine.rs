//! Rule engine (C2, §4.2): dispatches each active rule in a program to its
//! evaluator and aggregates the results into a weighted fit score.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::rules::{default_registry, evaluate_guarded, RuleContext, RuleEvaluator, RuleOutcome};
use crate::types::{Application, Business, Equipment, Guarantor, Program, Rule};

/// The outcome of evaluating every active rule in one program.
#[derive(Debug, Clone)]
pub struct ProgramEvaluation {
    pub program_id: uuid::Uuid,
    pub eligible: bool,
    pub fit_score: Decimal,
    pub total_rules: i64,
    pub rules_passed: i64,
    pub rules_failed: i64,
    pub mandatory_all_passed: bool,
    pub rule_results: Vec<(Rule, RuleOutcome)>,
}

/// Registry of rule-kind → evaluator. Built once and reused across an entire
/// matcher run; evaluators hold no state so sharing a `&RuleEngine` across
/// lenders/programs is safe even if evaluation is parallelized (§5).
pub struct RuleEngine {
    registry: HashMap<crate::types::RuleKind, Box<dyn RuleEvaluator>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        RuleEngine {
            registry: default_registry(),
        }
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom evaluator for a rule kind, overriding the default.
    /// Exists for test-time substitution per §9 Design Notes.
    pub fn register_evaluator(&mut self, kind: crate::types::RuleKind, evaluator: Box<dyn RuleEvaluator>) {
        self.registry.insert(kind, evaluator);
    }

    /// Evaluate every active rule of `program` against the application graph
    /// (§4.2 steps 1-6).
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_program(
        &self,
        application: &Application,
        business: &Business,
        guarantor: &Guarantor,
        equipment: &Equipment,
        program: &Program,
        today: NaiveDate,
    ) -> ProgramEvaluation {
        let active_rules: Vec<&Rule> = program.rules.iter().filter(|r| r.active).collect();

        let mut rule_results: Vec<(Rule, RuleOutcome)> = Vec::with_capacity(active_rules.len());
        let mut total_score = dec!(0);
        let mut total_weight = dec!(0);
        let mut rules_passed: i64 = 0;
        let mut rules_failed: i64 = 0;
        let mut mandatory_all_passed = true;

        for rule in active_rules.iter().copied() {
            // Step 2: skip rules with no registered evaluator rather than
            // failing the program (§9 Open Question (a)).
            let Some(evaluator) = self.registry.get(&rule.kind) else {
                log::warn!("rule_engine: no evaluator registered for kind {:?}, skipping rule {}", rule.kind, rule.id);
                continue;
            };

            let ctx = RuleContext {
                application,
                business,
                guarantor,
                equipment,
                program,
                rule,
                today,
            };

            let outcome = evaluate_guarded(evaluator.as_ref(), &ctx);

            if outcome.passed {
                rules_passed += 1;
            } else {
                rules_failed += 1;
                if outcome.mandatory {
                    mandatory_all_passed = false;
                }
            }

            total_score += outcome.score;
            total_weight += outcome.weight;
            rule_results.push((rule.clone(), outcome));
        }

        let fit_score = if total_weight > dec!(0) {
            (total_score / total_weight).clamp(dec!(0), dec!(100)).round_dp(2)
        } else {
            dec!(0)
        };

        let eligible = mandatory_all_passed && fit_score >= program.min_fit_score;

        log::debug!(
            "rule_engine: program {} fit_score={} eligible={} rules={}/{}",
            program.id,
            fit_score,
            eligible,
            rules_passed,
            active_rules.len()
        );

        ProgramEvaluation {
            program_id: program.id,
            eligible,
            fit_score,
            total_rules: active_rules.len() as i64,
            rules_passed,
            rules_failed,
            mandatory_all_passed,
            rule_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ApplicationStatus, EligibilityConditions, EquipmentCondition, LegalStructure, RateMetadata,
        RuleKind,
    };
    use serde_json::json;
    use uuid::Uuid;

    fn make_application() -> Application {
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
        }
    }

    fn make_program(rules: Vec<Rule>, min_fit_score: Decimal) -> Program {
        Program {
            id: Uuid::new_v4(),
            lender_id: Uuid::new_v4(),
            name: "Prime".into(),
            eligibility: EligibilityConditions::default(),
            rate_metadata: RateMetadata::default(),
            min_fit_score,
            active: true,
            credit_tier: None,
            rules,
            created_order: 0,
        }
    }

    #[test]
    fn weight_invariant_holds() {
        let application = make_application();
        let business = Business {
            id: Uuid::new_v4(),
            legal_structure: LegalStructure::Llc,
            industry: "Construction".into(),
            established_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            annual_revenue: Some(dec!(500000)),
            state: "TX".into(),
            city: "Austin".into(),
            zip: "78701".into(),
        };
        let guarantor = Guarantor {
            id: Uuid::new_v4(),
            fico_score: Some(700),
            paynet_score: Some(80),
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

        let rules = vec![
            Rule {
                id: Uuid::new_v4(),
                program_id: Uuid::new_v4(),
                kind: RuleKind::MinFico,
                rule_name: "Min FICO".into(),
                criteria: json!({ "min_score": 650 }),
                weight: dec!(2.00),
                mandatory: true,
                active: true,
            },
            Rule {
                id: Uuid::new_v4(),
                program_id: Uuid::new_v4(),
                kind: RuleKind::MinRevenue,
                rule_name: "Min Revenue".into(),
                criteria: json!({ "min_amount": 100000 }),
                weight: dec!(1.00),
                mandatory: false,
                active: true,
            },
        ];
        let program = make_program(rules, dec!(0));

        let engine = RuleEngine::new();
        let eval = engine.evaluate_program(
            &application,
            &business,
            &guarantor,
            &equipment,
            &program,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );

        let total_score: Decimal = eval.rule_results.iter().map(|(_, o)| o.score).sum();
        let total_weight: Decimal = eval.rule_results.iter().map(|(_, o)| o.weight).sum();
        let expected = (total_score / total_weight).clamp(dec!(0), dec!(100)).round_dp(2);
        assert_eq!(eval.fit_score, expected);
        assert!(eval.fit_score >= dec!(0) && eval.fit_score <= dec!(100));
    }

    #[test]
    fn mandatory_failure_blocks_eligibility_even_with_high_fit_score() {
        let application = make_application();
        let business = Business {
            id: Uuid::new_v4(),
            legal_structure: LegalStructure::Llc,
            industry: "Construction".into(),
            established_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            annual_revenue: Some(dec!(500000)),
            state: "TX".into(),
            city: "Austin".into(),
            zip: "78701".into(),
        };
        let guarantor = Guarantor {
            id: Uuid::new_v4(),
            fico_score: Some(500),
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
        let rules = vec![Rule {
            id: Uuid::new_v4(),
            program_id: Uuid::new_v4(),
            kind: RuleKind::MinFico,
            rule_name: "Min FICO".into(),
            criteria: json!({ "min_score": 650 }),
            weight: dec!(1.00),
            mandatory: true,
            active: true,
        }];
        let program = make_program(rules, dec!(0));

        let engine = RuleEngine::new();
        let eval = engine.evaluate_program(
            &application,
            &business,
            &guarantor,
            &equipment,
            &program,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );

        assert!(!eval.mandatory_all_passed);
        assert!(!eval.eligible);
    }

    #[test]
    fn unregistered_rule_kind_is_skipped_not_counted() {
        // A rule whose evaluator isn't in the default registry is simply
        // absent from rule_results and doesn't affect total_rules.
        let engine = RuleEngine::new();
        assert!(engine.registry.len() >= 19);
    }
}
