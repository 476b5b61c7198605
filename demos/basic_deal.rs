//! Basic Underwriting Run Example
//!
//! Demonstrates the full matcher pipeline against a single lender with two
//! programs and a handful of rules.
//!
//! Run with: `cargo run --example basic_deal`

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use underwriting_core::prelude::*;
use underwriting_core::types::{
    AdjustmentRow, Application, ApplicationContext, ApplicationStatus, BaseRateRow, Business,
    EligibilityConditions, Equipment, EquipmentCondition, Guarantor, LegalStructure, Program,
    RateMetadata, Rule, RuleKind,
};

fn main() {
    println!("=== Underwriting Run Example ===\n");

    let application = Application {
        id: Uuid::new_v4(),
        requested_amount: dec!(50000),
        requested_term_months: 60,
        down_payment_percentage: Some(dec!(10)),
        down_payment_amount: None,
        comparable_debt_payments: None,
        status: ApplicationStatus::Submitted,
        business_id: Uuid::new_v4(),
        guarantor_id: Uuid::new_v4(),
        equipment_id: Uuid::new_v4(),
    };
    let business = Business {
        id: application.business_id,
        legal_structure: LegalStructure::Llc,
        industry: "Construction".into(),
        established_date: NaiveDate::from_ymd_opt(2018, 3, 1).unwrap(),
        annual_revenue: Some(dec!(750000)),
        state: "TX".into(),
        city: "Austin".into(),
        zip: "78701".into(),
    };
    let guarantor = Guarantor {
        id: application.guarantor_id,
        fico_score: Some(700),
        paynet_score: None,
        credit_utilization_percent: Some(dec!(30)),
        has_bankruptcy: false,
        bankruptcy_discharge_date: None,
        is_homeowner: true,
        is_us_citizen: true,
    };
    let equipment = Equipment {
        id: application.equipment_id,
        equipment_type: "Excavator".into(),
        condition: EquipmentCondition::Used,
        cost: dec!(100000),
        year_manufactured: Some(2006),
    };

    println!("Application: ${} over {} months", application.requested_amount, application.requested_term_months);
    println!("Business: {} in {}, established {}", business.industry, business.state, business.established_date);
    println!("Guarantor FICO: {:?}\n", guarantor.fico_score);

    let min_fico_rule = Rule {
        id: Uuid::new_v4(),
        program_id: Uuid::new_v4(),
        kind: RuleKind::MinFico,
        rule_name: "Minimum FICO".into(),
        criteria: json!({ "min_score": 680 }),
        weight: dec!(2.00),
        mandatory: true,
        active: true,
    };
    let max_ltv_rule = Rule {
        id: Uuid::new_v4(),
        program_id: Uuid::new_v4(),
        kind: RuleKind::MaxLtv,
        rule_name: "Maximum LTV".into(),
        criteria: json!({ "max_percentage": 90 }),
        weight: dec!(1.00),
        mandatory: false,
        active: true,
    };

    let prime_program = Program {
        id: Uuid::new_v4(),
        lender_id: Uuid::new_v4(),
        name: "Prime".into(),
        eligibility: EligibilityConditions::default(),
        rate_metadata: RateMetadata {
            base_rates: vec![BaseRateRow {
                min_amount: dec!(10000),
                max_amount: dec!(100000),
                rate: dec!(6.75),
                min_term: None,
                max_term: None,
            }],
            adjustments: vec![
                AdjustmentRow { condition: "equipment_age > 15".into(), delta: dec!(0.50), description: Some("older equipment surcharge".into()) },
                AdjustmentRow { condition: "fico < 680".into(), delta: dec!(1.00), description: Some("subprime surcharge".into()) },
            ],
        },
        min_fit_score: dec!(60),
        active: true,
        credit_tier: Some("Prime".into()),
        rules: vec![min_fico_rule, max_ltv_rule],
        created_order: 0,
    };

    let lender = Lender {
        id: Uuid::new_v4(),
        name: "First Equipment Capital".into(),
        active: true,
        min_loan_amount: Some(dec!(10000)),
        max_loan_amount: Some(dec!(250000)),
        excluded_states: vec![],
        excluded_industries: vec![],
        programs: vec![prime_program],
    };

    let store = InMemoryStore::new();
    store.insert_application(ApplicationContext {
        application: application.clone(),
        business,
        guarantor,
        equipment,
    });
    store.insert_lender(lender);

    let orchestrator = Orchestrator::new(&store, &store, &store);
    match orchestrator.run_underwriting(application.id) {
        Ok(run) => {
            println!("Run {} completed with status {}", run.id, run.status);
            println!(
                "  Lenders evaluated: {}, matched: {}, rejected: {}",
                run.totals.lenders_evaluated, run.totals.matched, run.totals.rejected
            );

            for result in store.get_run_with_results(run.id).unwrap() {
                println!("\nLender {}:", result.lender_id);
                println!("  Eligible: {}", result.is_eligible);
                println!("  Fit score: {}", result.fit_score.as_decimal());
                if let Some(rate) = result.estimated_rate {
                    println!("  Estimated rate: {}%", rate.as_decimal());
                }
                if let Some(payment) = result.estimated_monthly_payment {
                    println!("  Estimated monthly payment: {}", payment);
                }
                if let Some(reason) = &result.rejection_reason {
                    println!("  Rejection reason: {reason}");
                }
            }
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            std::process::exit(1);
        }
    }
}
