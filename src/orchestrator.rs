//! Underwriting orchestrator (C5, §4.5). The single public entry point,
//! mirroring the teacher's `run_udc`/`run_udc_with_config` split: a thin
//! convenience wrapper over a fully configurable core function, driving the
//! Run state machine and the transactional write sequence.

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::matcher;
use crate::persistence::{ApplicationStore, CatalogStore, RunStore};
use crate::rule_engine::RuleEngine;
use crate::types::{
    MatchResult, Money, Percent, Run, RunStatus, RuleEvaluationRecord, UnderwritingResult,
};

/// Orchestrator configuration (§5 concurrency model).
///
/// Unregistered rule kinds are always skipped rather than failing the run;
/// `RuleEngine::evaluate_program` is a pure function over its inputs and has
/// no error path to report a hard failure through (§9 Open Question (a)).
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Reserved for a future parallel-per-lender evaluation strategy; the
    /// core currently evaluates lenders sequentially (§5 permits but does
    /// not require parallelism, and the teacher's pipeline is sequential).
    pub max_parallelism: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig { max_parallelism: 1 }
    }
}

/// Cooperative cancellation signal, checked at each suspension point (§5).
pub trait CancellationToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels. The default when callers don't need it.
pub struct NeverCancelled;

impl CancellationToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Wires the application store, catalog store, run store, and rule engine
/// together into one orchestrator instance.
pub struct Orchestrator<'a> {
    pub application_store: &'a dyn ApplicationStore,
    pub catalog_store: &'a dyn CatalogStore,
    pub run_store: &'a dyn RunStore,
    pub clock: &'a dyn Clock,
    pub config: OrchestratorConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        application_store: &'a dyn ApplicationStore,
        catalog_store: &'a dyn CatalogStore,
        run_store: &'a dyn RunStore,
    ) -> Self {
        Orchestrator {
            application_store,
            catalog_store,
            run_store,
            clock: &SystemClock,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Main entry point (§4.5).
    pub fn run_underwriting(&self, application_id: Uuid) -> UnderwritingResult<Run> {
        self.run_underwriting_with_cancellation(application_id, serde_json::json!({}), &NeverCancelled)
    }

    /// Identical behavior, stamping `meta.rerun=true, meta.reason=<reason>`.
    pub fn rerun_underwriting(&self, application_id: Uuid, reason: Option<String>) -> UnderwritingResult<Run> {
        let meta = serde_json::json!({ "rerun": true, "reason": reason });
        self.run_underwriting_with_cancellation(application_id, meta, &NeverCancelled)
    }

    /// Full control over initial `meta` and cancellation source, used by both
    /// `run_underwriting` and `rerun_underwriting`.
    pub fn run_underwriting_with_cancellation(
        &self,
        application_id: Uuid,
        meta: serde_json::Value,
        cancellation: &dyn CancellationToken,
    ) -> UnderwritingResult<Run> {
        let run = self.run_store.create_run(application_id, meta)?;
        log::info!("orchestrator: created run {} for application {}", run.id, application_id);

        match self.execute(run.id, application_id, cancellation) {
            Ok(run) => Ok(run),
            Err(error) => {
                log::error!("orchestrator: run {} failed: {}", run.id, error);
                // Roll back partial writes before committing the Failed transition (§4.5).
                if let Err(rollback_error) = self.run_store.rollback_run(run.id) {
                    log::error!("orchestrator: rollback for run {} also failed: {}", run.id, rollback_error);
                }
                self.run_store.update_run_status(
                    run.id,
                    RunStatus::Failed,
                    None,
                    Some(self.clock.now()),
                    Some(error.to_string()),
                )?;
                Err(error)
            }
        }
    }

    fn execute(&self, run_id: Uuid, application_id: Uuid, cancellation: &dyn CancellationToken) -> UnderwritingResult<Run> {
        let started_at = self.clock.now();
        self.run_store
            .update_run_status(run_id, RunStatus::InProgress, Some(started_at), None, None)?;

        if cancellation.is_cancelled() {
            return self.cancel(run_id);
        }

        let context = self.application_store.get_application_context(application_id)?;

        if cancellation.is_cancelled() {
            return self.cancel(run_id);
        }

        let lenders = self.catalog_store.get_active_lenders()?;

        if cancellation.is_cancelled() {
            return self.cancel(run_id);
        }

        let engine = RuleEngine::new();
        let today = self.clock.today();
        let matches = matcher::run_matcher(
            &engine,
            &context.application,
            &context.business,
            &context.guarantor,
            &context.equipment,
            &lenders,
            today,
        );

        if cancellation.is_cancelled() {
            return self.cancel(run_id);
        }

        let programs_evaluated: i64 = lenders
            .iter()
            .map(|l| l.programs.iter().filter(|p| p.active).count() as i64)
            .sum();
        let matched = matches.iter().filter(|m| m.eligible).count() as i64;
        let rejected = matches.len() as i64 - matched;

        self.persist_matches(run_id, matches)?;

        if cancellation.is_cancelled() {
            return self.cancel(run_id);
        }

        self.run_store
            .update_run_summary(run_id, lenders.len() as i64, programs_evaluated, matched, rejected)?;

        if context.application.status == crate::types::ApplicationStatus::Submitted {
            self.application_store.promote_to_underwriting(application_id)?;
        }

        let completed_at = self.clock.now();
        self.run_store
            .update_run_status(run_id, RunStatus::Completed, None, Some(completed_at), None)?;

        self.run_store.get_run(run_id)
    }

    fn persist_matches(&self, run_id: Uuid, matches: Vec<matcher::Match>) -> UnderwritingResult<()> {
        let created_at = self.clock.now();
        let mut records = Vec::with_capacity(matches.len());
        let mut per_match_rules = Vec::with_capacity(matches.len());

        for m in matches {
            let id = Uuid::new_v4();
            let mandatory_rules_passed = m
                .rule_evaluations
                .iter()
                .filter(|(rule, _)| rule.mandatory)
                .all(|(_, outcome)| outcome.passed);

            let rule_records: Vec<RuleEvaluationRecord> = m
                .rule_evaluations
                .iter()
                .map(|(rule, outcome)| RuleEvaluationRecord {
                    id: Uuid::new_v4(),
                    match_result_id: id,
                    rule_id: Some(rule.id),
                    rule_name: rule.rule_name.clone(),
                    rule_type: rule.kind.to_string(),
                    passed: outcome.passed,
                    score: outcome.score,
                    weight: outcome.weight,
                    is_mandatory: rule.mandatory,
                    reason: Some(outcome.reason.clone()),
                    evidence: outcome.evidence.clone(),
                })
                .collect();

            records.push(MatchResult {
                id,
                run_id,
                lender_id: m.lender_id,
                program_id: m.program_id,
                is_eligible: m.eligible,
                fit_score: Percent::new(m.fit_score),
                rejection_reason: m.rejection_reason,
                rejection_tier: m.rejection_tier,
                estimated_rate: m.estimated_rate.map(Percent::new),
                estimated_monthly_payment: m.monthly_payment.map(Money::new),
                approval_probability: m.approval_probability.map(Percent::new),
                counters: crate::types::RuleCounters {
                    total_rules: rule_records.len() as i64,
                    rules_passed: rule_records.iter().filter(|r| r.passed).count() as i64,
                    rules_failed: rule_records.iter().filter(|r| !r.passed).count() as i64,
                },
                mandatory_rules_passed,
                created_at,
            });
            per_match_rules.push((id, rule_records));
        }

        self.run_store.batch_insert_match_results(run_id, records)?;
        for (match_id, rule_records) in per_match_rules {
            if !rule_records.is_empty() {
                self.run_store.batch_insert_rule_evaluations(match_id, rule_records)?;
            }
        }
        Ok(())
    }

    fn cancel(&self, run_id: Uuid) -> UnderwritingResult<Run> {
        self.run_store.rollback_run(run_id)?;
        self.run_store
            .update_run_status(run_id, RunStatus::Cancelled, None, Some(self.clock.now()), None)?;
        self.run_store.get_run(run_id)
    }
}

/// Convenience free function matching the teacher's `run_udc` top-level
/// wrapper around a `RuleEngine` + stores bundle.
pub fn run_underwriting(
    application_store: &dyn ApplicationStore,
    catalog_store: &dyn CatalogStore,
    run_store: &dyn RunStore,
    application_id: Uuid,
) -> UnderwritingResult<Run> {
    Orchestrator::new(application_store, catalog_store, run_store).run_underwriting(application_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryStore;
    use crate::types::{
        Application, ApplicationContext, ApplicationStatus, Business, Equipment,
        EquipmentCondition, EligibilityConditions, Guarantor, LegalStructure, Lender, Program,
        RateMetadata,
    };
    use rust_decimal_macros::dec;

    fn fixture() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let application_id = Uuid::new_v4();
        store.insert_application(ApplicationContext {
            application: Application {
                id: application_id,
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
            business: Business {
                id: Uuid::new_v4(),
                legal_structure: LegalStructure::Llc,
                industry: "Construction".into(),
                established_date: chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                annual_revenue: Some(dec!(500000)),
                state: "TX".into(),
                city: "Austin".into(),
                zip: "78701".into(),
            },
            guarantor: Guarantor {
                id: Uuid::new_v4(),
                fico_score: Some(700),
                paynet_score: None,
                credit_utilization_percent: None,
                has_bankruptcy: false,
                bankruptcy_discharge_date: None,
                is_homeowner: true,
                is_us_citizen: true,
            },
            equipment: Equipment {
                id: Uuid::new_v4(),
                equipment_type: "Excavator".into(),
                condition: EquipmentCondition::New,
                cost: dec!(100000),
                year_manufactured: None,
            },
        });
        store.insert_lender(Lender {
            id: Uuid::new_v4(),
            name: "L1".into(),
            active: true,
            min_loan_amount: None,
            max_loan_amount: None,
            excluded_states: vec![],
            excluded_industries: vec![],
            programs: vec![Program {
                id: Uuid::new_v4(),
                lender_id: Uuid::new_v4(),
                name: "Prime".into(),
                eligibility: EligibilityConditions::default(),
                rate_metadata: RateMetadata::default(),
                min_fit_score: dec!(0),
                active: true,
                credit_tier: None,
                rules: vec![],
                created_order: 0,
            }],
        });
        (store, application_id)
    }

    #[test]
    fn run_underwriting_completes_and_promotes_application() {
        let (store, application_id) = fixture();
        let orchestrator = Orchestrator::new(&store, &store, &store);

        let run = orchestrator.run_underwriting(application_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.totals.lenders_evaluated, 1);
        assert_eq!(run.totals.matched, 1);

        let context = store.get_application_context(application_id).unwrap();
        assert_eq!(context.application.status, ApplicationStatus::InUnderwriting);
    }

    #[test]
    fn rerun_underwriting_stamps_meta() {
        let (store, application_id) = fixture();
        let orchestrator = Orchestrator::new(&store, &store, &store);

        let run = orchestrator.rerun_underwriting(application_id, Some("retry after catalog update".into())).unwrap();
        assert_eq!(run.meta["rerun"], serde_json::json!(true));
        assert_eq!(run.meta["reason"], serde_json::json!("retry after catalog update"));
    }

    #[test]
    fn run_underwriting_fails_for_unknown_application() {
        let store = InMemoryStore::new();
        let orchestrator = Orchestrator::new(&store, &store, &store);

        let result = orchestrator.run_underwriting(Uuid::new_v4());
        assert!(result.is_err());
    }
}
