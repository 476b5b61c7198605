//! Persistence contracts (C6, §4.6). Dependency-injected repository traits,
//! mirroring the teacher's `ProfileRepository` pattern: the core depends on
//! these traits, never on a concrete store, so callers can swap in whatever
//! backend they run in production. An in-memory implementation is provided
//! for tests and as a reference.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{
    ApplicationContext, ApplicationStatus, Lender, MatchResult, Run, RunStatus,
    RuleEvaluationRecord, UnderwritingError, UnderwritingResult,
};

/// Read access to the application graph the orchestrator needs eagerly
/// loaded before invoking C4 (§6: "core never issues N+1 reads").
pub trait ApplicationStore: Send + Sync {
    fn get_application_context(&self, application_id: Uuid) -> UnderwritingResult<ApplicationContext>;

    /// Promote `Submitted → InUnderwriting` (§4.5). No-op if status differs.
    fn promote_to_underwriting(&self, application_id: Uuid) -> UnderwritingResult<()>;
}

/// Read access to the lender catalog, eagerly loaded with programs and rules.
pub trait CatalogStore: Send + Sync {
    fn get_active_lenders(&self) -> UnderwritingResult<Vec<Lender>>;
}

/// Writes and reads exposed to C5 (§4.6).
pub trait RunStore: Send + Sync {
    fn create_run(&self, application_id: Uuid, meta: serde_json::Value) -> UnderwritingResult<Run>;

    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> UnderwritingResult<()>;

    fn update_run_summary(
        &self,
        run_id: Uuid,
        lenders_evaluated: i64,
        programs_evaluated: i64,
        matched: i64,
        rejected: i64,
    ) -> UnderwritingResult<()>;

    /// Atomic with respect to the run. Returns identifiers in input order.
    fn batch_insert_match_results(&self, run_id: Uuid, results: Vec<MatchResult>) -> UnderwritingResult<Vec<Uuid>>;

    /// Ordering within one match is the evaluation order produced by C2.
    fn batch_insert_rule_evaluations(&self, match_id: Uuid, evaluations: Vec<RuleEvaluationRecord>) -> UnderwritingResult<Vec<Uuid>>;

    fn get_run(&self, run_id: Uuid) -> UnderwritingResult<Run>;

    fn get_latest_for_application(&self, application_id: Uuid) -> UnderwritingResult<Option<Run>>;

    /// Rejected matches ordered by `(rejection_tier asc, created_at asc)`;
    /// matched ordered by `fit_score desc`.
    fn get_run_with_results(&self, run_id: Uuid) -> UnderwritingResult<Vec<MatchResult>>;

    /// Eligible-only slice of `get_run_with_results`, same order.
    fn get_matched(&self, run_id: Uuid) -> UnderwritingResult<Vec<MatchResult>> {
        Ok(self.get_run_with_results(run_id)?.into_iter().filter(|m| m.is_eligible).collect())
    }

    /// Ineligible-only slice of `get_run_with_results`, same order.
    fn get_rejected(&self, run_id: Uuid) -> UnderwritingResult<Vec<MatchResult>> {
        Ok(self.get_run_with_results(run_id)?.into_iter().filter(|m| !m.is_eligible).collect())
    }

    fn get_rule_evaluations(&self, match_id: Uuid) -> UnderwritingResult<Vec<RuleEvaluationRecord>>;

    /// Roll back every write this store recorded for `run_id` since the run
    /// began. Used on the Failed/Cancelled path (§4.5, §5).
    fn rollback_run(&self, run_id: Uuid) -> UnderwritingResult<()>;
}

/// An in-memory catalog/application/run store. Not meant for production use
/// beyond demonstrating the contract; callers own their own backend.
#[derive(Default)]
pub struct InMemoryStore {
    applications: Mutex<HashMap<Uuid, ApplicationContext>>,
    lenders: Mutex<Vec<Lender>>,
    runs: Mutex<HashMap<Uuid, Run>>,
    matches: Mutex<HashMap<Uuid, Vec<MatchResult>>>,
    rule_evaluations: Mutex<HashMap<Uuid, Vec<RuleEvaluationRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_application(&self, context: ApplicationContext) {
        self.applications.lock().unwrap().insert(context.application.id, context);
    }

    pub fn insert_lender(&self, lender: Lender) {
        self.lenders.lock().unwrap().push(lender);
    }
}

impl ApplicationStore for InMemoryStore {
    fn get_application_context(&self, application_id: Uuid) -> UnderwritingResult<ApplicationContext> {
        self.applications
            .lock()
            .unwrap()
            .get(&application_id)
            .cloned()
            .ok_or_else(|| UnderwritingError::not_found("application", application_id.to_string()))
    }

    fn promote_to_underwriting(&self, application_id: Uuid) -> UnderwritingResult<()> {
        let mut applications = self.applications.lock().unwrap();
        let context = applications
            .get_mut(&application_id)
            .ok_or_else(|| UnderwritingError::not_found("application", application_id.to_string()))?;
        if context.application.status == ApplicationStatus::Submitted {
            context.application.status = ApplicationStatus::InUnderwriting;
        }
        Ok(())
    }
}

impl CatalogStore for InMemoryStore {
    fn get_active_lenders(&self) -> UnderwritingResult<Vec<Lender>> {
        Ok(self.lenders.lock().unwrap().iter().filter(|l| l.active).cloned().collect())
    }
}

impl RunStore for InMemoryStore {
    fn create_run(&self, application_id: Uuid, meta: serde_json::Value) -> UnderwritingResult<Run> {
        let run = Run::new_pending(Uuid::new_v4(), application_id, meta, Utc::now());
        self.runs.lock().unwrap().insert(run.id, run.clone());
        Ok(run)
    }

    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> UnderwritingResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(&run_id)
            .ok_or_else(|| UnderwritingError::not_found("run", run_id.to_string()))?;
        run.status = status;
        if let Some(started_at) = started_at {
            run.started_at = Some(started_at);
        }
        if let Some(completed_at) = completed_at {
            run.completed_at = Some(completed_at);
        }
        if error_message.is_some() {
            run.error_message = error_message;
        }
        Ok(())
    }

    fn update_run_summary(
        &self,
        run_id: Uuid,
        lenders_evaluated: i64,
        programs_evaluated: i64,
        matched: i64,
        rejected: i64,
    ) -> UnderwritingResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(&run_id)
            .ok_or_else(|| UnderwritingError::not_found("run", run_id.to_string()))?;
        run.totals.lenders_evaluated = lenders_evaluated;
        run.totals.programs_evaluated = programs_evaluated;
        run.totals.matched = matched;
        run.totals.rejected = rejected;
        Ok(())
    }

    fn batch_insert_match_results(&self, run_id: Uuid, results: Vec<MatchResult>) -> UnderwritingResult<Vec<Uuid>> {
        let ids = results.iter().map(|r| r.id).collect();
        self.matches.lock().unwrap().entry(run_id).or_default().extend(results);
        Ok(ids)
    }

    fn batch_insert_rule_evaluations(&self, match_id: Uuid, evaluations: Vec<RuleEvaluationRecord>) -> UnderwritingResult<Vec<Uuid>> {
        let ids = evaluations.iter().map(|e| e.id).collect();
        self.rule_evaluations.lock().unwrap().entry(match_id).or_default().extend(evaluations);
        Ok(ids)
    }

    fn get_run(&self, run_id: Uuid) -> UnderwritingResult<Run> {
        self.runs
            .lock()
            .unwrap()
            .get(&run_id)
            .cloned()
            .ok_or_else(|| UnderwritingError::not_found("run", run_id.to_string()))
    }

    fn get_latest_for_application(&self, application_id: Uuid) -> UnderwritingResult<Option<Run>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs
            .values()
            .filter(|r| r.application_id == application_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    fn get_run_with_results(&self, run_id: Uuid) -> UnderwritingResult<Vec<MatchResult>> {
        let mut results = self.matches.lock().unwrap().get(&run_id).cloned().unwrap_or_default();
        results.sort_by(|a, b| match (a.is_eligible, b.is_eligible) {
            (true, true) => b.fit_score.cmp(&a.fit_score),
            (false, false) => a
                .rejection_tier
                .cmp(&b.rejection_tier)
                .then(a.created_at.cmp(&b.created_at)),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
        });
        Ok(results)
    }

    fn get_rule_evaluations(&self, match_id: Uuid) -> UnderwritingResult<Vec<RuleEvaluationRecord>> {
        Ok(self.rule_evaluations.lock().unwrap().get(&match_id).cloned().unwrap_or_default())
    }

    fn rollback_run(&self, run_id: Uuid) -> UnderwritingResult<()> {
        let match_ids: Vec<Uuid> = self
            .matches
            .lock()
            .unwrap()
            .remove(&run_id)
            .map(|ms| ms.iter().map(|m| m.id).collect())
            .unwrap_or_default();
        let mut rule_evaluations = self.rule_evaluations.lock().unwrap();
        for match_id in match_ids {
            rule_evaluations.remove(&match_id);
        }
        Ok(())
    }
}
