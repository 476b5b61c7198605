//! Run, MatchResult, and RuleEvaluation — the output side of the data model
//! (§3). Created together in one transaction per execution (§4.6) and never
//! mutated afterwards, except the run's terminal-status fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::money::{Money, Percent};

/// Run lifecycle state (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// Aggregate run totals, updated once at the end of a successful execution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunTotals {
    pub lenders_evaluated: i64,
    pub programs_evaluated: i64,
    pub matched: i64,
    pub rejected: i64,
}

/// One execution of the matcher for one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub application_id: Uuid,
    pub status: RunStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub totals: RunTotals,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Free-form metadata, e.g. `{"rerun": true, "reason": "..."}`.
    #[serde(default)]
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Run {
    pub fn new_pending(id: Uuid, application_id: Uuid, meta: serde_json::Value, created_at: DateTime<Utc>) -> Self {
        Run {
            id,
            application_id,
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            totals: RunTotals::default(),
            error_message: None,
            meta,
            created_at,
        }
    }
}

/// Rejection tier: 1 (lender-level exclusion), 2 (no program applies), 3
/// (rules failed or score below floor); `None` when eligible.
pub type RejectionTier = Option<u8>;

/// Per-rule counters carried on a match result for quick reporting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleCounters {
    pub total_rules: i64,
    pub rules_passed: i64,
    pub rules_failed: i64,
}

/// One (run, lender) outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: Uuid,
    pub run_id: Uuid,
    pub lender_id: Uuid,
    #[serde(default)]
    pub program_id: Option<Uuid>,
    pub is_eligible: bool,
    pub fit_score: Percent,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejection_tier: RejectionTier,
    #[serde(default)]
    pub estimated_rate: Option<Percent>,
    #[serde(default)]
    pub estimated_monthly_payment: Option<Money>,
    #[serde(default)]
    pub approval_probability: Option<Percent>,
    #[serde(default)]
    pub counters: RuleCounters,
    pub mandatory_rules_passed: bool,
    pub created_at: DateTime<Utc>,
}

/// One (match result, evaluated rule) outcome, denormalized so it survives
/// deletion of the originating rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluationRecord {
    pub id: Uuid,
    pub match_result_id: Uuid,
    /// Nulled if the originating rule was later deleted; the denormalized
    /// name/kind below persist regardless.
    #[serde(default)]
    pub rule_id: Option<Uuid>,
    pub rule_name: String,
    pub rule_type: String,
    pub passed: bool,
    pub score: Decimal,
    pub weight: Decimal,
    pub is_mandatory: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub evidence: serde_json::Value,
}
