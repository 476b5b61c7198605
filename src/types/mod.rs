//! Type definitions for the underwriting matching core.
//!
//! # Module Organization
//!
//! - `application` - Application, Business, Guarantor, Equipment (the request)
//! - `lender` - Lender, Program, Rule, rate metadata (the catalog)
//! - `run` - Run, MatchResult, RuleEvaluationRecord (the output)
//! - `money` - Precise financial primitives (Money, Percent)

pub mod application;
pub mod lender;
pub mod money;
pub mod run;

pub use application::{
    Application, ApplicationContext, ApplicationStatus, Business, Equipment, EquipmentCondition,
    Guarantor, LegalStructure,
};
pub use lender::{
    AdjustmentRow, BaseRateRow, EligibilityConditions, Lender, Program, RateMetadata, Rule,
    RuleKind,
};
pub use money::{Money, Percent};
pub use run::{
    MatchResult, RejectionTier, Run, RuleCounters, RuleEvaluationRecord, RunStatus, RunTotals,
};

use thiserror::Error;

/// Error kinds the core distinguishes (§7).
#[derive(Debug, Clone, Error)]
pub enum UnderwritingError {
    #[error("not found: {entity} {id}")]
    NotFound { entity: String, id: String },

    #[error("precondition failed: {message}")]
    PreconditionFailed { message: String },

    #[error("bad rule criteria: {message}")]
    BadRuleCriteria { message: String },

    #[error("evaluator error: {message}")]
    EvaluatorError { message: String },

    #[error("persistence error: {message}")]
    PersistenceError { message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl UnderwritingError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        UnderwritingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        UnderwritingError::PreconditionFailed {
            message: message.into(),
        }
    }

    pub fn bad_rule_criteria(message: impl Into<String>) -> Self {
        UnderwritingError::BadRuleCriteria {
            message: message.into(),
        }
    }

    pub fn evaluator_error(message: impl Into<String>) -> Self {
        UnderwritingError::EvaluatorError {
            message: message.into(),
        }
    }

    pub fn persistence_error(message: impl Into<String>) -> Self {
        UnderwritingError::PersistenceError {
            message: message.into(),
        }
    }
}

/// Result type alias for underwriting-core operations.
pub type UnderwritingResult<T> = Result<T, UnderwritingError>;
