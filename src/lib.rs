//! # Underwriting Matching Core
//!
//! A pure Rust decision engine for matching equipment-financing loan
//! applications against a catalog of lenders and their programs.
//!
//! - **Rule evaluators** — typed, weighted policy predicates (credit,
//!   business, loan, equipment, geographic families) with linear partial
//!   credit near a threshold.
//! - **Rule engine** — aggregates one program's active rules into a fit
//!   score and an eligibility verdict.
//! - **Rate & probability scorer** — base-rate resolution, a small condition
//!   grammar for rate adjustments, and a piecewise-linear approval-probability
//!   heuristic.
//! - **Three-tier matcher** — lender-level filtering, program eligibility,
//!   then rule evaluation, with early exit and a stamped rejection tier.
//! - **Orchestrator** — the Run lifecycle: Pending → InProgress →
//!   {Completed, Failed}, with rollback-on-failure and cooperative
//!   cancellation.
//! - **Persistence contracts** — dependency-injected repository traits; an
//!   in-memory implementation is included for tests and as a reference.
//!
//! ## Architecture
//!
//! ```text
//! Application + Catalog -> C4 Matcher
//!                            |-- Tier 1: lender fast filter
//!                            |-- Tier 2: program eligibility
//!                            |-- Tier 3: C2 Rule engine -> C1 Rule evaluators
//!                            `-- C3 Rate & probability scorer
//!                          -> MatchResult[] (C5 Orchestrator persists via C6)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use underwriting_core::orchestrator::Orchestrator;
//! use underwriting_core::persistence::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! // ... populate store.insert_application / store.insert_lender ...
//!
//! let orchestrator = Orchestrator::new(&store, &store, &store);
//! let run = orchestrator.run_underwriting(application_id)?;
//! println!("status: {}", run.status);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod clock;
pub mod matcher;
pub mod orchestrator;
pub mod persistence;
pub mod rule_engine;
pub mod rules;
pub mod scoring;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use matcher::{run_matcher, Match};
pub use orchestrator::{CancellationToken, NeverCancelled, Orchestrator, OrchestratorConfig};
pub use rule_engine::{ProgramEvaluation, RuleEngine};

pub use types::{
    AdjustmentRow, Application, ApplicationContext, ApplicationStatus, BaseRateRow, Business,
    EligibilityConditions, Equipment, EquipmentCondition, Guarantor, Lender, LegalStructure,
    MatchResult, Money, Percent, Program, RateMetadata, RejectionTier, Rule, RuleCounters,
    RuleEvaluationRecord, RuleKind, Run, RunStatus, RunTotals, UnderwritingError,
    UnderwritingResult,
};

/// Prelude module for convenient imports.
pub mod prelude {
    //! Commonly used types and traits.
    //!
    //! ```rust,ignore
    //! use underwriting_core::prelude::*;
    //! ```

    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::matcher::{run_matcher, Match};
    pub use crate::orchestrator::{Orchestrator, OrchestratorConfig};
    pub use crate::persistence::{ApplicationStore, CatalogStore, InMemoryStore, RunStore};
    pub use crate::rule_engine::{ProgramEvaluation, RuleEngine};
    pub use crate::types::{
        Application, ApplicationContext, Lender, Money, Percent, Rule, Run, UnderwritingError,
        UnderwritingResult,
    };

    pub use rust_decimal::Decimal;
    pub use rust_decimal_macros::dec;
}
