//! Injected time source.
//!
//! Rule evaluators and scorers are pure functions of their inputs (§5); they
//! must not read a global clock. Every call site that needs "now" takes a
//! `&dyn Clock` instead, mirroring how the calculation core threads other
//! contextual inputs explicitly rather than reaching for ambient state.

use chrono::{DateTime, NaiveDate, Utc};

/// A source of the current date/time, injected into evaluators that need it
/// (`time_in_business`, `equipment_age`) and into the orchestrator for run
/// timestamps.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub fixed_now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(fixed_now: DateTime<Utc>) -> Self {
        FixedClock { fixed_now }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.fixed_now.date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now
    }
}
