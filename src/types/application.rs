//! Application, Business, Guarantor, and Equipment — the request side of the
//! data model (§3). These are read-only inputs to the matcher; the core
//! never mutates them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Legal structure of the applicant business.
///
/// Wire form is the canonical string from §3 (`LLC`, `S-Corp`, ...), not a
/// snake_case derivation — catalog-authored eligibility lists compare
/// against these literally (see `rules::business::eval_legal_structure`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum LegalStructure {
    #[strum(serialize = "LLC")]
    #[serde(rename = "LLC")]
    Llc,
    #[strum(serialize = "Corporation")]
    #[serde(rename = "Corporation")]
    Corporation,
    #[strum(serialize = "S-Corp")]
    #[serde(rename = "S-Corp")]
    SCorp,
    #[strum(serialize = "C-Corp")]
    #[serde(rename = "C-Corp")]
    CCorp,
    #[strum(serialize = "Partnership")]
    #[serde(rename = "Partnership")]
    Partnership,
    #[strum(serialize = "Sole-Prop")]
    #[serde(rename = "Sole-Prop")]
    SoleProp,
    #[strum(serialize = "Non-Profit")]
    #[serde(rename = "Non-Profit")]
    NonProfit,
    #[strum(serialize = "Other")]
    #[serde(rename = "Other")]
    Other,
}

/// Equipment physical condition.
///
/// Wire form is the canonical string from §3, not a snake_case derivation —
/// see `rules::equipment::eval_equipment_condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum EquipmentCondition {
    #[strum(serialize = "New")]
    #[serde(rename = "New")]
    New,
    #[strum(serialize = "Used")]
    #[serde(rename = "Used")]
    Used,
    #[strum(serialize = "Refurbished")]
    #[serde(rename = "Refurbished")]
    Refurbished,
    #[strum(serialize = "Certified-Pre-Owned")]
    #[serde(rename = "Certified-Pre-Owned")]
    CertifiedPreOwned,
}

/// Status of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    InUnderwriting,
    Approved,
    Declined,
    Withdrawn,
}

/// Legal entity applying for financing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub legal_structure: LegalStructure,
    pub industry: String,
    pub established_date: NaiveDate,
    #[serde(default)]
    pub annual_revenue: Option<Decimal>,
    /// Two-letter state code, always uppercase.
    pub state: String,
    pub city: String,
    pub zip: String,
}

impl Business {
    /// Months between `established_date` and `today`. Never negative.
    pub fn months_in_business(&self, today: NaiveDate) -> i64 {
        use chrono::Datelike;
        let years = (today.year() - self.established_date.year()) as i64;
        let months = years * 12 + (today.month() as i64 - self.established_date.month() as i64)
            - if today.day() < self.established_date.day() { 1 } else { 0 };
        months.max(0)
    }
}

/// Personal guarantor co-signing the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guarantor {
    pub id: Uuid,
    /// FICO score, 300-850 when present.
    #[serde(default)]
    pub fico_score: Option<i32>,
    /// PayNet MasterScore, 1-100 when present.
    #[serde(default)]
    pub paynet_score: Option<i32>,
    #[serde(default)]
    pub credit_utilization_percent: Option<Decimal>,
    #[serde(default)]
    pub has_bankruptcy: bool,
    #[serde(default)]
    pub bankruptcy_discharge_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_homeowner: bool,
    #[serde(default)]
    pub is_us_citizen: bool,
}

/// The asset being financed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Uuid,
    pub equipment_type: String,
    pub condition: EquipmentCondition,
    /// Must be > 0.
    pub cost: Decimal,
    #[serde(default)]
    pub year_manufactured: Option<i32>,
}

impl Equipment {
    /// Age in years as of `today`. `None` means age is undefined (used/refurbished/CPO
    /// equipment with no manufacture year on record) — evaluators treat this as a
    /// hard failure requiring the year, per §4.1 `equipment_age`.
    pub fn age_years(&self, today: NaiveDate) -> Option<i32> {
        use chrono::Datelike;
        match self.year_manufactured {
            Some(year) => Some((today.year() - year).max(0)),
            None if self.condition == EquipmentCondition::New => Some(0),
            None => None,
        }
    }
}

/// The request being underwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub requested_amount: Decimal,
    pub requested_term_months: i32,
    #[serde(default)]
    pub down_payment_percentage: Option<Decimal>,
    #[serde(default)]
    pub down_payment_amount: Option<Decimal>,
    #[serde(default)]
    pub comparable_debt_payments: Option<Decimal>,
    pub status: ApplicationStatus,
    pub business_id: Uuid,
    pub guarantor_id: Uuid,
    pub equipment_id: Uuid,
}

impl Application {
    /// Resolved down payment amount per the §3 invariant: when only a
    /// percentage is given, derive `amount = requested × percentage / 100`;
    /// when both are given the amount must not exceed the requested amount
    /// (callers validate this at catalog/application load time).
    pub fn down_payment(&self) -> Decimal {
        match (self.down_payment_amount, self.down_payment_percentage) {
            (Some(amount), _) => amount,
            (None, Some(pct)) => self.requested_amount * pct / dec!(100),
            (None, None) => dec!(0),
        }
    }

    /// Down payment expressed as a percentage of the requested amount.
    pub fn down_payment_pct(&self) -> Decimal {
        if self.requested_amount == dec!(0) {
            return dec!(0);
        }
        match self.down_payment_percentage {
            Some(pct) => pct,
            None => (self.down_payment() / self.requested_amount) * dec!(100),
        }
    }
}

/// Fully-loaded application aggregate as handed to the matcher: the
/// application plus its eagerly-loaded business/guarantor/equipment,
/// matching the "core never issues N+1 reads" contract in §6.
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    pub application: Application,
    pub business: Business,
    pub guarantor: Guarantor,
    pub equipment: Equipment,
}
