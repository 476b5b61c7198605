//! Lender, Program, and Rule — the catalog side of the data model (§3).
//! Owned top-down: `Lender` → `Program` → `Rule`, a tree with no cycles,
//! cascade-delete downward.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The rule kind tag (§4.1). Carried alongside an open `criteria` mapping on
/// [`Rule`]; each evaluator parses the subset of keys it needs out of that
/// mapping and reports `BadRuleCriteria` (never a panic) when a required key
/// is missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    MinFico,
    MinPaynet,
    CreditTier,
    MaxCreditUtilization,
    TimeInBusiness,
    MinRevenue,
    LegalStructure,
    MinLoanAmount,
    MaxLoanAmount,
    MinLoanTerm,
    MaxLoanTerm,
    MinDownPayment,
    MaxLtv,
    EquipmentType,
    EquipmentAge,
    EquipmentCondition,
    ExcludedStates,
    ExcludedIndustries,
    AllowedStates,
    AllowedIndustries,
}

/// A single typed, weighted policy predicate belonging to one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub program_id: Uuid,
    pub kind: RuleKind,
    pub rule_name: String,
    /// Open mapping; required keys depend on `kind` (§4.1).
    pub criteria: serde_json::Value,
    #[serde(default = "Rule::default_weight")]
    pub weight: Decimal,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default = "Rule::default_active")]
    pub active: bool,
}

impl Rule {
    fn default_weight() -> Decimal {
        rust_decimal_macros::dec!(1.00)
    }

    fn default_active() -> bool {
        true
    }

    /// Fetch a required criteria key, surfacing a `BadRuleCriteria`-shaped
    /// error message (not a panic) when absent or the wrong shape.
    pub fn criteria_str<'a>(&'a self, key: &str) -> Result<&'a str, String> {
        self.criteria
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("criteria '{key}' missing or not a string"))
    }
}

/// One row of a base-rate table. Inclusive bounds on both amount and term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRateRow {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub rate: Decimal,
    #[serde(default)]
    pub min_term: Option<i32>,
    #[serde(default)]
    pub max_term: Option<i32>,
}

/// One conditional rate adjustment (§4.4 grammar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRow {
    pub condition: String,
    pub delta: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rate metadata attached to a program: an ordered base-rate table and a
/// list of conditional adjustments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateMetadata {
    #[serde(default)]
    pub base_rates: Vec<BaseRateRow>,
    #[serde(default)]
    pub adjustments: Vec<AdjustmentRow>,
}

/// Tier-2 program eligibility conditions (§4.3 table). Unknown keys in the
/// source mapping are ignored for forward compatibility — represented here
/// simply as absent fields (`#[serde(default)]` everywhere).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EligibilityConditions {
    #[serde(default)]
    pub requires_paynet: Option<bool>,
    #[serde(default)]
    pub legal_structure: Option<Vec<String>>,
    #[serde(default)]
    pub industry: Option<Vec<String>>,
    #[serde(default)]
    pub min_revenue: Option<Decimal>,
    #[serde(default)]
    pub homeowner_required: Option<bool>,
    #[serde(default)]
    pub us_citizen_required: Option<bool>,
}

/// A tier within a lender: "Prime", "Medical A+", etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub lender_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub eligibility: EligibilityConditions,
    #[serde(default)]
    pub rate_metadata: RateMetadata,
    #[serde(default = "Program::default_min_fit_score")]
    pub min_fit_score: Decimal,
    #[serde(default = "Program::default_active")]
    pub active: bool,
    /// Opaque label, not interpreted by the core.
    #[serde(default)]
    pub credit_tier: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Insertion order; used as the Tier-3 tie-break (§4.3).
    #[serde(default)]
    pub created_order: i64,
}

impl Program {
    fn default_min_fit_score() -> Decimal {
        rust_decimal_macros::dec!(0.00)
    }

    fn default_active() -> bool {
        true
    }
}

/// An entity that may finance an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lender {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "Lender::default_active")]
    pub active: bool,
    #[serde(default)]
    pub min_loan_amount: Option<Decimal>,
    #[serde(default)]
    pub max_loan_amount: Option<Decimal>,
    /// Two-letter state codes, uppercase.
    #[serde(default)]
    pub excluded_states: Vec<String>,
    #[serde(default)]
    pub excluded_industries: Vec<String>,
    #[serde(default)]
    pub programs: Vec<Program>,
}

impl Lender {
    fn default_active() -> bool {
        true
    }
}
