use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tables::{IrmaaTable, TaxBracketSet};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilingStatus {
    #[default]
    #[serde(alias = "married_joint", alias = "mfj", alias = "joint")]
    MarriedJoint,
    Single,
}

impl FilingStatus {
    pub fn household_size(self) -> u32 {
        match self {
            FilingStatus::MarriedJoint => 2,
            FilingStatus::Single => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeirStrategy {
    #[serde(alias = "lump_sum_year0", alias = "lump-sum-year0")]
    LumpSumYear0,
    #[default]
    #[serde(alias = "rmd_based", alias = "rmd-based", alias = "even", alias = "year10")]
    RmdBased,
}

impl HeirStrategy {
    pub fn alternate(self) -> Self {
        match self {
            HeirStrategy::LumpSumYear0 => HeirStrategy::RmdBased,
            HeirStrategy::RmdBased => HeirStrategy::LumpSumYear0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ReturnMode {
    #[serde(rename_all = "camelCase")]
    Flat {
        after_tax: f64,
        traditional: f64,
        tax_free: f64,
    },
    // Cumulative dollar targets; the high band takes the remainder.
    #[serde(rename_all = "camelCase")]
    BlendedRisk {
        low_rate: f64,
        moderate_rate: f64,
        high_rate: f64,
        low_target: f64,
        moderate_target: f64,
    },
}

impl Default for ReturnMode {
    fn default() -> Self {
        ReturnMode::Flat {
            after_tax: 0.06,
            traditional: 0.06,
            tax_free: 0.06,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivorEvent {
    pub death_year: i32,
    #[serde(default = "default_benefit_fraction")]
    pub benefit_fraction: f64,
    #[serde(default = "default_expense_fraction")]
    pub expense_fraction: f64,
}

fn default_benefit_fraction() -> f64 {
    0.6
}

fn default_expense_fraction() -> f64 {
    0.7
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timeline {
    pub start_year: i32,
    pub end_year: i32,
    pub birth_year: i32,
    pub survivor: Option<SurvivorEvent>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            start_year: 2025,
            end_year: 2060,
            birth_year: 1960,
            survivor: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartingBalances {
    pub after_tax: f64,
    pub after_tax_basis: Option<f64>,
    pub traditional: f64,
    pub tax_free: f64,
}

impl Default for StartingBalances {
    fn default() -> Self {
        Self {
            after_tax: 500_000.0,
            after_tax_basis: None,
            traditional: 1_000_000.0,
            tax_free: 250_000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeAssumptions {
    pub social_security: f64,
    pub social_security_cola: f64,
}

impl Default for IncomeAssumptions {
    fn default() -> Self {
        Self {
            social_security: 48_000.0,
            social_security_cola: 0.025,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpenseAssumptions {
    pub base: f64,
    pub inflation: f64,
    pub overrides: BTreeMap<i32, f64>,
}

impl Default for ExpenseAssumptions {
    fn default() -> Self {
        Self {
            base: 120_000.0,
            inflation: 0.025,
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBrackets {
    pub ordinary: TaxBracketSet,
    pub capital_gains: TaxBracketSet,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MagiHistory {
    pub two_years_ago: f64,
    pub one_year_ago: f64,
}

impl MagiHistory {
    pub fn lookback(self) -> f64 {
        self.two_years_ago
    }

    pub fn advance(self, current_magi: f64) -> Self {
        Self {
            two_years_ago: self.one_year_ago,
            one_year_ago: current_magi,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxSettings {
    pub state_rate: f64,
    pub bracket_inflation: f64,
    pub capital_gains_fraction: f64,
    pub custom_brackets: Option<CustomBrackets>,
    pub custom_irmaa: Option<IrmaaTable>,
    pub magi_history: MagiHistory,
    pub property_tax: f64,
    pub property_tax_credit_rate: f64,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            state_rate: 0.05,
            bracket_inflation: 0.025,
            capital_gains_fraction: 0.5,
            custom_brackets: None,
            custom_irmaa: None,
            magi_history: MagiHistory {
                two_years_ago: 150_000.0,
                one_year_ago: 150_000.0,
            },
            property_tax: 0.0,
            property_tax_credit_rate: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverSettings {
    pub max_iterations: u32,
    pub tolerance: f64,
    pub iterative: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            tolerance: 100.0,
            iterative: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeirConfig {
    pub name: String,
    pub state: String,
    pub income_level: f64,
    pub split_percent: f64,
    pub birth_year: i32,
    pub reinvestment_rate: f64,
    pub filing_status: FilingStatus,
}

impl Default for HeirConfig {
    fn default() -> Self {
        Self {
            name: "Heir 1".to_string(),
            state: "CA".to_string(),
            income_level: 150_000.0,
            split_percent: 100.0,
            birth_year: 1990,
            reinvestment_rate: 0.06,
            filing_status: FilingStatus::MarriedJoint,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParameters {
    pub timeline: Timeline,
    pub balances: StartingBalances,
    pub returns: ReturnMode,
    pub income: IncomeAssumptions,
    pub expenses: ExpenseAssumptions,
    pub roth_conversions: BTreeMap<i32, f64>,
    pub extra_liquidations: BTreeMap<i32, f64>,
    pub tax: TaxSettings,
    pub discount_rate: f64,
    pub heirs: Vec<HeirConfig>,
    pub heir_strategy: HeirStrategy,
    pub heir_horizon_years: u32,
    pub include_heir_detail: bool,
    pub solver: SolverSettings,
    pub current_year: Option<i32>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            timeline: Timeline::default(),
            balances: StartingBalances::default(),
            returns: ReturnMode::default(),
            income: IncomeAssumptions::default(),
            expenses: ExpenseAssumptions::default(),
            roth_conversions: BTreeMap::new(),
            extra_liquidations: BTreeMap::new(),
            tax: TaxSettings::default(),
            discount_rate: 0.03,
            heirs: Vec::new(),
            heir_strategy: HeirStrategy::default(),
            heir_horizon_years: 20,
            include_heir_detail: true,
            solver: SolverSettings::default(),
            current_year: None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accounts {
    pub after_tax: f64,
    pub traditional: f64,
    pub tax_free: f64,
}

impl Accounts {
    pub fn total(self) -> f64 {
        self.after_tax + self.traditional + self.tax_free
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandAllocation {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl BandAllocation {
    pub fn total(self) -> f64 {
        self.low + self.moderate + self.high
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAllocation {
    pub bands: BandAllocation,
    pub after_tax: BandAllocation,
    pub traditional: BandAllocation,
    pub tax_free: BandAllocation,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawals {
    pub traditional: f64,
    pub rmd_portion: f64,
    pub after_tax: f64,
    pub extra_liquidation: f64,
    pub tax_free: f64,
    pub surplus_reinvested: f64,
}

impl Withdrawals {
    pub fn total(self) -> f64 {
        self.traditional + self.after_tax + self.tax_free
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RothConversion {
    pub requested: f64,
    pub actual: f64,
    pub capped: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub taxable_social_security: f64,
    pub ordinary_taxable_income: f64,
    pub capital_gains: f64,
    pub standard_deduction: f64,
    pub magi: f64,
    pub federal_ordinary: f64,
    pub capital_gains_tax: f64,
    pub niit: f64,
    pub state_gross: f64,
    pub state_credit: f64,
    pub state: f64,
    pub total: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrmaaBreakdown {
    pub lookback_magi: f64,
    pub part_b_monthly: f64,
    pub part_d_monthly: f64,
    pub household_size: u32,
    pub annual: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeirDistribution {
    pub year: u32,
    pub amount: f64,
    pub tax: f64,
    pub after_tax: f64,
    pub present_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeirDetail {
    pub name: String,
    pub age_at_inheritance: i32,
    pub federal_rate: f64,
    pub state_rate: f64,
    pub combined_rate: f64,
    pub gross: f64,
    pub traditional_share: f64,
    pub pass_through_share: f64,
    pub normalized: f64,
    pub distributions: Vec<HeirDistribution>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeirValue {
    pub strategy: HeirStrategy,
    pub gross: f64,
    pub normalized: f64,
    pub alternate_strategy: HeirStrategy,
    pub alternate_normalized: f64,
    pub heirs: Option<Vec<HeirDetail>>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeTotals {
    pub tax: f64,
    pub irmaa: f64,
    pub expenses: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: i32,
    pub age: u32,
    pub survivor: bool,
    pub filing_status: FilingStatus,
    pub beginning: Accounts,
    pub beginning_basis: f64,
    pub ending: Accounts,
    pub ending_basis: f64,
    pub returns: Accounts,
    pub risk_allocation: Option<RiskAllocation>,
    pub social_security: f64,
    pub expenses: f64,
    pub rmd_required: f64,
    pub withdrawals: Withdrawals,
    pub roth_conversion: RothConversion,
    pub tax: TaxBreakdown,
    pub irmaa: IrmaaBreakdown,
    pub heir: HeirValue,
    pub shortfall: f64,
    pub unfunded_tax: f64,
    pub solver_iterations: u32,
    pub converged: bool,
    pub cumulative: CumulativeTotals,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub years_simulated: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub starting_balances: Accounts,
    pub ending_balances: Accounts,
    pub total_tax: f64,
    pub total_irmaa: f64,
    pub total_expenses: f64,
    pub peak_balance: f64,
    pub peak_year: Option<i32>,
    pub shortfall_years: Vec<i32>,
    pub total_shortfall: f64,
    pub total_unfunded_tax: f64,
    pub conversions_requested: f64,
    pub conversions_actual: f64,
    pub conversion_capped_years: Vec<i32>,
    pub final_heir_gross: f64,
    pub final_heir_normalized: f64,
    pub max_solver_iterations: u32,
    pub non_converged_years: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub years: Vec<YearRecord>,
    pub summary: Summary,
}
