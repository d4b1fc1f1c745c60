use serde::{Deserialize, Serialize};

use super::error::ParameterError;
use super::types::{FilingStatus, TaxSettings};

pub const BASE_YEAR: i32 = 2025;

pub const RMD_START_AGE: u32 = 73;

// Owner death at or after this age forces annual heir distributions.
pub const REQUIRED_BEGINNING_AGE: u32 = 73;

pub const HEIR_DISTRIBUTION_YEARS: u32 = 10;

pub const MEDICARE_AGE: u32 = 65;

pub const NIIT_RATE: f64 = 0.038;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub rate: f64,
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxBracketSet {
    brackets: Vec<Bracket>,
}

impl TaxBracketSet {
    pub fn new(brackets: Vec<Bracket>) -> Self {
        Self { brackets }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(rate, threshold)| Bracket { rate, threshold })
                .collect(),
        )
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn validate(&self, table: &str) -> Result<(), ParameterError> {
        if self.brackets.is_empty() {
            return Err(ParameterError::EmptyTable {
                table: table.to_string(),
            });
        }
        for (row, bracket) in self.brackets.iter().enumerate() {
            let well_formed = bracket.rate.is_finite()
                && bracket.threshold.is_finite()
                && (0.0..=1.0).contains(&bracket.rate)
                && bracket.threshold >= 0.0;
            let increasing = row == 0 || {
                let prev = self.brackets[row - 1];
                bracket.rate > prev.rate && bracket.threshold > prev.threshold
            };
            if !well_formed || !increasing {
                return Err(ParameterError::NonMonotonicTable {
                    table: table.to_string(),
                    row,
                });
            }
        }
        Ok(())
    }

    pub fn inflated(&self, factor: f64) -> Self {
        Self::new(
            self.brackets
                .iter()
                .map(|b| Bracket {
                    rate: b.rate,
                    threshold: b.threshold * factor,
                })
                .collect(),
        )
    }

    pub fn marginal_rate(&self, income: f64) -> f64 {
        self.brackets
            .iter()
            .take_while(|b| income >= b.threshold)
            .last()
            .map_or(0.0, |b| b.rate)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrmaaBracket {
    pub threshold: f64,
    pub part_b_monthly: f64,
    pub part_d_monthly: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IrmaaTable {
    tiers: Vec<IrmaaBracket>,
}

impl IrmaaTable {
    pub fn new(tiers: Vec<IrmaaBracket>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[IrmaaBracket] {
        &self.tiers
    }

    pub fn validate(&self, table: &str) -> Result<(), ParameterError> {
        if self.tiers.is_empty() {
            return Err(ParameterError::EmptyTable {
                table: table.to_string(),
            });
        }
        for (row, tier) in self.tiers.iter().enumerate() {
            let well_formed = tier.threshold.is_finite()
                && tier.threshold >= 0.0
                && tier.part_b_monthly >= 0.0
                && tier.part_d_monthly >= 0.0;
            let increasing = row == 0 || {
                let prev = self.tiers[row - 1];
                tier.threshold > prev.threshold
                    && tier.part_b_monthly >= prev.part_b_monthly
                    && tier.part_d_monthly >= prev.part_d_monthly
            };
            if !well_formed || !increasing {
                return Err(ParameterError::NonMonotonicTable {
                    table: table.to_string(),
                    row,
                });
            }
        }
        Ok(())
    }

    pub fn inflated(&self, factor: f64) -> Self {
        Self::new(
            self.tiers
                .iter()
                .map(|t| IrmaaBracket {
                    threshold: t.threshold * factor,
                    ..*t
                })
                .collect(),
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SocialSecurityThresholds {
    pub tier1: f64,
    pub tier2: f64,
}

pub fn inflation_factor(rate: f64, year: i32) -> f64 {
    (1.0 + rate).powi(year - BASE_YEAR)
}

pub fn federal_brackets(status: FilingStatus) -> TaxBracketSet {
    match status {
        FilingStatus::MarriedJoint => TaxBracketSet::from_pairs(&[
            (0.10, 0.0),
            (0.12, 23_850.0),
            (0.22, 96_950.0),
            (0.24, 206_700.0),
            (0.32, 394_600.0),
            (0.35, 501_050.0),
            (0.37, 751_600.0),
        ]),
        FilingStatus::Single => TaxBracketSet::from_pairs(&[
            (0.10, 0.0),
            (0.12, 11_925.0),
            (0.22, 48_475.0),
            (0.24, 103_350.0),
            (0.32, 197_300.0),
            (0.35, 250_525.0),
            (0.37, 626_350.0),
        ]),
    }
}

pub fn capital_gains_brackets(status: FilingStatus) -> TaxBracketSet {
    match status {
        FilingStatus::MarriedJoint => {
            TaxBracketSet::from_pairs(&[(0.0, 0.0), (0.15, 96_700.0), (0.20, 600_050.0)])
        }
        FilingStatus::Single => {
            TaxBracketSet::from_pairs(&[(0.0, 0.0), (0.15, 48_350.0), (0.20, 533_400.0)])
        }
    }
}

pub fn standard_deduction(status: FilingStatus, age: u32) -> f64 {
    let senior = age >= MEDICARE_AGE;
    match status {
        FilingStatus::MarriedJoint => 30_000.0 + if senior { 2.0 * 1_600.0 } else { 0.0 },
        FilingStatus::Single => 15_000.0 + if senior { 2_000.0 } else { 0.0 },
    }
}

pub fn irmaa_table(status: FilingStatus) -> IrmaaTable {
    let thresholds: [f64; 6] = match status {
        FilingStatus::MarriedJoint => [0.0, 212_000.0, 266_000.0, 334_000.0, 400_000.0, 750_000.0],
        FilingStatus::Single => [0.0, 106_000.0, 133_000.0, 167_000.0, 200_000.0, 500_000.0],
    };
    let add_ons = [
        (0.0, 0.0),
        (74.00, 13.70),
        (185.00, 35.30),
        (295.90, 57.00),
        (406.90, 78.60),
        (443.90, 85.80),
    ];
    IrmaaTable::new(
        thresholds
            .iter()
            .zip(add_ons)
            .map(|(&threshold, (part_b_monthly, part_d_monthly))| IrmaaBracket {
                threshold,
                part_b_monthly,
                part_d_monthly,
            })
            .collect(),
    )
}

pub fn social_security_thresholds(status: FilingStatus) -> SocialSecurityThresholds {
    match status {
        FilingStatus::MarriedJoint => SocialSecurityThresholds {
            tier1: 32_000.0,
            tier2: 44_000.0,
        },
        FilingStatus::Single => SocialSecurityThresholds {
            tier1: 25_000.0,
            tier2: 34_000.0,
        },
    }
}

pub fn niit_threshold(status: FilingStatus) -> f64 {
    match status {
        FilingStatus::MarriedJoint => 250_000.0,
        FilingStatus::Single => 200_000.0,
    }
}

pub fn state_credit_agi_limit(status: FilingStatus) -> f64 {
    match status {
        FilingStatus::MarriedJoint => 150_000.0,
        FilingStatus::Single => 75_000.0,
    }
}

const UNIFORM_LIFETIME: &[(u32, f64)] = &[
    (73, 26.5),
    (74, 25.5),
    (75, 24.6),
    (76, 23.7),
    (77, 22.9),
    (78, 22.0),
    (79, 21.1),
    (80, 20.2),
    (81, 19.4),
    (82, 18.5),
    (83, 17.7),
    (84, 16.8),
    (85, 16.0),
    (86, 15.2),
    (87, 14.4),
    (88, 13.7),
    (89, 12.9),
    (90, 12.2),
    (91, 11.5),
    (92, 10.8),
    (93, 10.1),
    (94, 9.5),
    (95, 8.9),
    (96, 8.4),
    (97, 7.8),
    (98, 7.3),
    (99, 6.8),
    (100, 6.4),
    (101, 6.0),
    (102, 5.6),
    (103, 5.2),
    (104, 4.9),
    (105, 4.6),
    (106, 4.3),
    (107, 4.1),
    (108, 3.9),
    (109, 3.7),
    (110, 3.5),
    (111, 3.4),
    (112, 3.3),
    (113, 3.1),
    (114, 3.0),
    (115, 2.9),
    (116, 2.8),
    (117, 2.7),
    (118, 2.5),
    (119, 2.3),
    (120, 2.0),
];

pub fn rmd_divisor(age: u32) -> Option<f64> {
    let (first_age, _) = UNIFORM_LIFETIME[0];
    if age < first_age.max(RMD_START_AGE) {
        return None;
    }
    UNIFORM_LIFETIME
        .iter()
        .find(|(a, _)| *a == age)
        .or_else(|| UNIFORM_LIFETIME.last())
        .map(|&(_, divisor)| divisor)
}

const SINGLE_LIFE: &[(u32, f64)] = &[
    (20, 65.0),
    (21, 64.1),
    (22, 63.1),
    (23, 62.1),
    (24, 61.1),
    (25, 60.2),
    (26, 59.2),
    (27, 58.2),
    (28, 57.3),
    (29, 56.3),
    (30, 55.3),
    (31, 54.4),
    (32, 53.4),
    (33, 52.5),
    (34, 51.5),
    (35, 50.5),
    (36, 49.6),
    (37, 48.6),
    (38, 47.7),
    (39, 46.7),
    (40, 45.7),
    (41, 44.8),
    (42, 43.8),
    (43, 42.9),
    (44, 41.9),
    (45, 41.0),
    (46, 40.0),
    (47, 39.0),
    (48, 38.1),
    (49, 37.1),
    (50, 36.2),
    (51, 35.3),
    (52, 34.3),
    (53, 33.4),
    (54, 32.5),
    (55, 31.6),
    (56, 30.6),
    (57, 29.8),
    (58, 28.9),
    (59, 28.0),
    (60, 27.1),
    (61, 26.2),
    (62, 25.4),
    (63, 24.5),
    (64, 23.7),
    (65, 22.9),
    (66, 22.0),
    (67, 21.2),
    (68, 20.4),
    (69, 19.6),
    (70, 18.8),
    (71, 18.0),
    (72, 17.2),
    (73, 16.4),
    (74, 15.6),
    (75, 14.8),
    (76, 14.1),
    (77, 13.3),
    (78, 12.6),
    (79, 11.9),
    (80, 11.2),
    (81, 10.5),
    (82, 9.9),
    (83, 9.3),
    (84, 8.7),
    (85, 8.1),
    (86, 7.6),
    (87, 7.1),
    (88, 6.6),
    (89, 6.1),
    (90, 5.7),
    (91, 5.3),
    (92, 4.9),
    (93, 4.6),
    (94, 4.3),
    (95, 4.0),
    (96, 3.7),
    (97, 3.4),
    (98, 3.2),
    (99, 3.0),
    (100, 2.8),
    (101, 2.6),
    (102, 2.5),
    (103, 2.3),
    (104, 2.2),
    (105, 2.1),
    (106, 2.1),
    (107, 2.1),
    (108, 2.0),
    (109, 2.0),
    (110, 2.0),
];

pub fn single_life_factor(age: i32) -> f64 {
    let (first_age, first_factor) = SINGLE_LIFE[0];
    if age < first_age as i32 {
        return first_factor;
    }
    SINGLE_LIFE
        .iter()
        .find(|(a, _)| *a as i32 == age)
        .or_else(|| SINGLE_LIFE.last())
        .map_or(1.0, |&(_, factor)| factor)
}

const STATE_RATES: &[(&str, f64)] = &[
    ("AK", 0.0),
    ("AL", 0.05),
    ("AR", 0.039),
    ("AZ", 0.025),
    ("CA", 0.093),
    ("CO", 0.044),
    ("CT", 0.0699),
    ("DC", 0.085),
    ("DE", 0.066),
    ("FL", 0.0),
    ("GA", 0.0539),
    ("HI", 0.0825),
    ("IA", 0.038),
    ("ID", 0.057),
    ("IL", 0.0495),
    ("IN", 0.03),
    ("KS", 0.057),
    ("KY", 0.04),
    ("LA", 0.03),
    ("MA", 0.05),
    ("MD", 0.0575),
    ("ME", 0.0715),
    ("MI", 0.0425),
    ("MN", 0.0785),
    ("MO", 0.047),
    ("MS", 0.044),
    ("MT", 0.059),
    ("NC", 0.0425),
    ("ND", 0.025),
    ("NE", 0.052),
    ("NH", 0.0),
    ("NJ", 0.0637),
    ("NM", 0.049),
    ("NV", 0.0),
    ("NY", 0.0685),
    ("OH", 0.035),
    ("OK", 0.0475),
    ("OR", 0.0875),
    ("PA", 0.0307),
    ("RI", 0.0599),
    ("SC", 0.062),
    ("SD", 0.0),
    ("TN", 0.0),
    ("TX", 0.0),
    ("UT", 0.0455),
    ("VA", 0.0575),
    ("VT", 0.0875),
    ("WA", 0.0),
    ("WI", 0.053),
    ("WV", 0.0482),
    ("WY", 0.0),
];

pub fn state_income_rate(code: &str) -> Option<f64> {
    let code = code.trim();
    STATE_RATES
        .iter()
        .find(|(state, _)| state.eq_ignore_ascii_case(code))
        .map(|&(_, rate)| rate)
}

#[derive(Clone, Debug, PartialEq)]
pub struct YearTables {
    pub filing_status: FilingStatus,
    pub ordinary: TaxBracketSet,
    pub capital_gains: TaxBracketSet,
    pub standard_deduction: f64,
    pub irmaa: IrmaaTable,
    pub social_security: SocialSecurityThresholds,
    pub niit_threshold: f64,
    pub state_rate: f64,
    pub state_credit_agi_limit: f64,
    pub property_tax_credit: f64,
}

impl YearTables {
    pub fn build(tax: &TaxSettings, status: FilingStatus, year: i32, age: u32) -> Self {
        let factor = inflation_factor(tax.bracket_inflation, year);
        let (ordinary, capital_gains) = match &tax.custom_brackets {
            Some(custom) => (custom.ordinary.clone(), custom.capital_gains.clone()),
            None => (federal_brackets(status), capital_gains_brackets(status)),
        };
        let irmaa = tax
            .custom_irmaa
            .clone()
            .unwrap_or_else(|| irmaa_table(status));

        Self {
            filing_status: status,
            ordinary: ordinary.inflated(factor),
            capital_gains: capital_gains.inflated(factor),
            standard_deduction: standard_deduction(status, age) * factor,
            irmaa: irmaa.inflated(factor),
            social_security: social_security_thresholds(status),
            niit_threshold: niit_threshold(status),
            state_rate: tax.state_rate,
            state_credit_agi_limit: state_credit_agi_limit(status),
            property_tax_credit: tax.property_tax_credit_rate * tax.property_tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CustomBrackets;

    #[test]
    fn built_in_tables_are_strictly_increasing() {
        for status in [FilingStatus::MarriedJoint, FilingStatus::Single] {
            assert_eq!(federal_brackets(status).validate("federal"), Ok(()));
            assert_eq!(capital_gains_brackets(status).validate("ltcg"), Ok(()));
            assert_eq!(irmaa_table(status).validate("irmaa"), Ok(()));
        }
    }

    #[test]
    fn validate_rejects_out_of_order_thresholds() {
        let table = TaxBracketSet::from_pairs(&[(0.10, 0.0), (0.20, 50_000.0), (0.30, 40_000.0)]);
        assert_eq!(
            table.validate("custom"),
            Err(ParameterError::NonMonotonicTable {
                table: "custom".to_string(),
                row: 2
            })
        );
        assert!(TaxBracketSet::new(Vec::new()).validate("empty").is_err());
    }

    #[test]
    fn inflation_changes_thresholds_but_not_rates() {
        let base = federal_brackets(FilingStatus::MarriedJoint);
        let later = base.inflated(inflation_factor(0.03, BASE_YEAR + 2));
        for (a, b) in base.brackets().iter().zip(later.brackets()) {
            assert_eq!(a.rate, b.rate);
            assert!((b.threshold - a.threshold * 1.0609).abs() < 1e-6);
        }
        assert_eq!(inflation_factor(0.03, BASE_YEAR), 1.0);
    }

    #[test]
    fn marginal_rate_picks_containing_bracket() {
        let table = federal_brackets(FilingStatus::MarriedJoint);
        assert_eq!(table.marginal_rate(0.0), 0.10);
        assert_eq!(table.marginal_rate(150_000.0), 0.22);
        assert_eq!(table.marginal_rate(2_000_000.0), 0.37);
    }

    #[test]
    fn rmd_divisor_starts_at_73_and_clamps_past_table() {
        assert_eq!(rmd_divisor(72), None);
        assert_eq!(rmd_divisor(73), Some(26.5));
        assert_eq!(rmd_divisor(90), Some(12.2));
        assert_eq!(rmd_divisor(125), Some(2.0));
    }

    #[test]
    fn single_life_factor_clamps_both_ends() {
        assert_eq!(single_life_factor(5), 65.0);
        assert_eq!(single_life_factor(50), 36.2);
        assert_eq!(single_life_factor(130), 2.0);
    }

    #[test]
    fn state_codes_are_case_insensitive() {
        assert_eq!(state_income_rate("tx"), Some(0.0));
        assert_eq!(state_income_rate(" CA "), Some(0.093));
        assert_eq!(state_income_rate("ZZ"), None);
    }

    #[test]
    fn year_tables_use_custom_brackets_when_supplied() {
        let mut tax = TaxSettings::default();
        tax.bracket_inflation = 0.0;
        tax.custom_brackets = Some(CustomBrackets {
            ordinary: TaxBracketSet::from_pairs(&[(0.2, 0.0)]),
            capital_gains: TaxBracketSet::from_pairs(&[(0.1, 0.0)]),
        });
        let tables = YearTables::build(&tax, FilingStatus::Single, 2030, 70);
        assert_eq!(tables.ordinary.brackets().len(), 1);
        assert_eq!(tables.standard_deduction, 17_000.0);
    }
}
