use super::tables::{
    IrmaaTable, NIIT_RATE, SocialSecurityThresholds, TaxBracketSet, rmd_divisor,
};

pub fn progressive_tax(income: f64, brackets: &TaxBracketSet) -> f64 {
    if income <= 0.0 {
        return 0.0;
    }

    let rows = brackets.brackets();
    let mut tax = 0.0;
    for (idx, bracket) in rows.iter().enumerate() {
        if income <= bracket.threshold {
            break;
        }
        let upper = rows.get(idx + 1).map_or(f64::INFINITY, |next| next.threshold);
        tax += (income.min(upper) - bracket.threshold) * bracket.rate;
    }
    tax
}

pub fn stacked_capital_gains_tax(
    gains: f64,
    ordinary_income: f64,
    brackets: &TaxBracketSet,
) -> f64 {
    if gains <= 0.0 {
        return 0.0;
    }

    let rows = brackets.brackets();
    let mut remaining = gains;
    let mut cursor = ordinary_income.max(0.0);
    let mut tax = 0.0;

    // Room below the first threshold is untaxed.
    if let Some(first) = rows.first() {
        let untaxed = (first.threshold - cursor).max(0.0).min(remaining);
        remaining -= untaxed;
        cursor += untaxed;
    }

    for (idx, bracket) in rows.iter().enumerate() {
        if remaining <= 0.0 {
            break;
        }
        let upper = rows.get(idx + 1).map_or(f64::INFINITY, |next| next.threshold);
        if cursor >= upper {
            continue;
        }
        let start = cursor.max(bracket.threshold);
        let taxed = remaining.min(upper - start);
        tax += taxed * bracket.rate;
        remaining -= taxed;
        cursor = start + taxed;
    }
    tax
}

pub fn net_investment_income_tax(investment_income: f64, magi: f64, threshold: f64) -> f64 {
    let excess = (magi - threshold).max(0.0);
    NIIT_RATE * investment_income.max(0.0).min(excess)
}

pub fn taxable_social_security(
    benefit: f64,
    other_income: f64,
    thresholds: SocialSecurityThresholds,
) -> f64 {
    if benefit <= 0.0 {
        return 0.0;
    }

    let combined = other_income.max(0.0) + 0.5 * benefit;
    if combined <= thresholds.tier1 {
        0.0
    } else if combined <= thresholds.tier2 {
        (0.5 * (combined - thresholds.tier1)).min(0.5 * benefit)
    } else {
        let first_tier = 0.5 * (thresholds.tier2 - thresholds.tier1);
        (first_tier + 0.85 * (combined - thresholds.tier2)).min(0.85 * benefit)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StateTax {
    pub gross: f64,
    pub credit: f64,
    pub net: f64,
}

// Credit is non-refundable and lost entirely above `agi_limit`.
pub fn state_tax(
    investment_income: f64,
    rate: f64,
    credit: f64,
    agi: f64,
    agi_limit: f64,
) -> StateTax {
    let gross = investment_income.max(0.0) * rate.max(0.0);
    let eligible = if agi > agi_limit { 0.0 } else { credit.max(0.0) };
    let credit = eligible.min(gross);
    StateTax {
        gross,
        credit,
        net: gross - credit,
    }
}

pub fn rmd_required(balance: f64, age: u32) -> f64 {
    if balance <= 0.0 {
        return 0.0;
    }
    rmd_divisor(age).map_or(0.0, |divisor| balance / divisor)
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IrmaaCharge {
    pub part_b_monthly: f64,
    pub part_d_monthly: f64,
    pub annual: f64,
}

pub fn irmaa_surcharge(lagged_magi: f64, table: &IrmaaTable, household_size: u32) -> IrmaaCharge {
    let Some(tier) = table
        .tiers()
        .iter()
        .filter(|tier| lagged_magi > tier.threshold)
        .last()
    else {
        return IrmaaCharge::default();
    };

    IrmaaCharge {
        part_b_monthly: tier.part_b_monthly,
        part_d_monthly: tier.part_d_monthly,
        annual: (tier.part_b_monthly + tier.part_d_monthly) * 12.0 * household_size as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::{
        capital_gains_brackets, federal_brackets, irmaa_table, social_security_thresholds,
    };
    use crate::core::types::FilingStatus;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn gains_below_first_custom_threshold_are_untaxed() {
        let brackets = TaxBracketSet::from_pairs(&[(0.15, 10_000.0), (0.20, 50_000.0)]);
        assert_approx(stacked_capital_gains_tax(20_000.0, 0.0, &brackets), 1_500.0);
        // Ordinary income already fills part of the gap.
        assert_approx(stacked_capital_gains_tax(20_000.0, 4_000.0, &brackets), 2_100.0);
        assert_approx(stacked_capital_gains_tax(5_000.0, 0.0, &brackets), 0.0);
    }

    #[test]
    fn progressive_tax_matches_hand_calculation() {
        let brackets = federal_brackets(FilingStatus::MarriedJoint);
        // 23,850 * 10% + (96,950 - 23,850) * 12% + (100,000 - 96,950) * 22%
        let expected = 2_385.0 + 8_772.0 + 671.0;
        assert_approx(progressive_tax(100_000.0, &brackets), expected);
    }

    #[test]
    fn zero_and_negative_income_pay_nothing() {
        for status in [FilingStatus::MarriedJoint, FilingStatus::Single] {
            let ordinary = federal_brackets(status);
            let gains = capital_gains_brackets(status);
            assert_eq!(progressive_tax(0.0, &ordinary), 0.0);
            assert_eq!(progressive_tax(-5_000.0, &ordinary), 0.0);
            assert_eq!(stacked_capital_gains_tax(0.0, 250_000.0, &gains), 0.0);
        }
    }

    #[test]
    fn gains_fill_zero_bracket_before_fifteen_percent() {
        let gains = capital_gains_brackets(FilingStatus::MarriedJoint);
        // 96,700 - 80,000 = 16,700 of room at 0%, remaining 13,300 at 15%.
        assert_approx(stacked_capital_gains_tax(30_000.0, 80_000.0, &gains), 1_995.0);
    }

    #[test]
    fn gains_above_ordinary_top_use_twenty_percent() {
        let gains = capital_gains_brackets(FilingStatus::MarriedJoint);
        assert_approx(
            stacked_capital_gains_tax(10_000.0, 700_000.0, &gains),
            2_000.0,
        );
    }

    #[test]
    fn gains_straddling_two_upper_brackets() {
        let gains = capital_gains_brackets(FilingStatus::MarriedJoint);
        // 50 at 15% then 50 at 20%.
        assert_approx(
            stacked_capital_gains_tax(100.0, 600_000.0, &gains),
            50.0 * 0.15 + 50.0 * 0.20,
        );
    }

    #[test]
    fn niit_taxes_lesser_of_income_and_excess() {
        assert_approx(net_investment_income_tax(40_000.0, 260_000.0, 250_000.0), 380.0);
        assert_approx(
            net_investment_income_tax(5_000.0, 400_000.0, 250_000.0),
            190.0,
        );
        assert_eq!(net_investment_income_tax(50_000.0, 200_000.0, 250_000.0), 0.0);
    }

    #[test]
    fn social_security_tiers() {
        let joint = social_security_thresholds(FilingStatus::MarriedJoint);
        assert_eq!(taxable_social_security(40_000.0, 10_000.0, joint), 0.0);
        // combined 40,000: half of the 8,000 excess
        assert_approx(taxable_social_security(40_000.0, 20_000.0, joint), 4_000.0);
        // combined 70,000: 6,000 + 0.85 * 26,000 = 28,100, under the 34,000 cap
        assert_approx(taxable_social_security(40_000.0, 50_000.0, joint), 28_100.0);
        assert_approx(taxable_social_security(40_000.0, 500_000.0, joint), 34_000.0);
    }

    #[test]
    fn state_credit_is_non_refundable_and_means_tested() {
        let under_limit = state_tax(10_000.0, 0.05, 200.0, 100_000.0, 150_000.0);
        assert_approx(under_limit.gross, 500.0);
        assert_approx(under_limit.credit, 200.0);
        assert_approx(under_limit.net, 300.0);

        let floored = state_tax(1_000.0, 0.05, 200.0, 100_000.0, 150_000.0);
        assert_approx(floored.net, 0.0);
        assert_approx(floored.credit, 50.0);

        let over_limit = state_tax(10_000.0, 0.05, 200.0, 150_001.0, 150_000.0);
        assert_approx(over_limit.credit, 0.0);
        assert_approx(over_limit.net, 500.0);
    }

    #[test]
    fn rmd_is_zero_before_start_age() {
        assert_eq!(rmd_required(1_000_000.0, 72), 0.0);
        assert_eq!(rmd_required(1_000_000.0, 50), 0.0);
    }

    #[test]
    fn rmd_at_73_uses_first_divisor() {
        let required = rmd_required(1_000_000.0, 73);
        assert!((required - 37_736.0).abs() < 1.0, "got {required}");
        assert_eq!(rmd_required(0.0, 80), 0.0);
    }

    #[test]
    fn irmaa_selects_highest_exceeded_tier() {
        let table = irmaa_table(FilingStatus::MarriedJoint);
        assert_eq!(irmaa_surcharge(212_000.0, &table, 2).annual, 0.0);

        let tier_two = irmaa_surcharge(270_000.0, &table, 2);
        assert_approx(tier_two.part_b_monthly, 185.0);
        assert_approx(tier_two.part_d_monthly, 35.3);
        assert_approx(tier_two.annual, (185.0 + 35.3) * 12.0 * 2.0);

        let survivor = irmaa_surcharge(270_000.0, &table, 1);
        assert_approx(survivor.annual, tier_two.annual / 2.0);

        let top = irmaa_surcharge(5_000_000.0, &table, 2);
        assert_approx(top.part_b_monthly, 443.9);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_progressive_tax_is_non_decreasing(
            low in 0u32..2_000_000,
            delta in 0u32..500_000,
            single in proptest::bool::ANY
        ) {
            let status = if single { FilingStatus::Single } else { FilingStatus::MarriedJoint };
            let brackets = federal_brackets(status);
            let lower = progressive_tax(low as f64, &brackets);
            let higher = progressive_tax(low as f64 + delta as f64, &brackets);
            prop_assert!(higher + 1e-9 >= lower);
        }

        #[test]
        fn prop_taxable_social_security_never_exceeds_85_percent(
            benefit in 0u32..200_000,
            other in 0u32..50_000_000
        ) {
            let thresholds = social_security_thresholds(FilingStatus::MarriedJoint);
            let taxable = taxable_social_security(benefit as f64, other as f64, thresholds);
            prop_assert!(taxable <= 0.85 * benefit as f64 + 1e-9);
            prop_assert!(taxable >= 0.0);
        }

        #[test]
        fn prop_zero_gains_pay_no_capital_gains_tax(ordinary in 0u32..5_000_000) {
            let gains = capital_gains_brackets(FilingStatus::Single);
            prop_assert!(stacked_capital_gains_tax(0.0, ordinary as f64, &gains) == 0.0);
        }
    }
}
