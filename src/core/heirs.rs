use super::tables::{
    HEIR_DISTRIBUTION_YEARS, REQUIRED_BEGINNING_AGE, federal_brackets, single_life_factor,
    state_income_rate,
};
use super::types::{Accounts, HeirConfig, HeirDetail, HeirDistribution, HeirStrategy, HeirValue};

#[derive(Debug, Clone, Copy)]
pub struct HeirContext<'a> {
    pub heirs: &'a [HeirConfig],
    pub strategy: HeirStrategy,
    pub horizon_years: u32,
    pub discount_rate: f64,
    pub include_detail: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Estate {
    pub balances: Accounts,
    pub account_growth: f64,
    pub owner_age: u32,
    pub death_year: i32,
}

pub fn value_estate(estate: &Estate, ctx: &HeirContext<'_>) -> HeirValue {
    let details: Vec<HeirDetail> = ctx
        .heirs
        .iter()
        .map(|heir| value_heir(heir, estate, ctx.strategy, ctx))
        .collect();
    let alternate_strategy = ctx.strategy.alternate();
    let alternate_normalized = ctx
        .heirs
        .iter()
        .map(|heir| value_heir(heir, estate, alternate_strategy, ctx).normalized)
        .sum();

    HeirValue {
        strategy: ctx.strategy,
        gross: details.iter().map(|d| d.gross).sum(),
        normalized: details.iter().map(|d| d.normalized).sum(),
        alternate_strategy,
        alternate_normalized,
        heirs: ctx.include_detail.then_some(details),
    }
}

pub fn heir_rates(heir: &HeirConfig) -> (f64, f64) {
    let federal = federal_brackets(heir.filing_status).marginal_rate(heir.income_level);
    let state = state_income_rate(&heir.state).unwrap_or(0.0);
    (federal, state)
}

pub fn value_heir(
    heir: &HeirConfig,
    estate: &Estate,
    strategy: HeirStrategy,
    ctx: &HeirContext<'_>,
) -> HeirDetail {
    let fraction = heir.split_percent / 100.0;
    let balances = estate.balances;
    let traditional_share = balances.traditional.max(0.0) * fraction;
    let pass_through_share = (balances.after_tax.max(0.0) + balances.tax_free.max(0.0)) * fraction;

    let (federal_rate, state_rate) = heir_rates(heir);
    let combined_rate = (federal_rate + state_rate).clamp(0.0, 1.0);
    let age_at_inheritance = estate.death_year - heir.birth_year;

    let horizon = ctx.horizon_years;
    let discount = (1.0 + ctx.discount_rate).powf(f64::from(horizon));
    let reinvest = |years: u32| (1.0 + heir.reinvestment_rate).powf(f64::from(years));

    let distributions: Vec<HeirDistribution> = distribution_amounts(
        traditional_share,
        strategy,
        estate.account_growth,
        estate.owner_age,
        age_at_inheritance,
    )
    .into_iter()
    .map(|(year, amount)| {
        let tax = amount * combined_rate;
        let after_tax = amount - tax;
        HeirDistribution {
            year,
            amount,
            tax,
            after_tax,
            present_value: after_tax * reinvest(horizon.saturating_sub(year)) / discount,
        }
    })
    .collect();

    let pass_through = pass_through_share * reinvest(horizon) / discount;
    let normalized = pass_through + distributions.iter().map(|d| d.present_value).sum::<f64>();

    HeirDetail {
        name: heir.name.clone(),
        age_at_inheritance,
        federal_rate,
        state_rate,
        combined_rate,
        gross: balances.total().max(0.0) * fraction,
        traditional_share,
        pass_through_share,
        normalized,
        distributions,
    }
}

// (years after death, gross amount); growth is credited before each distribution.
fn distribution_amounts(
    share: f64,
    strategy: HeirStrategy,
    account_growth: f64,
    owner_age: u32,
    heir_age: i32,
) -> Vec<(u32, f64)> {
    if share <= 0.0 {
        return Vec::new();
    }

    match strategy {
        HeirStrategy::LumpSumYear0 => vec![(0, share)],
        HeirStrategy::RmdBased if owner_age < REQUIRED_BEGINNING_AGE => {
            // No annual requirement: defer everything to the final year.
            let grown = share * (1.0 + account_growth).powi(HEIR_DISTRIBUTION_YEARS as i32);
            vec![(HEIR_DISTRIBUTION_YEARS, grown)]
        }
        HeirStrategy::RmdBased => {
            let seed = single_life_factor(heir_age);
            let mut balance = share;
            let mut schedule = Vec::with_capacity(HEIR_DISTRIBUTION_YEARS as usize);
            for year in 1..=HEIR_DISTRIBUTION_YEARS {
                balance *= 1.0 + account_growth;
                let amount = if year == HEIR_DISTRIBUTION_YEARS {
                    balance
                } else {
                    let divisor = (seed - (year - 1) as f64).max(1.0);
                    balance / divisor
                };
                balance -= amount;
                schedule.push((year, amount));
            }
            schedule
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn heir(split_percent: f64, reinvestment_rate: f64) -> HeirConfig {
        HeirConfig {
            name: "Child".to_string(),
            state: "TX".to_string(),
            income_level: 150_000.0,
            split_percent,
            birth_year: 1990,
            reinvestment_rate,
            ..HeirConfig::default()
        }
    }

    fn ctx(heirs: &[HeirConfig], strategy: HeirStrategy) -> HeirContext<'_> {
        HeirContext {
            heirs,
            strategy,
            horizon_years: 20,
            discount_rate: 0.03,
            include_detail: true,
        }
    }

    fn estate(owner_age: u32, account_growth: f64) -> Estate {
        Estate {
            balances: Accounts {
                after_tax: 200_000.0,
                traditional: 1_000_000.0,
                tax_free: 300_000.0,
            },
            account_growth,
            owner_age,
            death_year: 2040,
        }
    }

    #[test]
    fn lump_sum_taxes_immediately_and_compounds() {
        let heirs = [heir(100.0, 0.05)];
        let value = value_estate(&estate(80, 0.06), &ctx(&heirs, HeirStrategy::LumpSumYear0));

        // TX heir at $150k joint income: 22% federal, no state tax.
        let growth = (1.05_f64 / 1.03).powi(20);
        let expected = 1_000_000.0 * 0.78 * growth + 500_000.0 * growth;
        assert_approx(value.normalized, expected);
        assert_approx(value.gross, 1_500_000.0);
    }

    #[test]
    fn strategies_differ_when_reinvestment_rate_differs_from_growth() {
        let heirs = [heir(100.0, 0.04)];
        let lump = value_estate(&estate(80, 0.07), &ctx(&heirs, HeirStrategy::LumpSumYear0));
        let rmd = value_estate(&estate(80, 0.07), &ctx(&heirs, HeirStrategy::RmdBased));
        assert!((lump.normalized - rmd.normalized).abs() > 1.0);
        assert_approx(lump.alternate_normalized, rmd.normalized);
        assert_approx(rmd.alternate_normalized, lump.normalized);
        assert_eq!(rmd.alternate_strategy, HeirStrategy::LumpSumYear0);
    }

    #[test]
    fn death_before_required_beginning_defers_to_year_ten() {
        let heirs = [heir(100.0, 0.05)];
        let value = value_estate(&estate(65, 0.07), &ctx(&heirs, HeirStrategy::RmdBased));
        let detail = &value.heirs.as_ref().expect("detail requested")[0];

        assert_eq!(detail.distributions.len(), 1);
        assert_eq!(detail.distributions[0].year, 10);
        assert_approx(detail.distributions[0].amount, 1_000_000.0 * 1.07_f64.powi(10));
    }

    #[test]
    fn deferral_matches_lump_sum_when_rates_coincide() {
        let heirs = [heir(100.0, 0.06)];
        let deferred = value_estate(&estate(60, 0.06), &ctx(&heirs, HeirStrategy::RmdBased));
        let lump = value_estate(&estate(60, 0.06), &ctx(&heirs, HeirStrategy::LumpSumYear0));
        assert!((deferred.normalized - lump.normalized).abs() < 1e-3);
    }

    #[test]
    fn annual_schedule_empties_account_in_year_ten() {
        let amounts = distribution_amounts(100_000.0, HeirStrategy::RmdBased, 0.0, 80, 50);
        assert_eq!(amounts.len(), 10);
        // Heir aged 50 seeds the divisor at 36.2.
        assert_approx(amounts[0].1, 100_000.0 / 36.2);
        let total: f64 = amounts.iter().map(|(_, a)| a).sum();
        assert_approx(total, 100_000.0);
        assert!(amounts[9].1 > amounts[8].1);
    }

    #[test]
    fn divisor_never_drops_below_one() {
        let amounts = distribution_amounts(10_000.0, HeirStrategy::RmdBased, 0.0, 90, 110);
        // Seed 2.0: year 1 takes half, year 2 takes everything left.
        assert_approx(amounts[0].1, 5_000.0);
        assert_approx(amounts[1].1, 5_000.0);
        assert_approx(amounts[2].1, 0.0);
    }

    #[test]
    fn split_heirs_are_valued_independently() {
        let single = [heir(100.0, 0.05)];
        let split = [heir(50.0, 0.05), heir(50.0, 0.05)];
        let whole = value_estate(&estate(80, 0.06), &ctx(&single, HeirStrategy::RmdBased));
        let halves = value_estate(&estate(80, 0.06), &ctx(&split, HeirStrategy::RmdBased));
        assert_approx(whole.normalized, halves.normalized);
        assert_eq!(halves.heirs.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn pass_through_accounts_are_never_taxed() {
        let heirs = [heir(100.0, 0.03)];
        let mut no_deferred = estate(80, 0.06);
        no_deferred.balances.traditional = 0.0;
        for strategy in [HeirStrategy::LumpSumYear0, HeirStrategy::RmdBased] {
            let value = value_estate(&no_deferred, &ctx(&heirs, strategy));
            assert_approx(value.normalized, 500_000.0);
        }
    }

    #[test]
    fn state_rate_adds_to_federal_rate() {
        let mut ca = heir(100.0, 0.05);
        ca.state = "CA".to_string();
        let (federal, state) = heir_rates(&ca);
        assert_approx(federal, 0.22);
        assert_approx(state, 0.093);
    }
}
