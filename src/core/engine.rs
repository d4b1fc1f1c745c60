use tracing::{debug, info, warn};

use super::allocation::{BandRates, allocate_risk_bands, blended_returns};
use super::brackets::{IrmaaCharge, irmaa_surcharge, rmd_required};
use super::error::ParameterError;
use super::heirs::{Estate, HeirContext, value_estate};
use super::solver::{SolverInput, solve_year};
use super::summary::summarize;
use super::tables::{MEDICARE_AGE, YearTables};
use super::types::{
    Accounts, CumulativeTotals, FilingStatus, IrmaaBreakdown, MagiHistory, Projection,
    ReturnMode, RiskAllocation, SimulationParameters, YearRecord,
};

#[derive(Debug, Clone, Copy)]
struct CarriedState {
    balances: Accounts,
    basis: f64,
    magi: MagiHistory,
    cumulative: CumulativeTotals,
    last_tax: f64,
}

pub fn simulate(params: &SimulationParameters) -> Result<Projection, ParameterError> {
    params.validate()?;

    let heirs = params.resolved_heirs();
    let heir_ctx = HeirContext {
        heirs: &heirs,
        strategy: params.heir_strategy,
        horizon_years: params.heir_horizon_years,
        discount_rate: params.discount_rate,
        include_detail: params.include_heir_detail,
    };

    let initial = CarriedState {
        balances: Accounts {
            after_tax: params.balances.after_tax,
            traditional: params.balances.traditional,
            tax_free: params.balances.tax_free,
        },
        basis: params.starting_basis(),
        magi: params.tax.magi_history,
        cumulative: CumulativeTotals::default(),
        last_tax: 0.0,
    };

    let timeline = &params.timeline;
    let capacity =
        usize::try_from(i64::from(timeline.end_year) - i64::from(timeline.start_year) + 1)
            .unwrap_or(0);
    let (_, years) = (timeline.start_year..=timeline.end_year).fold(
        (initial, Vec::with_capacity(capacity)),
        |(state, mut years), year| {
            let record = simulate_year(params, &heir_ctx, year, &state);
            let next = CarriedState {
                balances: record.ending,
                basis: record.ending_basis,
                magi: state.magi.advance(record.tax.magi),
                cumulative: record.cumulative,
                last_tax: record.tax.total,
            };
            years.push(record);
            (next, years)
        },
    );

    let summary = summarize(&years);
    info!(
        years = summary.years_simulated,
        heirs = heirs.len(),
        total_tax = %format!("{:.0}", summary.total_tax),
        ending_total = %format!("{:.0}", summary.ending_balances.total()),
        shortfall_years = summary.shortfall_years.len(),
        "Projection complete"
    );

    Ok(Projection { years, summary })
}

fn simulate_year(
    params: &SimulationParameters,
    heir_ctx: &HeirContext<'_>,
    year: i32,
    state: &CarriedState,
) -> YearRecord {
    let timeline = &params.timeline;
    let age = u32::try_from(year - timeline.birth_year).unwrap_or(0);
    let years_elapsed = year - timeline.start_year;
    let survivor = timeline
        .survivor
        .as_ref()
        .filter(|event| year >= event.death_year);
    let filing_status = if survivor.is_some() {
        FilingStatus::Single
    } else {
        FilingStatus::MarriedJoint
    };

    let tables = YearTables::build(&params.tax, filing_status, year, age);

    let benefit_fraction = survivor.map_or(1.0, |event| event.benefit_fraction);
    let social_security = params.income.social_security
        * (1.0 + params.income.social_security_cola).powi(years_elapsed)
        * benefit_fraction;
    let expenses = resolve_expenses(params, year, survivor.map(|event| event.expense_fraction));

    let beginning = state.balances;
    let rmd = rmd_required(beginning.traditional, age);
    let household_size = filing_status.household_size();
    let irmaa = if age >= MEDICARE_AGE {
        irmaa_surcharge(state.magi.lookback(), &tables.irmaa, household_size)
    } else {
        IrmaaCharge::default()
    };

    let (returns, risk_allocation) = resolve_returns(&params.returns, beginning);

    let input = SolverInput {
        after_tax: beginning.after_tax,
        after_tax_basis: state.basis,
        traditional: beginning.traditional,
        tax_free: beginning.tax_free,
        social_security,
        expenses,
        irmaa: irmaa.annual,
        rmd_required: rmd,
        conversion_requested: params.roth_conversions.get(&year).copied().unwrap_or(0.0),
        extra_liquidation: params.extra_liquidations.get(&year).copied(),
        initial_tax_estimate: state.last_tax,
    };
    let plan = solve_year(&input, &tables, &params.solver);
    let withdrawals = plan.withdrawals;

    let sold_fraction = if beginning.after_tax > 0.0 {
        (withdrawals.after_tax / beginning.after_tax).min(1.0)
    } else {
        0.0
    };
    let post_withdrawal = Accounts {
        after_tax: (beginning.after_tax - withdrawals.after_tax + withdrawals.surplus_reinvested)
            .max(0.0),
        traditional: (beginning.traditional - plan.conversion.actual - withdrawals.traditional)
            .max(0.0),
        tax_free: (beginning.tax_free + plan.conversion.actual - withdrawals.tax_free).max(0.0),
    };
    let ending = Accounts {
        after_tax: post_withdrawal.after_tax * (1.0 + returns.after_tax),
        traditional: post_withdrawal.traditional * (1.0 + returns.traditional),
        tax_free: post_withdrawal.tax_free * (1.0 + returns.tax_free),
    };
    let ending_basis =
        (state.basis * (1.0 - sold_fraction) + withdrawals.surplus_reinvested).max(0.0);

    let heir = value_estate(
        &Estate {
            balances: ending,
            account_growth: returns.traditional,
            owner_age: age,
            death_year: year,
        },
        heir_ctx,
    );

    let cumulative = CumulativeTotals {
        tax: state.cumulative.tax + plan.tax.total,
        irmaa: state.cumulative.irmaa + irmaa.annual,
        expenses: state.cumulative.expenses + expenses,
    };

    if !plan.converged && params.solver.iterative {
        warn!(
            year,
            iterations = plan.iterations,
            tax = %format!("{:.2}", plan.tax.total),
            "Tax estimate did not converge; using last iteration"
        );
    }
    if plan.conversion.capped {
        warn!(
            year,
            requested = %format!("{:.0}", plan.conversion.requested),
            converted = %format!("{:.0}", plan.conversion.actual),
            "Roth conversion capped to balance available after RMD"
        );
    }
    debug!(
        year,
        age,
        survivor = survivor.is_some(),
        need = %format!("{:.0}", expenses + irmaa.annual + plan.tax.total),
        tax = %format!("{:.0}", plan.tax.total),
        shortfall = %format!("{:.0}", plan.shortfall),
        ending_total = %format!("{:.0}", ending.total()),
        heir_normalized = %format!("{:.0}", heir.normalized),
        "Simulated year"
    );

    YearRecord {
        year,
        age,
        survivor: survivor.is_some(),
        filing_status,
        beginning,
        beginning_basis: state.basis,
        ending,
        ending_basis,
        returns,
        risk_allocation,
        social_security,
        expenses,
        rmd_required: rmd,
        withdrawals,
        roth_conversion: plan.conversion,
        tax: plan.tax,
        irmaa: IrmaaBreakdown {
            lookback_magi: state.magi.lookback(),
            part_b_monthly: irmaa.part_b_monthly,
            part_d_monthly: irmaa.part_d_monthly,
            household_size,
            annual: irmaa.annual,
        },
        heir,
        shortfall: plan.shortfall,
        unfunded_tax: plan.unfunded_tax,
        solver_iterations: plan.iterations,
        converged: plan.converged,
        cumulative,
    }
}

fn resolve_expenses(params: &SimulationParameters, year: i32, survivor_fraction: Option<f64>) -> f64 {
    if let Some(amount) = params.expenses.overrides.get(&year) {
        return *amount;
    }
    let years_elapsed = year - params.timeline.start_year;
    params.expenses.base
        * (1.0 + params.expenses.inflation).powi(years_elapsed)
        * survivor_fraction.unwrap_or(1.0)
}

fn resolve_returns(mode: &ReturnMode, balances: Accounts) -> (Accounts, Option<RiskAllocation>) {
    match *mode {
        ReturnMode::Flat {
            after_tax,
            traditional,
            tax_free,
        } => (
            Accounts {
                after_tax,
                traditional,
                tax_free,
            },
            None,
        ),
        ReturnMode::BlendedRisk {
            low_rate,
            moderate_rate,
            high_rate,
            low_target,
            moderate_target,
        } => {
            let allocation = allocate_risk_bands(balances, low_target, moderate_target);
            let rates = BandRates {
                low: low_rate,
                moderate: moderate_rate,
                high: high_rate,
            };
            (blended_returns(&allocation, rates), Some(allocation))
        }
    }
}
