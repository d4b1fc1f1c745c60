use super::brackets::{
    net_investment_income_tax, progressive_tax, stacked_capital_gains_tax, state_tax,
    taxable_social_security,
};
use super::tables::YearTables;
use super::types::{RothConversion, SolverSettings, TaxBreakdown, Withdrawals};

#[derive(Debug, Clone, Copy, Default)]
pub struct SolverInput {
    pub after_tax: f64,
    pub after_tax_basis: f64,
    pub traditional: f64,
    pub tax_free: f64,
    pub social_security: f64,
    pub expenses: f64,
    pub irmaa: f64,
    pub rmd_required: f64,
    pub conversion_requested: f64,
    pub extra_liquidation: Option<f64>,
    pub initial_tax_estimate: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawalPlan {
    pub withdrawals: Withdrawals,
    pub conversion: RothConversion,
    pub tax: TaxBreakdown,
    pub shortfall: f64,
    // Tax left uncovered by the final draw.
    pub unfunded_tax: f64,
    pub iterations: u32,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Draw {
    withdrawals: Withdrawals,
    shortfall: f64,
}

pub fn cap_conversion(requested: f64, traditional: f64, rmd_required: f64) -> RothConversion {
    let requested = requested.max(0.0);
    let available = (traditional - rmd_required).max(0.0);
    let actual = requested.min(available);
    RothConversion {
        requested,
        actual,
        capped: requested > actual,
    }
}

pub fn solve_year(
    input: &SolverInput,
    tables: &YearTables,
    settings: &SolverSettings,
) -> WithdrawalPlan {
    let conversion = cap_conversion(
        input.conversion_requested,
        input.traditional,
        input.rmd_required,
    );
    let max_iterations = if settings.iterative {
        settings.max_iterations.max(1)
    } else {
        1
    };

    let mut estimate = input.initial_tax_estimate.max(0.0);
    let mut iterations = 0;
    let (draw, tax, converged) = loop {
        iterations += 1;
        let draw = plan_withdrawals(input, conversion.actual, estimate);
        let tax = compute_taxes(input, &draw.withdrawals, conversion.actual, tables);
        let converged = (tax.total - estimate).abs() < settings.tolerance;
        if converged || iterations >= max_iterations {
            break (draw, tax, converged);
        }
        estimate = tax.total;
    };

    let cash_in = input.social_security + draw.withdrawals.total();
    let cash_out = input.expenses + input.irmaa + tax.total;
    let mut withdrawals = draw.withdrawals;
    withdrawals.surplus_reinvested = if draw.shortfall > 0.0 {
        0.0
    } else {
        (cash_in - cash_out).max(0.0)
    };
    let unfunded_tax = (cash_out - cash_in - draw.shortfall).max(0.0);

    WithdrawalPlan {
        withdrawals,
        conversion,
        tax,
        shortfall: draw.shortfall,
        unfunded_tax,
        iterations,
        converged,
    }
}

fn plan_withdrawals(input: &SolverInput, conversion: f64, estimated_tax: f64) -> Draw {
    let need = (input.expenses + input.irmaa + estimated_tax - input.social_security).max(0.0);
    let traditional_available = (input.traditional - conversion).max(0.0);
    let after_tax_available = input.after_tax.max(0.0);

    let rmd_portion = input.rmd_required.max(0.0).min(traditional_available);
    let mut remaining = (need - rmd_portion).max(0.0);

    let mut after_tax = after_tax_available.min(remaining);
    remaining -= after_tax;

    let extra_liquidation = input
        .extra_liquidation
        .unwrap_or(0.0)
        .max(0.0)
        .min(after_tax_available - after_tax);
    after_tax += extra_liquidation;

    let more_traditional = (traditional_available - rmd_portion).min(remaining);
    remaining -= more_traditional;

    let tax_free = input.tax_free.max(0.0).min(remaining);
    remaining -= tax_free;

    Draw {
        withdrawals: Withdrawals {
            traditional: rmd_portion + more_traditional,
            rmd_portion,
            after_tax,
            extra_liquidation,
            tax_free,
            surplus_reinvested: 0.0,
        },
        shortfall: remaining.max(0.0),
    }
}

pub fn gain_ratio(after_tax: f64, basis: f64) -> f64 {
    if after_tax <= 0.0 {
        return 0.0;
    }
    (1.0 - basis.max(0.0) / after_tax).clamp(0.0, 1.0)
}

pub fn compute_taxes(
    input: &SolverInput,
    withdrawals: &Withdrawals,
    conversion: f64,
    tables: &YearTables,
) -> TaxBreakdown {
    let capital_gains = withdrawals.after_tax * gain_ratio(input.after_tax, input.after_tax_basis);
    let ordinary_gross = withdrawals.traditional + conversion;

    let taxable_social_security = taxable_social_security(
        input.social_security,
        ordinary_gross + capital_gains,
        tables.social_security,
    );
    let magi = ordinary_gross + taxable_social_security + capital_gains;
    let ordinary_taxable_income =
        (ordinary_gross + taxable_social_security - tables.standard_deduction).max(0.0);

    let federal_ordinary = progressive_tax(ordinary_taxable_income, &tables.ordinary);
    let capital_gains_tax =
        stacked_capital_gains_tax(capital_gains, ordinary_taxable_income, &tables.capital_gains);
    let niit = net_investment_income_tax(capital_gains, magi, tables.niit_threshold);
    let state = state_tax(
        capital_gains,
        tables.state_rate,
        tables.property_tax_credit,
        magi,
        tables.state_credit_agi_limit,
    );

    TaxBreakdown {
        taxable_social_security,
        ordinary_taxable_income,
        capital_gains,
        standard_deduction: tables.standard_deduction,
        magi,
        federal_ordinary,
        capital_gains_tax,
        niit,
        state_gross: state.gross,
        state_credit: state.credit,
        state: state.net,
        total: federal_ordinary + capital_gains_tax + niit + state.net,
    }
}
