use super::types::{Summary, YearRecord};

pub fn summarize(years: &[YearRecord]) -> Summary {
    let (Some(first), Some(last)) = (years.first(), years.last()) else {
        return Summary::default();
    };

    let mut summary = Summary {
        years_simulated: years.len(),
        first_year: Some(first.year),
        last_year: Some(last.year),
        starting_balances: first.beginning,
        ending_balances: last.ending,
        total_tax: last.cumulative.tax,
        total_irmaa: last.cumulative.irmaa,
        total_expenses: last.cumulative.expenses,
        final_heir_gross: last.heir.gross,
        final_heir_normalized: last.heir.normalized,
        ..Summary::default()
    };

    for record in years {
        let total = record.ending.total();
        if summary.peak_year.is_none() || total > summary.peak_balance {
            summary.peak_balance = total;
            summary.peak_year = Some(record.year);
        }
        if record.shortfall > 0.0 {
            summary.shortfall_years.push(record.year);
            summary.total_shortfall += record.shortfall;
        }
        summary.total_unfunded_tax += record.unfunded_tax;
        summary.conversions_requested += record.roth_conversion.requested;
        summary.conversions_actual += record.roth_conversion.actual;
        if record.roth_conversion.capped {
            summary.conversion_capped_years.push(record.year);
        }
        summary.max_solver_iterations = summary.max_solver_iterations.max(record.solver_iterations);
        if !record.converged {
            summary.non_converged_years.push(record.year);
        }
    }

    summary
}
