use super::types::{Accounts, BandAllocation, RiskAllocation};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BandRates {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

pub fn allocate_risk_bands(
    balances: Accounts,
    low_target: f64,
    moderate_target: f64,
) -> RiskAllocation {
    let total = balances.total().max(0.0);
    let low = low_target.max(0.0).min(total);
    let moderate = (moderate_target.max(low_target).max(0.0).min(total) - low).max(0.0);
    let high = (total - low - moderate).max(0.0);

    let mut room = BandAllocation {
        low,
        moderate,
        high,
    };
    let after_tax = fill_bands(balances.after_tax, &mut room);
    let traditional = fill_bands(balances.traditional, &mut room);
    let tax_free = fill_bands(balances.tax_free, &mut room);

    RiskAllocation {
        bands: BandAllocation {
            low,
            moderate,
            high,
        },
        after_tax,
        traditional,
        tax_free,
    }
}

fn fill_bands(balance: f64, room: &mut BandAllocation) -> BandAllocation {
    let mut remaining = balance.max(0.0);

    let low = remaining.min(room.low);
    room.low -= low;
    remaining -= low;

    let moderate = remaining.min(room.moderate);
    room.moderate -= moderate;
    remaining -= moderate;

    // Whatever is left is high risk by construction.
    room.high = (room.high - remaining).max(0.0);

    BandAllocation {
        low,
        moderate,
        high: remaining,
    }
}

pub fn blended_return(allocation: BandAllocation, rates: BandRates) -> f64 {
    let total = allocation.total();
    if total <= 0.0 {
        return 0.0;
    }
    (allocation.low * rates.low + allocation.moderate * rates.moderate + allocation.high * rates.high)
        / total
}

pub fn blended_returns(allocation: &RiskAllocation, rates: BandRates) -> Accounts {
    Accounts {
        after_tax: blended_return(allocation.after_tax, rates),
        traditional: blended_return(allocation.traditional, rates),
        tax_free: blended_return(allocation.tax_free, rates),
    }
}
