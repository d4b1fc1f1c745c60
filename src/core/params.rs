use serde_json::Value;

use super::error::ParameterError;
use super::tables::{HEIR_DISTRIBUTION_YEARS, state_income_rate};
use super::types::{HeirConfig, ReturnMode, SimulationParameters};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2200;
const MAX_TIMELINE_YEARS: i64 = 150;
const MAX_HEIR_HORIZON_YEARS: u32 = 100;

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        let timeline = &self.timeline;
        if timeline.end_year < timeline.start_year {
            return Err(ParameterError::EmptyTimeline {
                start: timeline.start_year,
                end: timeline.end_year,
            });
        }
        if timeline.birth_year > timeline.start_year {
            return Err(ParameterError::BirthAfterStart {
                birth: timeline.birth_year,
                start: timeline.start_year,
            });
        }
        calendar_year("timeline.startYear", timeline.start_year)?;
        calendar_year("timeline.endYear", timeline.end_year)?;
        calendar_year("timeline.birthYear", timeline.birth_year)?;
        let span = i64::from(timeline.end_year) - i64::from(timeline.start_year) + 1;
        if span > MAX_TIMELINE_YEARS {
            return Err(ParameterError::TimelineTooLong {
                years: span,
                max: MAX_TIMELINE_YEARS,
            });
        }
        if let Some(year) = self.current_year {
            calendar_year("currentYear", year)?;
        }
        // Death years outside the timeline are allowed.
        if let Some(survivor) = &timeline.survivor {
            fraction("timeline.survivor.benefitFraction", survivor.benefit_fraction)?;
            fraction("timeline.survivor.expenseFraction", survivor.expense_fraction)?;
        }

        let balances = &self.balances;
        non_negative("balances.afterTax", balances.after_tax)?;
        non_negative("balances.traditional", balances.traditional)?;
        non_negative("balances.taxFree", balances.tax_free)?;
        if let Some(basis) = balances.after_tax_basis {
            non_negative("balances.afterTaxBasis", basis)?;
        }

        match &self.returns {
            ReturnMode::Flat {
                after_tax,
                traditional,
                tax_free,
            } => {
                growth_rate("returns.afterTax", *after_tax)?;
                growth_rate("returns.traditional", *traditional)?;
                growth_rate("returns.taxFree", *tax_free)?;
            }
            ReturnMode::BlendedRisk {
                low_rate,
                moderate_rate,
                high_rate,
                low_target,
                moderate_target,
            } => {
                growth_rate("returns.lowRate", *low_rate)?;
                growth_rate("returns.moderateRate", *moderate_rate)?;
                growth_rate("returns.highRate", *high_rate)?;
                non_negative("returns.lowTarget", *low_target)?;
                non_negative("returns.moderateTarget", *moderate_target)?;
                if moderate_target < low_target {
                    return Err(ParameterError::out_of_range(
                        "returns.moderateTarget",
                        *moderate_target,
                        *low_target,
                        f64::MAX,
                    ));
                }
            }
        }

        non_negative("income.socialSecurity", self.income.social_security)?;
        growth_rate("income.socialSecurityCola", self.income.social_security_cola)?;
        non_negative("expenses.base", self.expenses.base)?;
        growth_rate("expenses.inflation", self.expenses.inflation)?;
        for (year, amount) in &self.expenses.overrides {
            non_negative(format!("expenses.overrides[{year}]"), *amount)?;
        }
        for (year, amount) in &self.roth_conversions {
            non_negative(format!("rothConversions[{year}]"), *amount)?;
        }
        for (year, amount) in &self.extra_liquidations {
            non_negative(format!("extraLiquidations[{year}]"), *amount)?;
        }

        let tax = &self.tax;
        fraction("tax.stateRate", tax.state_rate)?;
        growth_rate("tax.bracketInflation", tax.bracket_inflation)?;
        fraction("tax.capitalGainsFraction", tax.capital_gains_fraction)?;
        fraction("tax.propertyTaxCreditRate", tax.property_tax_credit_rate)?;
        non_negative("tax.propertyTax", tax.property_tax)?;
        non_negative("tax.magiHistory.twoYearsAgo", tax.magi_history.two_years_ago)?;
        non_negative("tax.magiHistory.oneYearAgo", tax.magi_history.one_year_ago)?;
        if let Some(custom) = &tax.custom_brackets {
            custom.ordinary.validate("tax.customBrackets.ordinary")?;
            custom.capital_gains.validate("tax.customBrackets.capitalGains")?;
        }
        if let Some(irmaa) = &tax.custom_irmaa {
            irmaa.validate("tax.customIrmaa")?;
        }

        growth_rate("discountRate", self.discount_rate)?;
        if self.heir_horizon_years < HEIR_DISTRIBUTION_YEARS {
            return Err(ParameterError::HorizonTooShort(self.heir_horizon_years));
        }
        if self.heir_horizon_years > MAX_HEIR_HORIZON_YEARS {
            return Err(ParameterError::HorizonTooLong {
                years: self.heir_horizon_years,
                max: MAX_HEIR_HORIZON_YEARS,
            });
        }
        for heir in &self.heirs {
            if state_income_rate(&heir.state).is_none() {
                return Err(ParameterError::UnknownHeirState {
                    heir: heir.name.clone(),
                    state: heir.state.clone(),
                });
            }
            calendar_year(format!("heirs[{}].birthYear", heir.name), heir.birth_year)?;
            non_negative(format!("heirs[{}].splitPercent", heir.name), heir.split_percent)?;
            non_negative(format!("heirs[{}].incomeLevel", heir.name), heir.income_level)?;
            growth_rate(
                format!("heirs[{}].reinvestmentRate", heir.name),
                heir.reinvestment_rate,
            )?;
        }

        if self.solver.max_iterations == 0 {
            return Err(ParameterError::ZeroIterations);
        }
        non_negative("solver.tolerance", self.solver.tolerance)?;

        Ok(())
    }

    pub fn resolved_heirs(&self) -> Vec<HeirConfig> {
        if !self.heirs.is_empty() {
            return self.heirs.clone();
        }
        let reference_year = self.current_year.unwrap_or(self.timeline.start_year);
        vec![HeirConfig {
            birth_year: reference_year - 35,
            ..HeirConfig::default()
        }]
    }

    pub fn starting_basis(&self) -> f64 {
        let balance = self.balances.after_tax;
        self.balances
            .after_tax_basis
            .unwrap_or(balance * (1.0 - self.tax.capital_gains_fraction))
            .clamp(0.0, balance.max(0.0))
    }

    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ParameterError> {
        let Value::Object(patch) = overrides else {
            return Err(ParameterError::Overrides(
                "overrides must be a JSON object".to_string(),
            ));
        };
        let mut merged = serde_json::to_value(self)
            .map_err(|e| ParameterError::Overrides(e.to_string()))?;
        if let Value::Object(base) = &mut merged {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged).map_err(|e| ParameterError::Overrides(e.to_string()))
    }
}

fn calendar_year(field: impl Into<String>, year: i32) -> Result<(), ParameterError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ParameterError::YearOutOfRange {
            field: field.into(),
            year,
            min: MIN_YEAR,
            max: MAX_YEAR,
        })
    }
}

fn non_negative(field: impl Into<String>, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::negative(field, value))
    }
}

fn fraction(field: impl Into<String>, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::out_of_range(field, value, 0.0, 1.0))
    }
}

fn growth_rate(field: impl Into<String>, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > -1.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ParameterError::out_of_range(field, value, -1.0, 1.0))
    }
}
