use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("endYear {end} must be >= startYear {start}")]
    EmptyTimeline { start: i32, end: i32 },

    #[error("birthYear {birth} must be <= startYear {start}")]
    BirthAfterStart { birth: i32, start: i32 },

    #[error("{field} must be a finite value >= 0, got {value}")]
    Negative { field: String, value: f64 },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{table} must have strictly increasing rates and thresholds (row {row})")]
    NonMonotonicTable { table: String, row: usize },

    #[error("{table} must contain at least one row")]
    EmptyTable { table: String },

    #[error("{field} {year} must be between {min} and {max}")]
    YearOutOfRange {
        field: String,
        year: i32,
        min: i32,
        max: i32,
    },

    #[error("timeline spans {years} years, at most {max} are supported")]
    TimelineTooLong { years: i64, max: i64 },

    #[error("heir '{heir}' has unknown state code '{state}'")]
    UnknownHeirState { heir: String, state: String },

    #[error("heirHorizonYears must be >= 10, got {0}")]
    HorizonTooShort(u32),

    #[error("heirHorizonYears must be <= {max}, got {years}")]
    HorizonTooLong { years: u32, max: u32 },

    #[error("solver.maxIterations must be > 0")]
    ZeroIterations,

    #[error("invalid parameter overrides: {0}")]
    Overrides(String),
}

impl ParameterError {
    pub(crate) fn negative(field: impl Into<String>, value: f64) -> Self {
        Self::Negative {
            field: field.into(),
            value,
        }
    }

    pub(crate) fn out_of_range(field: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value,
            min,
            max,
        }
    }
}
