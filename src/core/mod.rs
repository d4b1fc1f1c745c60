mod allocation;
mod brackets;
mod engine;
mod error;
mod heirs;
mod params;
mod solver;
mod summary;
mod tables;
mod types;

pub use engine::simulate;
pub use error::ParameterError;
pub use tables::{IrmaaBracket, IrmaaTable, TaxBracketSet, state_income_rate};
pub use types::{
    Accounts, FilingStatus, HeirConfig, HeirStrategy, HeirValue, Projection, ReturnMode,
    SimulationParameters, Summary, SurvivorEvent, YearRecord,
};
