// In crates/strategies/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid indicator periods: fast={fast}, slow={slow} (both must be positive and slow > fast)")]
    InvalidPeriods { fast: u32, slow: u32 },

    #[error("Failed to build indicator: {0}")]
    IndicatorBuild(String),
}

pub type Result<T> = std::result::Result<T, Error>;
