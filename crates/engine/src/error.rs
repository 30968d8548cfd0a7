// In crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid indicator configuration: {0}")]
    Strategy(#[from] strategies::Error),

    #[error("Invalid risk configuration: {0}")]
    Risk(#[from] risk::Error),

    #[error("The scheduler is shutting down and accepts no new sessions")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, Error>;
