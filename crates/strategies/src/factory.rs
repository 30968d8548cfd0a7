// In crates/strategies/src/factory.rs

use crate::ma_crossover::{EmaCrossover, SmaCrossover};
use crate::types::{IndicatorKind, IndicatorSettings};
use crate::{CrossoverIndicator, Result};

/// Builds the configured crossover indicator. Invalid periods are a
/// startup error.
pub fn create_indicator(settings: &IndicatorSettings) -> Result<Box<dyn CrossoverIndicator>> {
    settings.validate()?;
    let fast = settings.fast_period as usize;
    let slow = settings.slow_period as usize;

    let indicator: Box<dyn CrossoverIndicator> = match settings.kind {
        IndicatorKind::Sma => Box::new(SmaCrossover::new(fast, slow)?),
        IndicatorKind::Ema => Box::new(EmaCrossover::new(fast, slow)?),
    };
    Ok(indicator)
}
