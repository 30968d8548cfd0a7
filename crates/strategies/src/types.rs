// In crates/strategies/src/types.rs

use serde::{Deserialize, Serialize};

/// Which pair of moving averages drives the crossover.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    #[default]
    Sma,
    Ema,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IndicatorSettings {
    #[serde(default)]
    pub kind: IndicatorKind,
    pub fast_period: u32,
    pub slow_period: u32,
}

impl IndicatorSettings {
    /// Both periods must be positive and the slow line strictly longer.
    pub fn validate(&self) -> crate::Result<()> {
        if self.fast_period == 0 || self.slow_period <= self.fast_period {
            return Err(crate::Error::InvalidPeriods {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        Ok(())
    }
}
