// In crates/strategies/src/ma_crossover.rs

use crate::{CrossoverIndicator, Error, IndicatorState, Result};
use core_types::Bar;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use ta::Next;
use ta::indicators::ExponentialMovingAverage as Ema;

/// Decimal places at which EMA lines are compared. The `f64` recursion
/// leaves noise in the last bits; lines equal at this scale do not cross.
pub const EMA_COMPARISON_DP: u32 = 8;

fn check_periods(fast: usize, slow: usize) -> Result<()> {
    if fast == 0 || slow <= fast {
        return Err(Error::InvalidPeriods { fast: fast as u32, slow: slow as u32 });
    }
    Ok(())
}

fn mean(closes: &[Decimal]) -> Decimal {
    closes.iter().copied().sum::<Decimal>() / Decimal::from(closes.len())
}

/// Simple moving averages: the arithmetic mean of the last N closes,
/// computed in `Decimal` so that equal means compare equal.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    fast_period: usize,
    slow_period: usize,
}

impl SmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self> {
        check_periods(fast_period, slow_period)?;
        Ok(Self { fast_period, slow_period })
    }
}

impl CrossoverIndicator for SmaCrossover {
    fn name(&self) -> &'static str {
        "SmaCrossover"
    }

    fn required_bars(&self) -> usize {
        self.slow_period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<IndicatorState>> {
        if bars.len() < self.slow_period {
            return vec![None; bars.len()];
        }

        let closes: Vec<Decimal> = bars.iter().map(|bar| bar.close).collect();
        (0..closes.len())
            .map(|i| {
                (i + 1 >= self.slow_period).then(|| IndicatorState {
                    fast: mean(&closes[i + 1 - self.fast_period..=i]),
                    slow: mean(&closes[i + 1 - self.slow_period..=i]),
                })
            })
            .collect()
    }
}

/// Exponential moving averages with the same crossover contract.
#[derive(Debug, Clone)]
pub struct EmaCrossover {
    fast: Ema,
    slow: Ema,
    slow_period: usize,
}

impl EmaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self> {
        check_periods(fast_period, slow_period)?;
        Ok(Self {
            fast: Ema::new(fast_period).map_err(|e| Error::IndicatorBuild(format!("{:?}", e)))?,
            slow: Ema::new(slow_period).map_err(|e| Error::IndicatorBuild(format!("{:?}", e)))?,
            slow_period,
        })
    }
}

/// Rounds an EMA value to the comparison scale. Non-finite values have no
/// defined state.
fn comparable(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(EMA_COMPARISON_DP))
}

impl CrossoverIndicator for EmaCrossover {
    fn name(&self) -> &'static str {
        "EmaCrossover"
    }

    fn required_bars(&self) -> usize {
        self.slow_period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<IndicatorState>> {
        if bars.len() < self.slow_period {
            return vec![None; bars.len()];
        }

        // Clone so that every call starts from an empty history.
        let mut fast = self.fast.clone();
        let mut slow = self.slow.clone();

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let close = bar.close.to_f64().unwrap_or_default();
                let fast_val = fast.next(close);
                let slow_val = slow.next(close);
                if i + 1 < self.slow_period {
                    return None;
                }
                Some(IndicatorState { fast: comparable(fast_val)?, slow: comparable(slow_val)? })
            })
            .collect()
    }
}
