// In crates/strategies/src/lib.rs

use core_types::Bar;
use rust_decimal::Decimal;
pub mod error;
pub mod factory;
pub mod ma_crossover;
pub mod signal;
pub mod types;

pub use error::{Error, Result};
pub use factory::create_indicator;
pub use signal::{detect_crossover, latest_signal, scan_crossovers};

/// The pair of averages computed for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorState {
    pub fast: Decimal,
    pub slow: Decimal,
}

/// The universal interface for a two-line crossover indicator.
///
/// An indicator turns a window of bars (oldest first) into one optional
/// `IndicatorState` per bar. A state is `None` until enough preceding bars
/// exist to define both lines, and every entry is `None` when the window is
/// shorter than `required_bars`. Implementations are interchangeable: the
/// signal evaluator only ever compares `fast` against `slow`.
pub trait CrossoverIndicator: Send + Sync {
    /// The name of the indicator.
    fn name(&self) -> &'static str;

    /// The minimum window length for any state to be defined.
    fn required_bars(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<Option<IndicatorState>>;
}
