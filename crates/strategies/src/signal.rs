// In crates/strategies/src/signal.rs

use crate::IndicatorState;
use core_types::{Bar, Direction, Signal};

/// Classifies the transition between two consecutive defined states.
///
/// Strict inequality is required on both bars: touching lines are not a cross.
pub fn detect_crossover(prev: &IndicatorState, current: &IndicatorState) -> Option<Direction> {
    if prev.fast < prev.slow && current.fast > current.slow {
        // Golden cross: fast line just moved above the slow line.
        Some(Direction::Buy)
    } else if prev.fast > prev.slow && current.fast < current.slow {
        // Death cross: fast line just moved below the slow line.
        Some(Direction::Sell)
    } else {
        None
    }
}

/// Evaluates the last two bars of the window.
///
/// `states` must be the indicator output for `bars`. Returns `None` when
/// either of the last two states is undefined, which covers every window
/// shorter than the indicator's slow length.
pub fn latest_signal(bars: &[Bar], states: &[Option<IndicatorState>]) -> Option<Signal> {
    if bars.len() != states.len() || states.len() < 2 {
        return None;
    }

    let prev = states[states.len() - 2].as_ref()?;
    let current = states[states.len() - 1].as_ref()?;
    let direction = detect_crossover(prev, current)?;
    let bar = bars.last()?;

    Some(Signal { direction, price: bar.close, timestamp: bar.open_time })
}

/// Every crossover in a state series, keyed by the index of the bar on which
/// the lines ended up inverted.
pub fn scan_crossovers(states: &[Option<IndicatorState>]) -> Vec<(usize, Direction)> {
    states
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| match (&pair[0], &pair[1]) {
            (Some(prev), Some(current)) => detect_crossover(prev, current).map(|d| (i + 1, d)),
            _ => None,
        })
        .collect()
}
