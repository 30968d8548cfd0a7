// In crates/core-types/src/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading pair in exchange notation (e.g., "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one running loop. The value doubles as the chat id that
/// notifications for the session are delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single OHLCV candle. Windows of bars are always ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time in milliseconds since the epoch.
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Close time in milliseconds since the epoch. A bar whose close time is
    /// still in the future is the one currently forming.
    pub close_time: i64,
}

impl Bar {
    pub fn is_closed_at(&self, now_millis: i64) -> bool {
        self.close_time <= now_millis
    }
}

/// The direction of a crossover signal and of the order it may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// The side string the exchange expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directional signal derived from a crossover. The absence of a signal is
/// modelled as `Option::<Signal>::None` by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Close price of the bar that produced the signal.
    pub price: Decimal,
    /// Open time of the bar that produced the signal.
    pub timestamp: i64,
}

/// The net position currently held for a symbol, as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: Symbol,
    /// Positive for long, negative for short, zero when flat.
    pub signed_quantity: Decimal,
}

/// A market order that has passed the position gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Direction,
    pub quantity: Decimal,
}

/// The exchange's acknowledgement of a submitted market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: i64,
    pub symbol: Symbol,
    pub side: Direction,
    pub executed_quantity: Decimal,
    pub average_price: Decimal,
    pub status: String,
}
