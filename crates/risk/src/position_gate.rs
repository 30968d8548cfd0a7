// In crates/risk/src/position_gate.rs

use crate::{Error, Result, RiskManager};
use core_types::{Direction, OrderRequest, PositionSnapshot, Signal};
use rust_decimal::Decimal;

/// Lets a signal through only when it would not add to a position that is
/// already held in the same direction.
///
/// * Buy is actionable when flat or short (`signed_quantity <= 0`).
/// * Sell is actionable when flat or long (`signed_quantity >= 0`).
///
/// Every approved order uses the same configured quantity.
#[derive(Debug, Clone)]
pub struct PositionGate {
    order_size: Decimal,
}

impl PositionGate {
    pub fn new(order_size: Decimal) -> Result<Self> {
        if order_size <= Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "order size must be positive, got {}",
                order_size
            )));
        }
        Ok(Self { order_size })
    }

    pub fn is_actionable(direction: Direction, position: &PositionSnapshot) -> bool {
        match direction {
            Direction::Buy => position.signed_quantity <= Decimal::ZERO,
            Direction::Sell => position.signed_quantity >= Decimal::ZERO,
        }
    }
}

impl RiskManager for PositionGate {
    fn name(&self) -> &'static str {
        "PositionGate"
    }

    fn evaluate(&self, signal: &Signal, position: &PositionSnapshot) -> Option<OrderRequest> {
        if !Self::is_actionable(signal.direction, position) {
            tracing::debug!(
                symbol = %position.symbol,
                direction = %signal.direction,
                position = %position.signed_quantity,
                "Signal matches the open position; dropping it."
            );
            return None;
        }

        Some(OrderRequest {
            symbol: position.symbol.clone(),
            side: signal.direction,
            quantity: self.order_size,
        })
    }
}
