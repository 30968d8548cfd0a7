// In crates/risk/src/lib.rs

use core_types::{OrderRequest, PositionSnapshot, Signal};
pub mod position_gate;

pub mod error;

// Re-export public types
pub use error::{Error, Result};
pub use position_gate::PositionGate;

/// The universal interface for the gate between a signal and an order.
///
/// A `RiskManager` decides whether a directional `Signal` may turn into an
/// `OrderRequest` given the position currently held on the exchange.
pub trait RiskManager: Send + Sync {
    /// The name of the risk management rule set.
    fn name(&self) -> &'static str;

    /// Evaluates a signal against the current position.
    ///
    /// # Returns
    ///
    /// * `Some(OrderRequest)`: the signal is actionable and this order should be placed.
    /// * `None`: the signal is not actionable and is dropped. This is not an error.
    fn evaluate(&self, signal: &Signal, position: &PositionSnapshot) -> Option<OrderRequest>;
}
