// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{OrderRequest, OrderResult};
pub mod error;
pub mod live;

// Re-export public types
pub use error::{Error, Result};
pub use live::LiveExecutor;

/// The universal interface for an execution handler.
///
/// An `Executor` takes an `OrderRequest` that already passed the position
/// gate and submits it as a market order. Executors are shared by every
/// session, so `execute` takes `&self`.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The name of the executor (e.g., "LiveExecutor").
    fn name(&self) -> &'static str;

    /// Submits a market order for the request's fixed quantity.
    ///
    /// # Returns
    ///
    /// The exchange's `OrderResult` on success, or an `Error` if the order
    /// could not be placed. A failure is never retried here.
    async fn execute(&self, order_request: &OrderRequest) -> Result<OrderResult>;
}
