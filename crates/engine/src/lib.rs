// In crates/engine/src/lib.rs

pub mod backoff;
pub mod error;
pub mod notify_gate;
pub mod scheduler;
pub mod session;
pub mod task;

#[cfg(test)]
mod testing;

// Re-export public types
pub use error::{Error, Result};
pub use scheduler::Scheduler;
pub use session::{SessionState, SessionStatus};
pub use task::{TickOutcome, TradingTask};
