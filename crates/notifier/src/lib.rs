// In crates/notifier/src/lib.rs

use async_trait::async_trait;
use core_types::SessionId;

pub mod error;
pub mod messages;
pub mod telegram;

pub use error::{Error, Result};
pub use telegram::TelegramNotifier;

/// Delivers a text message to the channel a session reports to.
///
/// Delivery is best-effort: callers log a failure and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, session: SessionId, text: &str) -> Result<()>;
}
