// In crates/engine/src/session.rs

use core_types::{SessionId, Signal};
use serde::Serialize;

/// Mutable per-session state. Owned by the session's job and lent to the
/// tick function; never shared between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// The last signal that was announced.
    pub last_signal: Option<Signal>,
    pub consecutive_failures: u32,
}

impl SessionState {
    pub fn status(&self, session: SessionId, running: bool) -> SessionStatus {
        SessionStatus {
            session,
            running,
            last_signal: self.last_signal.clone(),
            consecutive_failures: self.consecutive_failures,
        }
    }
}

/// What `status(session)` reports to a front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session: SessionId,
    pub running: bool,
    pub last_signal: Option<Signal>,
    pub consecutive_failures: u32,
}

impl SessionStatus {
    /// The status of a session that has no job.
    pub fn stopped(session: SessionId) -> Self {
        SessionState::default().status(session, false)
    }
}
