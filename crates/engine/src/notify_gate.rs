// In crates/engine/src/notify_gate.rs

use app_config::NotifyPolicy;
use core_types::Signal;

/// Suppresses announcing the same direction twice in a row.
#[derive(Debug, Clone, Copy)]
pub struct NotificationGate {
    policy: NotifyPolicy,
}

impl NotificationGate {
    pub fn new(policy: NotifyPolicy) -> Self {
        Self { policy }
    }

    /// Whether signals the position gate dropped are announced too.
    pub fn announces_unplaced_signals(&self) -> bool {
        self.policy == NotifyPolicy::OnSignal
    }

    /// Returns `true` when `signal` should be announced and records it as the
    /// session's last signal. A fresh session (no last signal) always admits.
    pub fn admit(&self, signal: &Signal, last_signal: &mut Option<Signal>) -> bool {
        if last_signal.as_ref().is_some_and(|last| last.direction == signal.direction) {
            return false;
        }
        *last_signal = Some(signal.clone());
        true
    }
}
