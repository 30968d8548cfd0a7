// In crates/web-server/src/types.rs

use serde::Serialize;

/// Response body of `POST /api/sessions/{id}/stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// `false` when the session had no job; stopping is then a no-op.
    pub was_running: bool,
}
