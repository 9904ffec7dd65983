/// Session lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Bytes flow in both directions.
    Active,
    /// Teardown has begun; no new input is accepted.
    Closing,
    /// Process stopped, connection closed, registry entry gone.
    Terminated,
}

impl SessionState {
    /// Move to `next` if it lies ahead. Returns whether the state changed.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}
