//! Session state machine.

use ringline_types::SessionState;

/// Tracks one session's state and refuses illegal transitions.
#[derive(Debug)]
pub struct Lifecycle {
    session_id: String,
    state: SessionState,
}

impl Lifecycle {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `next` if legal. Returns whether the transition happened.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.session_id,
                from = %self.state,
                to = %next,
                "ignoring illegal session transition"
            );
            return false;
        }
        tracing::info!(session_id = %self.session_id, from = %self.state, to = %next, "session state changed");
        self.state = next;
        true
    }

    pub fn fail(&mut self, reason: &str) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        tracing::error!(session_id = %self.session_id, from = %self.state, reason, "session failed");
        self.state = SessionState::Failed;
        true
    }

    /// Audio and tool results only flow while active.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}
