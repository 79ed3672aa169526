//! Supervisor lifecycle states.

use std::fmt;

/// `Idle -> Connecting -> Joined -> Disconnecting -> Stopped`.
///
/// `Stopped` is terminal; a new supervisor must be started to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    Idle,
    Connecting,
    Joined,
    Disconnecting,
    Stopped,
}

impl SupervisorState {
    /// Whether inbound events may be delivered in this state.
    pub fn accepts_events(self) -> bool {
        self == SupervisorState::Joined
    }

    pub fn is_terminal(self) -> bool {
        self == SupervisorState::Stopped
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Connecting => "connecting",
            SupervisorState::Joined => "joined",
            SupervisorState::Disconnecting => "disconnecting",
            SupervisorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_joined_accepts_events() {
        assert!(SupervisorState::Joined.accepts_events());
        assert!(!SupervisorState::Connecting.accepts_events());
        assert!(!SupervisorState::Disconnecting.accepts_events());
    }

    #[test]
    fn test_stopped_is_terminal() {
        assert!(SupervisorState::Stopped.is_terminal());
        assert!(!SupervisorState::Idle.is_terminal());
        assert_eq!(SupervisorState::Joined.to_string(), "joined");
    }
}
