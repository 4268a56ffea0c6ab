use strum_macros::Display;

/// Lifecycle of an interactive session as shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Running,
    AwaitingInput,
    Stopped,
}

impl SessionState {
    /// First draw of the UI.
    pub fn mounted(self) -> Self {
        match self {
            SessionState::Uninitialized => SessionState::Running,
            other => other,
        }
    }

    /// Follow whether the agent is currently blocked on a prompt.
    pub fn with_prompt_pending(self, pending: bool) -> Self {
        match (self, pending) {
            (SessionState::Stopped, _) => SessionState::Stopped,
            (SessionState::Running, true) => SessionState::AwaitingInput,
            (SessionState::AwaitingInput, false) => SessionState::Running,
            (state, _) => state,
        }
    }

    pub fn stopped(self) -> Self {
        SessionState::Stopped
    }

    pub fn is_stopped(self) -> bool {
        self == SessionState::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn follows_prompt_lifecycle() {
        let state = SessionState::default();
        assert_eq!(state.with_prompt_pending(true), SessionState::Uninitialized);
        let state = state.mounted();
        assert_eq!(state, SessionState::Running);
        let state = state.with_prompt_pending(true);
        assert_eq!(state, SessionState::AwaitingInput);
        assert_eq!(state.to_string(), "AWAITING_INPUT");
        assert_eq!(state.with_prompt_pending(false), SessionState::Running);
    }

    #[test]
    fn stopped_is_terminal() {
        let state = SessionState::AwaitingInput.stopped();
        assert!(state.is_stopped());
        assert_eq!(state.mounted(), SessionState::Stopped);
        assert_eq!(state.with_prompt_pending(true), SessionState::Stopped);
        assert_eq!(state.with_prompt_pending(false), SessionState::Stopped);
    }
}
