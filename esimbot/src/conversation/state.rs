//! Dialogue states and the per-session state machine.

use std::fmt;

use thiserror::Error;

/// Stage of the download dialogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialogueState {
    /// Waiting for the user to send an activation code.
    AwaitActivationCode,
    /// Waiting for a confirmation code before the download starts.
    AwaitConfirmationCode,
    /// The engine is running; no input expected.
    Downloading,
    /// The engine asked for a confirmation code mid-download.
    AwaitConfirmationCodeDuringDownload,
    /// Terminal.
    Done,
}

impl DialogueState {
    /// Stable identifier, used as the handler key and in logs.
    pub fn id(self) -> &'static str {
        match self {
            Self::AwaitActivationCode => "download_ask_activation_code",
            Self::AwaitConfirmationCode => "download_ask_confirmation_code",
            Self::Downloading => "downloading",
            Self::AwaitConfirmationCodeDuringDownload => {
                "download_ask_confirmation_code_in_download"
            }
            Self::Done => "done",
        }
    }

    /// Whether a text message is routed to a handler in this state.
    pub fn accepts_input(self) -> bool {
        matches!(
            self,
            Self::AwaitActivationCode
                | Self::AwaitConfirmationCode
                | Self::AwaitConfirmationCodeDuringDownload
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }

    /// Whether an engine attempt is in flight in this state.
    pub fn is_downloading(self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::AwaitConfirmationCodeDuringDownload
        )
    }

    /// Allowed transitions.
    pub fn can_transition_to(self, next: DialogueState) -> bool {
        use DialogueState::*;
        match self {
            AwaitActivationCode => matches!(
                next,
                AwaitActivationCode | AwaitConfirmationCode | Downloading | Done
            ),
            AwaitConfirmationCode => {
                matches!(next, AwaitConfirmationCode | Downloading | Done)
            }
            Downloading => matches!(next, AwaitConfirmationCodeDuringDownload | Done),
            AwaitConfirmationCodeDuringDownload => matches!(
                next,
                AwaitConfirmationCodeDuringDownload | Downloading | Done
            ),
            Done => false,
        }
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid dialogue transition {from} -> {to}")]
pub struct TransitionError {
    pub from: DialogueState,
    pub to: DialogueState,
}

/// Finite-state controller for one session.
///
/// Tracks the current stage and whether the next inbound message should be
/// routed to that stage's handler. Handlers call [`take_expected`] before
/// processing, which clears the expectation, so a message that arrives while
/// a handler is still running is never dispatched to a stale state.
///
/// [`take_expected`]: StateMachine::take_expected
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: DialogueState,
    expecting: bool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Starts in [`DialogueState::AwaitActivationCode`], not yet expecting input.
    pub fn new() -> Self {
        Self {
            current: DialogueState::AwaitActivationCode,
            expecting: false,
        }
    }

    pub fn current(&self) -> DialogueState {
        self.current
    }

    /// The state whose handler will receive the next message, if any.
    pub fn expected(&self) -> Option<DialogueState> {
        (self.expecting && self.current.accepts_input()).then_some(self.current)
    }

    /// Move to `next` without expecting input.
    pub fn transition(&mut self, next: DialogueState) -> Result<(), TransitionError> {
        if !self.current.can_transition_to(next) {
            return Err(TransitionError {
                from: self.current,
                to: next,
            });
        }
        self.current = next;
        self.expecting = false;
        Ok(())
    }

    /// Move to `next` and route the next inbound message to it.
    pub fn expect(&mut self, next: DialogueState) -> Result<(), TransitionError> {
        self.transition(next)?;
        self.expecting = next.accepts_input();
        Ok(())
    }

    /// Take the pending expectation, leaving none behind.
    pub fn take_expected(&mut self) -> Option<DialogueState> {
        let expected = self.expected();
        self.expecting = false;
        expected
    }

    /// Clear the expectation without changing state.
    pub fn complete(&mut self) {
        self.expecting = false;
    }

    /// Enter the terminal state from anywhere.
    pub fn finish(&mut self) {
        self.current = DialogueState::Done;
        self.expecting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DialogueState::*;

    #[test]
    fn test_new_machine_expects_nothing() {
        let machine = StateMachine::new();
        assert_eq!(machine.current(), AwaitActivationCode);
        assert_eq!(machine.expected(), None);
    }

    #[test]
    fn test_take_expected_clears_expectation() {
        let mut machine = StateMachine::new();
        machine.expect(AwaitActivationCode).unwrap();

        assert_eq!(machine.take_expected(), Some(AwaitActivationCode));
        assert_eq!(machine.take_expected(), None);
        assert_eq!(machine.current(), AwaitActivationCode);
    }

    #[test]
    fn test_full_happy_path() {
        let mut machine = StateMachine::new();
        machine.expect(AwaitActivationCode).unwrap();
        machine.take_expected();
        machine.expect(AwaitConfirmationCode).unwrap();
        machine.take_expected();
        machine.transition(Downloading).unwrap();
        assert_eq!(machine.expected(), None);

        machine.expect(AwaitConfirmationCodeDuringDownload).unwrap();
        assert_eq!(
            machine.take_expected(),
            Some(AwaitConfirmationCodeDuringDownload)
        );
        machine.transition(Downloading).unwrap();
        machine.transition(Done).unwrap();
        assert!(machine.current().is_terminal());
    }

    #[test]
    fn test_downloading_never_expects_input() {
        let mut machine = StateMachine::new();
        machine.transition(Downloading).unwrap();
        machine.expect(Downloading).unwrap_err();
        assert_eq!(machine.expected(), None);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut machine = StateMachine::new();
        machine.transition(Downloading).unwrap();
        let err = machine.transition(AwaitActivationCode).unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: Downloading,
                to: AwaitActivationCode
            }
        );

        machine.finish();
        assert!(machine.transition(Downloading).is_err());
        assert!(machine.expect(AwaitActivationCode).is_err());
    }

    #[test]
    fn test_reentering_await_states_is_allowed() {
        for state in [
            AwaitActivationCode,
            AwaitConfirmationCode,
            AwaitConfirmationCodeDuringDownload,
        ] {
            assert!(state.can_transition_to(state), "{state}");
        }
    }

    #[test]
    fn test_state_ids_are_distinct() {
        let ids: std::collections::HashSet<_> = [
            AwaitActivationCode,
            AwaitConfirmationCode,
            Downloading,
            AwaitConfirmationCodeDuringDownload,
            Done,
        ]
        .iter()
        .map(|s| s.id())
        .collect();
        assert_eq!(ids.len(), 5);
    }
}
