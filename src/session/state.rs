//! Interactive shell state machine.

/// Lifecycle of the interactive command channel of one session.
///
/// The boolean views exposed to callers (`is_running`) are derived from
/// this state, so combinations such as "idle but mid-dispatch" cannot be
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellState {
    /// No command in flight; dispatch is allowed.
    #[default]
    Idle,
    /// Dispatch accepted, channel being opened.
    AwaitingDispatch,
    /// Command channel open; output is accumulating.
    Running,
    /// Session is being torn down; nothing else is accepted.
    Terminating,
}

impl ShellState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> AwaitingDispatch
    /// - AwaitingDispatch -> Running
    /// - AwaitingDispatch -> Idle (channel could not be opened)
    /// - Running -> Idle
    /// - any non-terminal state -> Terminating
    pub fn can_transition_to(&self, target: ShellState) -> bool {
        use ShellState::*;
        matches!(
            (*self, target),
            (Idle, AwaitingDispatch)
                | (AwaitingDispatch, Running)
                | (AwaitingDispatch, Idle)
                | (Running, Idle)
                | (Idle, Terminating)
                | (AwaitingDispatch, Terminating)
                | (Running, Terminating)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: ShellState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::SshRelayError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Whether a command counts as running (dispatched and not yet done).
    pub fn is_running(&self) -> bool {
        matches!(self, ShellState::AwaitingDispatch | ShellState::Running)
    }

    /// Whether a new command may be dispatched.
    pub fn can_dispatch(&self) -> bool {
        matches!(self, ShellState::Idle)
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShellState::Terminating)
    }
}
