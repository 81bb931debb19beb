//! Lifecycle state machine.

use std::fmt;

/// Phases of the service, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Initializing,
    Ready,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// The single state reachable from this one.
    pub fn next(self) -> Option<LifecycleState> {
        match self {
            LifecycleState::Unconfigured => Some(LifecycleState::Initializing),
            LifecycleState::Initializing => Some(LifecycleState::Ready),
            LifecycleState::Ready => Some(LifecycleState::Running),
            LifecycleState::Running => Some(LifecycleState::Stopping),
            LifecycleState::Stopping => Some(LifecycleState::Stopped),
            LifecycleState::Stopped => None,
        }
    }

    /// Move to `to` if it is the next state, otherwise report both ends.
    pub fn advance(&mut self, to: LifecycleState) -> Result<(), (LifecycleState, LifecycleState)> {
        if self.next() == Some(to) {
            *self = to;
            Ok(())
        } else {
            Err((*self, to))
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_state_in_order() {
        let mut state = LifecycleState::Unconfigured;
        for to in [
            LifecycleState::Initializing,
            LifecycleState::Ready,
            LifecycleState::Running,
            LifecycleState::Stopping,
            LifecycleState::Stopped,
        ] {
            state.advance(to).unwrap();
        }
        assert_eq!(state.next(), None);
    }

    #[test]
    fn skipping_is_rejected() {
        let mut state = LifecycleState::Ready;
        assert_eq!(
            state.advance(LifecycleState::Stopping),
            Err((LifecycleState::Ready, LifecycleState::Stopping))
        );
        assert_eq!(state, LifecycleState::Ready);
    }
}
