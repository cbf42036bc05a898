//! Session state machine using rust-fsm.
//!
//! The session lives in exactly one of six states; every lifecycle operation
//! drives it through explicit transitions instead of deriving state from
//! storage checks.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │   NotLoggedIn   │ (initial)
//! └────────┬────────┘
//!          │ LoginAttempt / ValidateSession
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │   LoggingIn     │     │   Validating    │
//! └────────┬────────┘     └────────┬────────┘
//!          │ LoginSuccess          │ SessionRestored
//!          │ LoginFailed           │ NoSession / ValidationFailed
//!          ▼                       ▼
//! ┌─────────────────┐      TokenExpired      ┌─────────────────┐
//! │    LoggedIn     │ ─────────────────────► │   Refreshing    │
//! └────────┬────────┘                        └────────┬────────┘
//!          │ LogoutRequested                          │ RefreshSuccess
//!          ▼                                          │ RefreshFailed
//! ┌─────────────────┐                                 ▼
//! │  LoggingOut     │                        LoggedIn/NotLoggedIn
//! └────────┬────────┘
//!          │ LogoutComplete
//!          ▼
//!     NotLoggedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// The macro generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(NotLoggedIn)

    NotLoggedIn => {
        LoginAttempt => LoggingIn,
        ValidateSession => Validating
    },
    Validating => {
        // Stored token accepted by the server
        SessionRestored => LoggedIn,
        // Stored token rejected by the server
        ValidationFailed => NotLoggedIn,
        // Nothing persisted
        NoSession => NotLoggedIn
    },
    LoggingIn => {
        LoginSuccess => LoggedIn,
        LoginFailed => NotLoggedIn
    },
    LoggedIn => {
        TokenExpired => Refreshing,
        LogoutRequested => LoggingOut
    },
    Refreshing => {
        RefreshSuccess => LoggedIn,
        RefreshFailed => NotLoggedIn
    },
    LoggingOut => {
        LogoutComplete => NotLoggedIn
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// User-friendly session state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not logged in.
    NotLoggedIn,
    /// Currently logging in.
    LoggingIn,
    /// Validating a persisted session on startup.
    Validating,
    /// Logged in with a usable token pair.
    LoggedIn,
    /// Refreshing the access token.
    Refreshing,
    /// Currently logging out.
    LoggingOut,
}

impl SessionState {
    /// Returns true if the user has a valid session (LoggedIn state only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::LoggedIn)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::LoggingIn
                | SessionState::Validating
                | SessionState::Refreshing
                | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::NotLoggedIn => SessionState::NotLoggedIn,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Validating => SessionState::Validating,
            SessionMachineState::LoggedIn => SessionState::LoggedIn,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_not_logged_in() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        machine.consume(&SessionInput::LoginSuccess).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_login_failure_returns_to_not_logged_in() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_startup_validation_restores_session() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::ValidateSession).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Validating);

        machine.consume(&SessionInput::SessionRestored).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_startup_validation_without_session() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::ValidateSession).unwrap();
        machine.consume(&SessionInput::NoSession).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_startup_validation_rejected_by_server() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::ValidateSession).unwrap();
        machine.consume(&SessionInput::ValidationFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_token_expired_triggers_refresh() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSuccess).unwrap();

        machine.consume(&SessionInput::TokenExpired).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine.consume(&SessionInput::RefreshSuccess).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_refresh_failure_ends_session() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSuccess).unwrap();
        machine.consume(&SessionInput::TokenExpired).unwrap();

        machine.consume(&SessionInput::RefreshFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_logout_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSuccess).unwrap();

        machine.consume(&SessionInput::LogoutRequested).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine.consume(&SessionInput::LogoutComplete).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_invalid_transition_returns_error() {
        let mut machine = SessionMachine::new();

        // Can't logout from NotLoggedIn
        assert!(machine.consume(&SessionInput::LogoutRequested).is_err());

        // Can't claim LoginSuccess from NotLoggedIn
        assert!(machine.consume(&SessionInput::LoginSuccess).is_err());
    }

    #[test]
    fn test_session_state_is_authenticated() {
        assert!(!SessionState::NotLoggedIn.is_authenticated());
        assert!(!SessionState::LoggingIn.is_authenticated());
        assert!(!SessionState::Validating.is_authenticated());
        assert!(SessionState::LoggedIn.is_authenticated());
        assert!(!SessionState::Refreshing.is_authenticated());
        assert!(!SessionState::LoggingOut.is_authenticated());
    }

    #[test]
    fn test_session_state_is_transient() {
        assert!(!SessionState::NotLoggedIn.is_transient());
        assert!(SessionState::LoggingIn.is_transient());
        assert!(SessionState::Validating.is_transient());
        assert!(!SessionState::LoggedIn.is_transient());
        assert!(SessionState::Refreshing.is_transient());
        assert!(SessionState::LoggingOut.is_transient());
    }
}
