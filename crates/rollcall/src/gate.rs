//! Session code check in front of the automatic scan.

use tracing::{debug, info};

use crate::auth::Secret;
use crate::error::{Error, Result};

/// Message shown when a code is rejected.
pub const INVALID_CODE_MESSAGE: &str = "Invalid code. Please try again.";

/// Where the gate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Waiting for the instructor to enter the session code.
    #[default]
    AwaitingCode,
    /// The code was accepted; scanning may begin.
    Scanning,
}

/// Two-state gate opened by an exact session code.
#[derive(Debug, Clone)]
pub struct SessionCodeGate {
    secret: Secret,
    state: GateState,
    error: Option<&'static str>,
}

impl SessionCodeGate {
    /// Create a closed gate for `code`.
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            secret: Secret::new(code),
            state: GateState::AwaitingCode,
            error: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Inline error from the last rejected attempt.
    #[must_use]
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Try `code`. Only an exact match moves the gate to
    /// [`GateState::Scanning`]; a rejected code leaves it awaiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionCode`] if the code does not match.
    pub fn submit(&mut self, code: &str) -> Result<()> {
        if self.state == GateState::Scanning {
            return Ok(());
        }
        if self.secret.matches(code) {
            self.state = GateState::Scanning;
            self.error = None;
            info!("Session code accepted");
            Ok(())
        } else {
            self.error = Some(INVALID_CODE_MESSAGE);
            debug!("Session code rejected");
            Err(Error::InvalidSessionCode)
        }
    }

    /// Close the gate again, e.g. when the scan screen is left.
    pub fn reset(&mut self) {
        self.state = GateState::AwaitingCode;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_code_stays_awaiting() {
        let mut gate = SessionCodeGate::new("123456");
        let err = gate.submit("000000").unwrap_err();
        assert!(err.is_validation_failure());
        assert_eq!(gate.state(), GateState::AwaitingCode);
        assert_eq!(gate.error(), Some(INVALID_CODE_MESSAGE));
    }

    #[test]
    fn test_correct_code_opens() {
        let mut gate = SessionCodeGate::new("123456");
        gate.submit("000000").unwrap_err();
        gate.submit("123456").unwrap();
        assert_eq!(gate.state(), GateState::Scanning);
        assert!(gate.error().is_none());
    }

    #[test]
    fn test_match_is_exact() {
        let mut gate = SessionCodeGate::new("123456");
        for code in ["12345", "1234567", " 123456", "123456 ", ""] {
            assert!(gate.submit(code).is_err(), "{code:?} should be rejected");
        }
        assert_eq!(gate.state(), GateState::AwaitingCode);
    }

    #[test]
    fn test_reset() {
        let mut gate = SessionCodeGate::new("ABC123");
        gate.submit("ABC123").unwrap();
        gate.reset();
        assert_eq!(gate.state(), GateState::AwaitingCode);
        assert!(gate.submit("abc123").is_err());
    }
}
