//! PIN unlock and the login session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::{self, KvStore, AUTH_SESSION_KEY};

/// Number of digits in a PIN.
pub const PIN_LENGTH: usize = 4;

/// A secret held only as its BLAKE3 digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(blake3::Hash);

impl Secret {
    /// Digest `value`.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(blake3::hash(value.as_bytes()))
    }

    /// Check `candidate` in constant time.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == blake3::hash(candidate.as_bytes())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Result of pressing a key on the PIN pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEntry {
    /// More digits needed; holds the number entered so far.
    Incomplete(usize),
    /// The full PIN matched.
    Accepted,
    /// The full PIN did not match. The pad has been cleared.
    Rejected,
}

/// Four-slot PIN entry.
#[derive(Debug, Clone)]
pub struct PinPad {
    secret: Secret,
    digits: String,
}

impl PinPad {
    /// Create an empty pad that unlocks with `pin`.
    #[must_use]
    pub fn new(pin: &str) -> Self {
        Self::with_secret(Secret::new(pin))
    }

    /// Create an empty pad that unlocks with `secret`.
    #[must_use]
    pub fn with_secret(secret: Secret) -> Self {
        Self {
            secret,
            digits: String::with_capacity(PIN_LENGTH),
        }
    }

    /// Digits entered so far.
    #[must_use]
    pub fn entered(&self) -> usize {
        self.digits.len()
    }

    /// Press one key. Anything other than an ASCII digit is ignored.
    pub fn press(&mut self, key: char) -> PinEntry {
        if !key.is_ascii_digit() {
            return PinEntry::Incomplete(self.digits.len());
        }
        self.digits.push(key);
        if self.digits.len() < PIN_LENGTH {
            return PinEntry::Incomplete(self.digits.len());
        }

        let accepted = self.secret.matches(&self.digits);
        self.digits.clear();
        if accepted {
            PinEntry::Accepted
        } else {
            debug!("Incorrect PIN entered");
            PinEntry::Rejected
        }
    }

    /// Remove the last digit.
    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    /// Clear all digits.
    pub fn clear(&mut self) {
        self.digits.clear();
    }

    /// Type `input` key by key until the pad verifies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPin`] if the PIN is wrong or fewer than
    /// [`PIN_LENGTH`] digits were typed.
    pub fn enter(&mut self, input: &str) -> Result<()> {
        for key in input.chars() {
            match self.press(key) {
                PinEntry::Accepted => return Ok(()),
                PinEntry::Rejected => return Err(Error::InvalidPin),
                PinEntry::Incomplete(_) => {}
            }
        }
        self.clear();
        Err(Error::InvalidPin)
    }
}

/// A stored login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Opaque session token.
    pub token: String,
    /// When the session started.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Start a session at `now` lasting `ttl`.
    #[must_use]
    pub fn issue(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: format!("{:032x}", rand::random::<u128>()),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the session is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left at `now`, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Logs in and out against a store.
#[derive(Debug)]
pub struct Authenticator<'a> {
    store: &'a dyn KvStore,
    pin: Secret,
    ttl: Duration,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator for `pin` issuing sessions of length `ttl`.
    #[must_use]
    pub fn new(store: &'a dyn KvStore, pin: &str, ttl: Duration) -> Self {
        Self {
            store,
            pin: Secret::new(pin),
            ttl,
        }
    }

    /// Verify `pin` and store a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPin`] on a wrong PIN, or a storage error if
    /// the session cannot be written.
    pub fn login(&self, pin: &str, now: DateTime<Utc>) -> Result<AuthSession> {
        PinPad::with_secret(self.pin.clone()).enter(pin)?;
        let session = AuthSession::issue(now, self.ttl);
        storage::save(self.store, AUTH_SESSION_KEY, &session)?;
        info!(expires_at = %session.expires_at, "Logged in");
        Ok(session)
    }

    /// Remove the stored session. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn logout(&self) -> Result<bool> {
        let removed = self.store.remove(AUTH_SESSION_KEY)?;
        info!(removed, "Logged out");
        Ok(removed)
    }

    /// The stored session if it is still valid at `now`.
    #[must_use]
    pub fn current(&self, now: DateTime<Utc>) -> Option<AuthSession> {
        let session: AuthSession = storage::load(self.store, AUTH_SESSION_KEY)?;
        if session.is_valid_at(now) {
            Some(session)
        } else {
            debug!(expired_at = %session.expires_at, "Stored session has expired");
            None
        }
    }

    /// Require a valid session at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] if there is none.
    pub fn require(&self, now: DateTime<Utc>) -> Result<AuthSession> {
        self.current(now).ok_or(Error::NotAuthenticated)
    }
}
