//! Versioned, checksummed JSON envelope for stored values.
//!
//! Reads are forgiving: anything that is missing, unreadable, from another
//! envelope version, or fails its checksum is reported as "no prior state"
//! with a warning.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::KvStore;
use crate::error::Result;

/// Envelope format version written by this build.
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    saved_at: DateTime<Utc>,
    payload: Value,
}

/// Why a stored value could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not a JSON envelope, or the payload has the wrong shape.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Written by an incompatible version.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    /// Payload does not match its checksum.
    #[error("checksum mismatch")]
    ChecksumMismatch,
}

fn checksum(payload: &Value) -> Result<String> {
    let canonical = serde_json::to_string(payload)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Wrap `value` in an envelope and serialize it.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    let payload = serde_json::to_value(value)?;
    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        checksum: checksum(&payload)?,
        saved_at: Utc::now(),
        payload,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Unwrap and verify an envelope.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing why the value was rejected.
pub fn decode<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    let expected = serde_json::to_string(&envelope.payload)?;
    if blake3::hash(expected.as_bytes()).to_hex().as_str() != envelope.checksum {
        return Err(DecodeError::ChecksumMismatch);
    }
    Ok(serde_json::from_value(envelope.payload)?)
}

/// Write `value` under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = encode(value)?;
    store.set(key, &raw)?;
    debug!(key, bytes = raw.len(), "Saved value");
    Ok(())
}

/// Read the value under `key`, or `None` if there is no usable prior state.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored value, treating as absent");
            return None;
        }
    };

    match decode(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable stored value");
            None
        }
    }
}
