//! Passing scan results to the register.
//!
//! A completed scan hands its detected ids straight to the register and also
//! records them in the store, together with a flag saying the scope has been
//! auto-scanned. The register prefers the direct hand-off when it carries any
//! ids and falls back to the stored copy otherwise.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::roster::StudentId;
use crate::scan::ScanSummary;
use crate::storage::{self, KeyKind, KvStore, SessionScope};

/// Ids detected by a scan, on their way to the register.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScanHandoff {
    /// Detected ids in detection order.
    pub scanned_ids: Vec<StudentId>,
}

impl ScanHandoff {
    /// Hand-off for a finished scan.
    #[must_use]
    pub fn from_summary(summary: &ScanSummary) -> Self {
        Self {
            scanned_ids: summary.detected_ids(),
        }
    }

    /// Store the ids and set the auto-scanned flag for `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub fn record(&self, store: &dyn KvStore, scope: SessionScope) -> Result<()> {
        let ids_key = scope.key(KeyKind::ScannedStudents).to_string();
        let flag_key = scope.key(KeyKind::AutoScanned).to_string();
        storage::save(store, &ids_key, &self.scanned_ids)?;
        storage::save(store, &flag_key, &true)?;
        debug!(%scope, detected = self.scanned_ids.len(), "Scan hand-off recorded");
        Ok(())
    }
}

/// Ids stored by the last recorded scan of `scope`.
#[must_use]
pub fn stored_scanned_ids(store: &dyn KvStore, scope: SessionScope) -> Vec<StudentId> {
    storage::load(store, &scope.key(KeyKind::ScannedStudents).to_string()).unwrap_or_default()
}

/// Pick the ids to seed a register with.
#[must_use]
pub fn resolve_scanned_ids(
    handoff: Option<&ScanHandoff>,
    store: &dyn KvStore,
    scope: SessionScope,
) -> Vec<StudentId> {
    match handoff {
        Some(handoff) if !handoff.scanned_ids.is_empty() => handoff.scanned_ids.clone(),
        _ => stored_scanned_ids(store, scope),
    }
}

/// Check if a scan has been recorded for `scope`.
#[must_use]
pub fn has_auto_scanned(store: &dyn KvStore, scope: SessionScope) -> bool {
    storage::load(store, &scope.key(KeyKind::AutoScanned).to_string()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn handoff(ids: &[StudentId]) -> ScanHandoff {
        ScanHandoff {
            scanned_ids: ids.to_vec(),
        }
    }

    #[test]
    fn test_record_sets_ids_and_flag() {
        let store = MemoryStore::new();
        let scope = SessionScope::class(1);
        assert!(!has_auto_scanned(&store, scope));

        handoff(&[2, 5, 7]).record(&store, scope).unwrap();

        assert!(has_auto_scanned(&store, scope));
        assert_eq!(stored_scanned_ids(&store, scope), vec![2, 5, 7]);
        assert!(!has_auto_scanned(&store, SessionScope::class(2)));
    }

    #[test]
    fn test_prefers_non_empty_handoff() {
        let store = MemoryStore::new();
        let scope = SessionScope::class(1);
        handoff(&[1, 2]).record(&store, scope).unwrap();

        let fresh = handoff(&[9]);
        assert_eq!(resolve_scanned_ids(Some(&fresh), &store, scope), vec![9]);
        assert_eq!(
            resolve_scanned_ids(Some(&handoff(&[])), &store, scope),
            vec![1, 2]
        );
        assert_eq!(resolve_scanned_ids(None, &store, scope), vec![1, 2]);
    }

    #[test]
    fn test_nothing_stored() {
        let store = MemoryStore::new();
        assert!(resolve_scanned_ids(None, &store, SessionScope::class(3)).is_empty());
    }
}
