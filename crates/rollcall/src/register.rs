//! The attendance register for one session.
//!
//! A [`Register`] owns the session's ledger and request queue and writes each
//! back to the store after every change. Writes are not retried; a failed
//! write is logged and the in-memory state stays authoritative.

use tracing::{debug, info, warn};

use crate::attendance::{AttendanceLedger, AttendanceStats, LedgerRow, PresenceFilter};
use crate::error::Result;
use crate::handoff::{self, ScanHandoff};
use crate::requests::{AttendanceRequest, RequestId, RequestQueue};
use crate::roster::{RosterEntry, StudentId};
use crate::storage::{self, KeyKind, KvStore, SessionScope};

/// How the register's ledger was obtained when it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrigin {
    /// Loaded from the store as it was last written.
    Restored,
    /// Freshly seeded from scan results.
    Seeded,
    /// Loaded from the store, with a rescan merged in.
    Merged {
        /// Students the rescan newly marked present.
        added: usize,
    },
}

/// Ledger plus request queue for a session, persisted on every change.
#[derive(Debug)]
pub struct Register<'a> {
    store: &'a dyn KvStore,
    scope: SessionScope,
    ledger: AttendanceLedger,
    requests: RequestQueue,
    origin: LedgerOrigin,
}

impl<'a> Register<'a> {
    /// Open the register for `scope`.
    ///
    /// A stored ledger is used as is, unless it was prepared for a rescan and
    /// `scan` carries the new results: those are merged in additively (see
    /// [`AttendanceLedger::merge_detected`]). Without a stored ledger a new
    /// one is seeded from `roster` and the scan ids
    /// ([`handoff::resolve_scanned_ids`]). A stored request queue is used as
    /// is, otherwise `requests` becomes the queue.
    pub fn open(
        store: &'a dyn KvStore,
        scope: SessionScope,
        roster: Vec<RosterEntry>,
        requests: Vec<AttendanceRequest>,
        scan: Option<&ScanHandoff>,
    ) -> Self {
        let stored: Option<AttendanceLedger> =
            storage::load(store, &scope.key(KeyKind::Attendance).to_string());
        let (ledger, origin) = match stored {
            Some(ledger) => {
                let mut ledger = ledger.normalized();
                match scan {
                    Some(scan) if ledger.awaiting_rescan() => {
                        let added = ledger.merge_detected(&scan.scanned_ids);
                        (ledger, LedgerOrigin::Merged { added })
                    }
                    _ => (ledger, LedgerOrigin::Restored),
                }
            }
            None => {
                let ids = handoff::resolve_scanned_ids(scan, store, scope);
                (AttendanceLedger::seeded(roster, &ids), LedgerOrigin::Seeded)
            }
        };

        let stored: Option<RequestQueue> =
            storage::load(store, &scope.key(KeyKind::Requests).to_string());
        let restored_requests = stored.is_some();
        let requests = stored.unwrap_or_else(|| requests.into_iter().collect());

        let register = Self {
            store,
            scope,
            ledger,
            requests,
            origin,
        };
        if origin != LedgerOrigin::Restored {
            register.save_ledger();
        }
        if !restored_requests {
            register.save_requests();
        }

        info!(%scope, origin = ?origin, students = register.ledger.len(), "Register opened");
        register
    }

    /// Remove everything stored for `scope`, so the next open seeds afresh.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn reset(store: &dyn KvStore, scope: SessionScope) -> Result<usize> {
        let mut removed = 0;
        for key in scope.all_keys() {
            if store.remove(&key.to_string())? {
                removed += 1;
            }
        }
        info!(%scope, removed, "Session reset");
        Ok(removed)
    }

    /// The session this register belongs to.
    #[must_use]
    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    /// How the ledger was obtained.
    #[must_use]
    pub fn origin(&self) -> LedgerOrigin {
        self.origin
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    /// Pending requests.
    #[must_use]
    pub fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    /// Search the ledger. See [`AttendanceLedger::query`].
    #[must_use]
    pub fn query(&self, search: &str, filter: PresenceFilter) -> Vec<LedgerRow<'_>> {
        self.ledger.query(search, filter)
    }

    /// Ledger statistics.
    #[must_use]
    pub fn stats(&self) -> AttendanceStats {
        self.ledger.stats()
    }

    /// Check if a scan has been recorded for this session.
    #[must_use]
    pub fn has_auto_scanned(&self) -> bool {
        handoff::has_auto_scanned(self.store, self.scope)
    }

    /// Mark a student present or absent. Unknown ids are a no-op.
    pub fn set_present(&mut self, id: StudentId, present: bool) -> bool {
        let changed = self.ledger.set_present(id, present);
        if changed {
            self.save_ledger();
        }
        changed
    }

    /// Flip a student's presence. Returns the new value, `None` if unknown.
    pub fn toggle(&mut self, id: StudentId) -> Option<bool> {
        let present = self.ledger.toggle(id)?;
        self.save_ledger();
        Some(present)
    }

    /// Mark every student present.
    pub fn mark_all_present(&mut self) {
        self.ledger.mark_all_present();
        self.save_ledger();
    }

    /// Mark every student absent.
    pub fn mark_all_absent(&mut self) {
        self.ledger.mark_all_absent();
        self.save_ledger();
    }

    /// Accept a pending request. Unknown ids are a no-op.
    pub fn accept(&mut self, id: RequestId) -> Option<AttendanceRequest> {
        let request = self.requests.accept(id, &mut self.ledger)?;
        self.save_ledger();
        self.save_requests();
        Some(request)
    }

    /// Reject a pending request. Unknown ids are a no-op.
    pub fn reject(&mut self, id: RequestId) -> Option<AttendanceRequest> {
        let request = self.requests.reject(id)?;
        self.save_requests();
        Some(request)
    }

    /// Prepare for another scan.
    ///
    /// Auto-detected students stay present but become manually marked. The
    /// next scan handed to [`open`](Self::open) is merged into the ledger.
    /// Returns how many records changed.
    pub fn prepare_rescan(&mut self) -> usize {
        let converted = self.ledger.clear_auto_detected();
        self.save_ledger();
        debug!(scope = %self.scope, converted, "Prepared for rescan");
        converted
    }

    fn save_ledger(&self) {
        let key = self.scope.key(KeyKind::Attendance).to_string();
        if let Err(e) = storage::save(self.store, &key, &self.ledger) {
            warn!(key = %key, error = %e, "Failed to save attendance");
        }
    }

    fn save_requests(&self) {
        let key = self.scope.key(KeyKind::Requests).to_string();
        if let Err(e) = storage::save(self.store, &key, &self.requests) {
            warn!(key = %key, error = %e, "Failed to save requests");
        }
    }
}
