//! Attendance ledger.
//!
//! The ledger holds one [`AttendanceRecord`] per roster entry for a single
//! session. A record's presence and its [`Provenance`] move together: a present
//! record always says how it became present, and an absent record never
//! carries provenance.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::roster::{RosterEntry, StudentId};

/// How a record came to be marked present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Not present.
    #[default]
    None,
    /// Picked up by a proximity scan.
    AutoDetected,
    /// Marked present by the instructor.
    ManuallyMarked,
    /// Marked present by accepting an attendance request.
    RequestApproved,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::AutoDetected => write!(f, "auto"),
            Self::ManuallyMarked => write!(f, "manual"),
            Self::RequestApproved => write!(f, "request"),
        }
    }
}

/// Attendance state of one student in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The roster entry this record belongs to.
    pub student_id: StudentId,
    /// Whether the student is present.
    pub present: bool,
    /// How the student became present.
    pub provenance: Provenance,
}

impl AttendanceRecord {
    /// An absent record.
    #[must_use]
    pub fn absent(student_id: StudentId) -> Self {
        Self {
            student_id,
            present: false,
            provenance: Provenance::None,
        }
    }

    /// A present record with the given provenance.
    ///
    /// `Provenance::None` is upgraded to `ManuallyMarked`.
    #[must_use]
    pub fn present(student_id: StudentId, provenance: Provenance) -> Self {
        let provenance = match provenance {
            Provenance::None => Provenance::ManuallyMarked,
            other => other,
        };
        Self {
            student_id,
            present: true,
            provenance,
        }
    }

    /// Restore the presence/provenance invariant on a record read from storage.
    fn normalized(self) -> Self {
        if self.present {
            Self::present(self.student_id, self.provenance)
        } else {
            Self::absent(self.student_id)
        }
    }
}

/// Presence predicate for [`AttendanceLedger::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceFilter {
    /// Every record.
    #[default]
    All,
    /// Present records only.
    Present,
    /// Absent records only.
    Absent,
}

impl PresenceFilter {
    fn accepts(self, record: &AttendanceRecord) -> bool {
        match self {
            Self::All => true,
            Self::Present => record.present,
            Self::Absent => !record.present,
        }
    }
}

/// Aggregate counts over a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttendanceStats {
    /// Present records.
    pub present: usize,
    /// All records.
    pub total: usize,
    /// `present / total` as a percentage, rounded half up. Zero for an empty ledger.
    pub percentage: u32,
    /// Present records that were auto-detected.
    pub auto_detected: usize,
    /// Present records that were not auto-detected.
    pub manually_marked: usize,
    /// Present records that came from an accepted request.
    pub request_approved: usize,
}

/// A roster entry paired with its record, as returned by [`AttendanceLedger::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRow<'a> {
    /// The student.
    pub student: &'a RosterEntry,
    /// Their attendance.
    pub record: &'a AttendanceRecord,
}

/// One record per roster entry for a session, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceLedger {
    roster: Vec<RosterEntry>,
    records: Vec<AttendanceRecord>,
    /// Set by [`clear_auto_detected`](Self::clear_auto_detected); the next
    /// scan is merged in instead of being ignored.
    #[serde(default)]
    awaiting_rescan: bool,
}

impl AttendanceLedger {
    /// A ledger with every student absent.
    #[must_use]
    pub fn new(roster: Vec<RosterEntry>) -> Self {
        let records = roster.iter().map(|s| AttendanceRecord::absent(s.id)).collect();
        Self {
            roster,
            records,
            awaiting_rescan: false,
        }
    }

    /// A ledger seeded from the ids a completed scan detected.
    ///
    /// Exactly those students are present with `AutoDetected` provenance; ids
    /// not on the roster are ignored.
    #[must_use]
    pub fn seeded(roster: Vec<RosterEntry>, detected: &[StudentId]) -> Self {
        let detected: HashSet<StudentId> = detected.iter().copied().collect();
        let records = roster
            .iter()
            .map(|s| {
                if detected.contains(&s.id) {
                    AttendanceRecord::present(s.id, Provenance::AutoDetected)
                } else {
                    AttendanceRecord::absent(s.id)
                }
            })
            .collect();
        debug!(
            students = roster.len(),
            detected = detected.len(),
            "Seeded attendance ledger"
        );
        Self {
            roster,
            records,
            awaiting_rescan: false,
        }
    }

    /// Rebuild a ledger from persisted parts.
    ///
    /// Records without a roster entry are dropped, roster entries without a
    /// record become absent, and every record is normalized so presence and
    /// provenance agree.
    #[must_use]
    pub fn from_parts(roster: Vec<RosterEntry>, records: &[AttendanceRecord]) -> Self {
        let records = roster
            .iter()
            .map(|s| {
                records
                    .iter()
                    .find(|r| r.student_id == s.id)
                    .map_or_else(|| AttendanceRecord::absent(s.id), |r| r.normalized())
            })
            .collect();
        Self {
            roster,
            records,
            awaiting_rescan: false,
        }
    }

    /// Re-apply [`from_parts`](Self::from_parts) to a ledger that came out of storage.
    #[must_use]
    pub fn normalized(self) -> Self {
        let awaiting_rescan = self.awaiting_rescan;
        Self {
            awaiting_rescan,
            ..Self::from_parts(self.roster, &self.records)
        }
    }

    /// Check if the ledger was prepared for another scan that has not been
    /// merged yet.
    #[must_use]
    pub fn awaiting_rescan(&self) -> bool {
        self.awaiting_rescan
    }

    /// The roster this ledger covers.
    #[must_use]
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// All records in roster order.
    #[must_use]
    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the record for a student.
    #[must_use]
    pub fn get(&self, id: StudentId) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.student_id == id)
    }

    /// Get the roster entry for a student.
    #[must_use]
    pub fn student(&self, id: StudentId) -> Option<&RosterEntry> {
        self.roster.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: StudentId) -> Option<&mut AttendanceRecord> {
        self.records.iter_mut().find(|r| r.student_id == id)
    }

    /// Mark a student present or absent by hand.
    ///
    /// Marking absent always clears provenance. Marking an already-present
    /// student present keeps the existing provenance. Returns `false` if the
    /// student is not in the ledger.
    pub fn set_present(&mut self, id: StudentId, present: bool) -> bool {
        let Some(record) = self.get_mut(id) else {
            trace!(student_id = id, "set_present on unknown student ignored");
            return false;
        };
        *record = match (present, record.present) {
            (false, _) => AttendanceRecord::absent(id),
            (true, true) => *record,
            (true, false) => AttendanceRecord::present(id, Provenance::ManuallyMarked),
        };
        debug!(student_id = id, present, "Attendance updated");
        true
    }

    /// Flip a student's presence. Returns the new presence, or `None` if unknown.
    pub fn toggle(&mut self, id: StudentId) -> Option<bool> {
        let present = !self.get(id)?.present;
        self.set_present(id, present);
        Some(present)
    }

    /// Mark a student present because their request was accepted.
    ///
    /// Returns `false` if the student is not in the ledger.
    pub fn approve(&mut self, id: StudentId) -> bool {
        let Some(record) = self.get_mut(id) else {
            return false;
        };
        *record = AttendanceRecord::present(id, Provenance::RequestApproved);
        true
    }

    /// Mark every student present.
    ///
    /// Students already present keep their provenance; the rest become
    /// manually marked.
    pub fn mark_all_present(&mut self) {
        for record in &mut self.records {
            if !record.present {
                *record = AttendanceRecord::present(record.student_id, Provenance::ManuallyMarked);
            }
        }
        debug!(total = self.records.len(), "All students marked present");
    }

    /// Mark every student absent, clearing all provenance.
    pub fn mark_all_absent(&mut self) {
        for record in &mut self.records {
            *record = AttendanceRecord::absent(record.student_id);
        }
        debug!(total = self.records.len(), "All students marked absent");
    }

    /// Drop auto-detected provenance ahead of a rescan.
    ///
    /// Affected students stay present and count as manually marked. The
    /// ledger then accepts one [`merge_detected`](Self::merge_detected).
    /// Returns the number of records changed.
    pub fn clear_auto_detected(&mut self) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            if record.provenance == Provenance::AutoDetected {
                record.provenance = Provenance::ManuallyMarked;
                changed += 1;
            }
        }
        self.awaiting_rescan = true;
        changed
    }

    /// Fold a rescan into the ledger.
    ///
    /// Detected students who are absent become present as `AutoDetected`.
    /// Present records are left alone whatever their provenance. Does nothing
    /// unless the ledger is [`awaiting_rescan`](Self::awaiting_rescan).
    /// Returns the number of students added.
    pub fn merge_detected(&mut self, detected: &[StudentId]) -> usize {
        if !self.awaiting_rescan {
            return 0;
        }
        let detected: HashSet<StudentId> = detected.iter().copied().collect();
        let mut added = 0;
        for record in &mut self.records {
            if !record.present && detected.contains(&record.student_id) {
                *record = AttendanceRecord::present(record.student_id, Provenance::AutoDetected);
                added += 1;
            }
        }
        self.awaiting_rescan = false;
        debug!(added, "Rescan merged into ledger");
        added
    }

    /// Filter rows by free text (name or roll code, case-insensitive) and presence.
    #[must_use]
    pub fn query(&self, search: &str, filter: PresenceFilter) -> Vec<LedgerRow<'_>> {
        let needle = search.trim().to_lowercase();
        self.roster
            .iter()
            .zip(&self.records)
            .filter(|(student, record)| filter.accepts(record) && student.matches_lowercase(&needle))
            .map(|(student, record)| LedgerRow { student, record })
            .collect()
    }

    /// Aggregate counts.
    #[must_use]
    pub fn stats(&self) -> AttendanceStats {
        let total = self.records.len();
        let present = self.records.iter().filter(|r| r.present).count();
        let count = |p: Provenance| self.records.iter().filter(|r| r.provenance == p).count();
        let auto_detected = count(Provenance::AutoDetected);

        AttendanceStats {
            present,
            total,
            percentage: rounded_percentage(present, total),
            auto_detected,
            manually_marked: present - auto_detected,
            request_approved: count(Provenance::RequestApproved),
        }
    }
}

/// `part / whole * 100`, rounded half up.
fn rounded_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = (part * 200 + whole) / (whole * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}
