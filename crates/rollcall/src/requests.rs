//! Pending attendance requests.
//!
//! Students the scan missed can ask to be marked present. The instructor
//! accepts or rejects each request; both outcomes remove it from the queue.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::attendance::AttendanceLedger;
use crate::roster::StudentId;

/// Identifier of a request.
pub type RequestId = u32;

/// A student's request to be marked present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// The student asking.
    pub student_id: StudentId,
    /// Student display name.
    pub name: String,
    /// Student roll code.
    pub roll_no: String,
    /// Free-text reason.
    pub reason: String,
    /// When the request was submitted.
    pub submitted_at: NaiveTime,
}

impl AttendanceRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(
        id: RequestId,
        student_id: StudentId,
        name: impl Into<String>,
        roll_no: impl Into<String>,
        reason: impl Into<String>,
        submitted_at: NaiveTime,
    ) -> Self {
        Self {
            id,
            student_id,
            name: name.into(),
            roll_no: roll_no.into(),
            reason: reason.into(),
            submitted_at,
        }
    }
}

/// Insertion-ordered queue of pending requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestQueue {
    pending: Vec<AttendanceRequest>,
}

impl RequestQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request. A request whose id is already queued is ignored.
    pub fn push(&mut self, request: AttendanceRequest) {
        if self.get(request.id).is_some() {
            trace!(request_id = request.id, "Duplicate request ignored");
            return;
        }
        self.pending.push(request);
    }

    /// Pending requests in insertion order.
    #[must_use]
    pub fn pending(&self) -> &[AttendanceRequest] {
        &self.pending
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Look up a pending request.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&AttendanceRequest> {
        self.pending.iter().find(|r| r.id == id)
    }

    fn take(&mut self, id: RequestId) -> Option<AttendanceRequest> {
        let index = self.pending.iter().position(|r| r.id == id)?;
        Some(self.pending.remove(index))
    }

    /// Accept a request, marking its student present in `ledger`.
    ///
    /// Unknown ids are a silent no-op and return `None`. If the student is not
    /// on the ledger's roster the request is still consumed.
    pub fn accept(
        &mut self,
        id: RequestId,
        ledger: &mut AttendanceLedger,
    ) -> Option<AttendanceRequest> {
        let request = self.take(id)?;
        if ledger.approve(request.student_id) {
            debug!(request_id = id, student_id = request.student_id, "Request accepted");
        } else {
            debug!(
                request_id = id,
                student_id = request.student_id,
                "Request accepted for a student not on the roster"
            );
        }
        Some(request)
    }

    /// Reject a request without touching attendance.
    ///
    /// Unknown ids are a silent no-op and return `None`.
    pub fn reject(&mut self, id: RequestId) -> Option<AttendanceRequest> {
        let request = self.take(id)?;
        debug!(request_id = id, student_id = request.student_id, "Request rejected");
        Some(request)
    }
}

impl FromIterator<AttendanceRequest> for RequestQueue {
    fn from_iter<I: IntoIterator<Item = AttendanceRequest>>(iter: I) -> Self {
        let mut queue = Self::new();
        for request in iter {
            queue.push(request);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::{AttendanceRecord, Provenance};
    use crate::roster::RosterEntry;

    fn ledger() -> AttendanceLedger {
        let roster = (1..=15)
            .map(|id| RosterEntry::new(id, format!("Student {id}"), format!("CS{}", 2000 + id), 80))
            .collect();
        AttendanceLedger::new(roster)
    }

    fn request(id: RequestId, student_id: StudentId) -> AttendanceRequest {
        AttendanceRequest::new(
            id,
            student_id,
            "William Clark",
            "CS2011",
            "Bluetooth not working",
            NaiveTime::from_hms_opt(10, 5, 0).unwrap(),
        )
    }

    #[test]
    fn test_accept_marks_request_approved() {
        let mut ledger = ledger();
        let mut queue: RequestQueue = [request(101, 11), request(102, 12)].into_iter().collect();

        let accepted = queue.accept(101, &mut ledger);
        assert_eq!(accepted.map(|r| r.student_id), Some(11));
        assert_eq!(queue.len(), 1);
        assert!(queue.get(101).is_none());
        assert_eq!(
            ledger.get(11),
            Some(&AttendanceRecord::present(11, Provenance::RequestApproved))
        );
    }

    #[test]
    fn test_reject_leaves_ledger() {
        let mut ledger = ledger();
        let before = ledger.clone();
        let mut queue: RequestQueue = [request(101, 11)].into_iter().collect();

        assert!(queue.reject(101).is_some());
        assert!(queue.is_empty());
        assert_eq!(ledger, before);
        assert!(queue.accept(101, &mut ledger).is_none());
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut ledger = ledger();
        let ledger_before = ledger.clone();
        let mut queue: RequestQueue = [request(101, 11)].into_iter().collect();
        let queue_before = queue.clone();

        assert!(queue.accept(999, &mut ledger).is_none());
        assert!(queue.reject(999).is_none());
        assert_eq!(queue, queue_before);
        assert_eq!(ledger, ledger_before);
    }

    #[test]
    fn test_accept_student_not_on_roster() {
        let mut ledger = ledger();
        let before = ledger.clone();
        let mut queue: RequestQueue = [request(104, 100)].into_iter().collect();

        assert!(queue.accept(104, &mut ledger).is_some());
        assert!(queue.is_empty());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_insertion_order_and_duplicates() {
        let queue: RequestQueue = [request(103, 13), request(101, 11), request(103, 12)]
            .into_iter()
            .collect();
        let ids: Vec<_> = queue.pending().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![103, 101]);
    }

    #[test]
    fn test_serializes_as_array() {
        let queue: RequestQueue = [request(101, 11)].into_iter().collect();
        let json = serde_json::to_string(&queue).unwrap();
        assert!(json.starts_with('['));
        let back: RequestQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, queue);
    }
}
