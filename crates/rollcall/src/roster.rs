//! Class roster types.
//!
//! A roster is the ordered list of students enrolled in a class. Entries are
//! immutable once issued; everything that changes during a session lives in
//! the attendance ledger instead.

use serde::{Deserialize, Serialize};

/// Unique identifier of a student within a roster.
pub type StudentId = u32;

/// A single enrolled student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Unique student identifier.
    pub id: StudentId,

    /// Display name.
    pub name: String,

    /// Stable roll code (e.g. `CS2001`).
    pub roll_no: String,

    /// Historical attendance percentage, 0 to 100.
    pub previous_attendance: u8,

    /// Identifier of the student's registered device, if any.
    ///
    /// Only students with a registered device can be picked up by a scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl RosterEntry {
    /// Create a roster entry without a registered device.
    #[must_use]
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        roll_no: impl Into<String>,
        previous_attendance: u8,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            roll_no: roll_no.into(),
            previous_attendance: previous_attendance.min(100),
            device_id: None,
        }
    }

    /// Attach a registered device to this entry.
    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Check if this student can be detected by a proximity scan.
    #[must_use]
    pub fn is_scannable(&self) -> bool {
        self.device_id.is_some()
    }

    /// Case-insensitive substring match against name or roll code.
    ///
    /// `needle` must already be lowercased. An empty needle matches everything.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.roll_no.to_lowercase().contains(needle)
    }
}

/// Return the scannable subset of a roster, preserving order.
#[must_use]
pub fn scannable(roster: &[RosterEntry]) -> Vec<RosterEntry> {
    roster.iter().filter(|s| s.is_scannable()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_percentage() {
        let entry = RosterEntry::new(1, "Alex Johnson", "CS2001", 140);
        assert_eq!(entry.previous_attendance, 100);
        assert!(!entry.is_scannable());
    }

    #[test]
    fn test_with_device() {
        let entry = RosterEntry::new(1, "Alex Johnson", "CS2001", 95).with_device("BT-001");
        assert!(entry.is_scannable());
        assert_eq!(entry.device_id.as_deref(), Some("BT-001"));
    }

    #[test]
    fn test_matches_name_and_roll() {
        let entry = RosterEntry::new(3, "David Wilson", "CS2003", 87);
        assert!(entry.matches_lowercase(""));
        assert!(entry.matches_lowercase("wil"));
        assert!(entry.matches_lowercase("cs2003"));
        assert!(!entry.matches_lowercase("alex"));
    }

    #[test]
    fn test_scannable_preserves_order() {
        let roster = vec![
            RosterEntry::new(1, "A", "R1", 90).with_device("BT-1"),
            RosterEntry::new(2, "B", "R2", 90),
            RosterEntry::new(3, "C", "R3", 90).with_device("BT-3"),
        ];
        let ids: Vec<_> = scannable(&roster).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_device_id_omitted_when_absent() {
        let entry = RosterEntry::new(2, "Sarah Miller", "CS2002", 100);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("device_id"));

        let back: RosterEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
