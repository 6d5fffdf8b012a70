//! Typed storage keys.
//!
//! Every value the persistence bridge writes belongs to a session scope,
//! either a class or a single dated lecture of that class. Keys render as
//! `class_{id}_{kind}` or `lecture_{id}_{date}_{kind}`.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Key under which the login session is stored.
pub const AUTH_SESSION_KEY: &str = "auth_session";

/// What a set of stored values belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SessionScope {
    /// A class as a whole.
    Class {
        /// Class identifier.
        class_id: u32,
    },
    /// One lecture of a class on a given date.
    Lecture {
        /// Lecture identifier.
        lecture_id: u32,
        /// Lecture date.
        date: NaiveDate,
    },
}

impl SessionScope {
    /// Scope for a class.
    #[must_use]
    pub fn class(class_id: u32) -> Self {
        Self::Class { class_id }
    }

    /// Scope for a dated lecture.
    #[must_use]
    pub fn lecture(lecture_id: u32, date: NaiveDate) -> Self {
        Self::Lecture { lecture_id, date }
    }

    /// Key for one kind of value in this scope.
    #[must_use]
    pub fn key(self, kind: KeyKind) -> StorageKey {
        StorageKey { scope: self, kind }
    }

    /// Every key this scope can own.
    #[must_use]
    pub fn all_keys(self) -> [StorageKey; 4] {
        KeyKind::ALL.map(|kind| self.key(kind))
    }
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { class_id } => write!(f, "class_{class_id}"),
            Self::Lecture { lecture_id, date } => {
                write!(f, "lecture_{lecture_id}_{}", date.format("%Y-%m-%d"))
            }
        }
    }
}

/// Kind of value stored in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// The attendance ledger.
    Attendance,
    /// Ids detected by the last completed scan.
    ScannedStudents,
    /// Whether a scan has been completed for the scope.
    AutoScanned,
    /// Pending attendance requests.
    Requests,
}

impl KeyKind {
    /// All kinds.
    pub const ALL: [Self; 4] = [
        Self::Attendance,
        Self::ScannedStudents,
        Self::AutoScanned,
        Self::Requests,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::ScannedStudents => "scannedStudents",
            Self::AutoScanned => "autoScanned",
            Self::Requests => "requests",
        }
    }
}

/// A fully qualified key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKey {
    scope: SessionScope,
    kind: KeyKind,
}

impl StorageKey {
    /// The owning scope.
    #[must_use]
    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    /// The kind of value.
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.scope, self.kind.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_keys() {
        let scope = SessionScope::class(1);
        assert_eq!(
            scope.key(KeyKind::ScannedStudents).to_string(),
            "class_1_scannedStudents"
        );
        assert_eq!(
            scope.key(KeyKind::AutoScanned).to_string(),
            "class_1_autoScanned"
        );
        assert_eq!(
            scope.key(KeyKind::Attendance).to_string(),
            "class_1_attendance"
        );
    }

    #[test]
    fn test_lecture_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let key = SessionScope::lecture(7, date).key(KeyKind::AutoScanned);
        assert_eq!(key.to_string(), "lecture_7_2024-03-15_autoScanned");
        assert_eq!(key.kind(), KeyKind::AutoScanned);
    }

    #[test]
    fn test_scopes_do_not_collide() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let class = SessionScope::class(1).all_keys().map(|k| k.to_string());
        let lecture = SessionScope::lecture(1, date)
            .all_keys()
            .map(|k| k.to_string());
        let other = SessionScope::class(11).all_keys().map(|k| k.to_string());
        for key in &class {
            assert!(!lecture.contains(key));
            assert!(!other.contains(key));
        }
    }
}
