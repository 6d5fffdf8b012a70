//! Built-in class data.
//!
//! There is no backend; every class and lecture shares the same enrolled
//! roster and the same three pending attendance requests.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::error::{Error, Result};
use crate::requests::AttendanceRequest;
use crate::roster::RosterEntry;
use crate::storage::SessionScope;

/// Descriptive information about a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Class identifier.
    pub id: u32,
    /// Subject name.
    pub subject: &'static str,
    /// Course code.
    pub code: &'static str,
    /// Student group.
    pub group: &'static str,
    /// Lecture hall.
    pub room: &'static str,
}

const CLASSES: &[ClassInfo] = &[
    ClassInfo {
        id: 1,
        subject: "Data Structures & Algorithms",
        code: "CS201",
        group: "CS-2A",
        room: "LH-301",
    },
    ClassInfo {
        id: 2,
        subject: "Computer Networks",
        code: "CS302",
        group: "CS-3B",
        room: "LH-405",
    },
    ClassInfo {
        id: 3,
        subject: "Machine Learning",
        code: "CS405",
        group: "CS-4A",
        room: "LH-203",
    },
];

/// A weekly timetable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureInfo {
    /// Lecture identifier.
    pub id: u32,
    /// Subject name.
    pub subject: &'static str,
    /// Student group.
    pub group: &'static str,
    /// Room.
    pub room: &'static str,
    /// Day of the week the lecture is held.
    pub weekday: Weekday,
    start: (u32, u32),
    end: (u32, u32),
}

impl LectureInfo {
    /// Start time.
    #[must_use]
    pub fn start(&self) -> NaiveTime {
        hm(self.start)
    }

    /// End time.
    #[must_use]
    pub fn end(&self) -> NaiveTime {
        hm(self.end)
    }

    /// Check if the lecture takes place on `date`.
    #[must_use]
    pub fn is_held_on(&self, date: NaiveDate) -> bool {
        date.weekday() == self.weekday
    }
}

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

const LECTURES: &[LectureInfo] = &[
    LectureInfo {
        id: 1,
        subject: "Mathematics",
        group: "Group A",
        room: "Room 101",
        weekday: Weekday::Mon,
        start: (9, 0),
        end: (10, 30),
    },
    LectureInfo {
        id: 2,
        subject: "Physics",
        group: "Group B",
        room: "Room 102",
        weekday: Weekday::Mon,
        start: (11, 0),
        end: (12, 30),
    },
    LectureInfo {
        id: 3,
        subject: "Chemistry",
        group: "Group C",
        room: "Lab 201",
        weekday: Weekday::Tue,
        start: (9, 0),
        end: (10, 30),
    },
    LectureInfo {
        id: 4,
        subject: "Biology",
        group: "Group A",
        room: "Lab 202",
        weekday: Weekday::Wed,
        start: (13, 0),
        end: (14, 30),
    },
    LectureInfo {
        id: 5,
        subject: "English",
        group: "Group B",
        room: "Room 103",
        weekday: Weekday::Thu,
        start: (15, 0),
        end: (16, 30),
    },
    LectureInfo {
        id: 6,
        subject: "History",
        group: "Group C",
        room: "Room 104",
        weekday: Weekday::Fri,
        start: (9, 0),
        end: (10, 30),
    },
];

/// (name, previous attendance); ids and roll codes follow position.
const STUDENTS: &[(&str, u8)] = &[
    ("Alex Johnson", 95),
    ("Sarah Miller", 100),
    ("David Wilson", 87),
    ("Emily Brown", 92),
    ("Michael Davis", 78),
    ("Jessica Taylor", 100),
    ("Robert Anderson", 85),
    ("Jennifer Garcia", 88),
    ("Thomas Rodriguez", 90),
    ("Lisa Martinez", 97),
    ("William Clark", 83),
    ("Elizabeth Scott", 91),
    ("Daniel Lee", 76),
    ("Linda Anderson", 94),
    ("Charles Thomas", 82),
];

/// Students with a registered device.
const DEVICE_HOLDERS: u32 = 10;

/// All known classes.
#[must_use]
pub fn classes() -> &'static [ClassInfo] {
    CLASSES
}

/// Look up a class by id.
#[must_use]
pub fn class(id: u32) -> Option<&'static ClassInfo> {
    CLASSES.iter().find(|c| c.id == id)
}

/// The weekly timetable.
#[must_use]
pub fn lectures() -> &'static [LectureInfo] {
    LECTURES
}

/// Look up a lecture by id.
#[must_use]
pub fn lecture(id: u32) -> Option<&'static LectureInfo> {
    LECTURES.iter().find(|l| l.id == id)
}

/// Lectures held on `date`, earliest first.
#[must_use]
pub fn lectures_on(date: NaiveDate) -> Vec<&'static LectureInfo> {
    let mut held: Vec<_> = LECTURES.iter().filter(|l| l.is_held_on(date)).collect();
    held.sort_by_key(|l| l.start);
    held
}

/// What a session scope refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    /// A whole class.
    Class(&'static ClassInfo),
    /// One lecture on one date.
    Lecture(&'static LectureInfo, NaiveDate),
}

impl Session {
    /// Subject taught in the session.
    #[must_use]
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Class(class) => class.subject,
            Self::Lecture(lecture, _) => lecture.subject,
        }
    }

    /// Room the session is held in.
    #[must_use]
    pub fn room(&self) -> &'static str {
        match self {
            Self::Class(class) => class.room,
            Self::Lecture(lecture, _) => lecture.room,
        }
    }
}

/// Resolve `scope` against the built-in classes and timetable.
///
/// # Errors
///
/// Returns [`Error::UnknownClass`] or [`Error::UnknownLecture`] for ids that
/// do not exist, and [`Error::LectureNotScheduled`] when the lecture does not
/// take place on the scope's date.
pub fn resolve(scope: SessionScope) -> Result<Session> {
    match scope {
        SessionScope::Class { class_id } => class(class_id)
            .map(Session::Class)
            .ok_or(Error::UnknownClass(class_id)),
        SessionScope::Lecture { lecture_id, date } => {
            let lecture = lecture(lecture_id).ok_or(Error::UnknownLecture(lecture_id))?;
            if !lecture.is_held_on(date) {
                return Err(Error::LectureNotScheduled { lecture_id, date });
            }
            Ok(Session::Lecture(lecture, date))
        }
    }
}

/// The enrolled roster.
#[must_use]
pub fn roster() -> Vec<RosterEntry> {
    (1u32..)
        .zip(STUDENTS)
        .map(|(id, &(name, previous))| {
            let entry = RosterEntry::new(id, name, format!("CS{}", 2000 + id), previous);
            if id <= DEVICE_HOLDERS {
                entry.with_device(format!("BT-{id:03}"))
            } else {
                entry
            }
        })
        .collect()
}

/// Requests waiting when a session is first opened.
#[must_use]
pub fn pending_requests() -> Vec<AttendanceRequest> {
    let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
    vec![
        AttendanceRequest::new(101, 11, "William Clark", "CS2011", "Bluetooth not working", at(10, 5)),
        AttendanceRequest::new(102, 12, "Elizabeth Scott", "CS2012", "Device not detected", at(10, 8)),
        AttendanceRequest::new(103, 13, "Daniel Lee", "CS2013", "Late arrival (5 min)", at(9, 35)),
    ]
}

/// Format a submission time the way the request list shows it.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    format!(
        "{hour:02}:{:02} {}",
        time.minute(),
        if pm { "PM" } else { "AM" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_shape() {
        let roster = roster();
        assert_eq!(roster.len(), 15);
        assert_eq!(roster[0].id, 1);
        assert_eq!(roster[0].roll_no, "CS2001");
        assert_eq!(roster[14].roll_no, "CS2015");
        assert_eq!(roster[9].device_id.as_deref(), Some("BT-010"));
        assert!(roster[10].device_id.is_none());
    }

    #[test]
    fn test_roster_ids_unique() {
        let roster = roster();
        let mut ids: Vec<_> = roster.iter().map(|s| s.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), roster.len());
    }

    #[test]
    fn test_pending_requests_reference_roster() {
        let roster = roster();
        for request in pending_requests() {
            assert!(roster.iter().any(|s| s.id == request.student_id));
        }
    }

    #[test]
    fn test_class_lookup() {
        assert_eq!(class(1).map(|c| c.code), Some("CS201"));
        assert!(class(99).is_none());
        assert_eq!(classes().len(), 3);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lecture_lookup() {
        let physics = lecture(2).unwrap();
        assert_eq!(physics.subject, "Physics");
        assert_eq!(physics.start(), NaiveTime::from_hms_opt(11, 0, 0).unwrap());
        assert_eq!(physics.end(), NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert!(lecture(7).is_none());
        assert_eq!(lectures().len(), 6);
    }

    #[test]
    fn test_lectures_on_date() {
        // 2024-03-11 is a Monday.
        let monday: Vec<_> = lectures_on(date(2024, 3, 11)).iter().map(|l| l.id).collect();
        assert_eq!(monday, vec![1, 2]);
        let friday: Vec<_> = lectures_on(date(2024, 3, 15)).iter().map(|l| l.id).collect();
        assert_eq!(friday, vec![6]);
        assert!(lectures_on(date(2024, 3, 16)).is_empty());
    }

    #[test]
    fn test_resolve_class() {
        let session = resolve(SessionScope::class(2)).unwrap();
        assert_eq!(session.subject(), "Computer Networks");
        assert!(matches!(
            resolve(SessionScope::class(9)),
            Err(Error::UnknownClass(9))
        ));
    }

    #[test]
    fn test_resolve_lecture() {
        let session = resolve(SessionScope::lecture(3, date(2024, 3, 12))).unwrap();
        assert_eq!(session, Session::Lecture(lecture(3).unwrap(), date(2024, 3, 12)));
        assert_eq!(session.room(), "Lab 201");

        assert!(matches!(
            resolve(SessionScope::lecture(42, date(2024, 3, 12))),
            Err(Error::UnknownLecture(42))
        ));
        assert!(matches!(
            resolve(SessionScope::lecture(3, date(2024, 3, 13))),
            Err(Error::LectureNotScheduled { lecture_id: 3, .. })
        ));
    }

    #[test]
    fn test_format_time() {
        let t = NaiveTime::from_hms_opt(10, 5, 0).unwrap();
        assert_eq!(format_time(t), "10:05 AM");
        let t = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        assert_eq!(format_time(t), "02:30 PM");
    }
}
