//! CLI command definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::attendance::PresenceFilter;
use crate::fixtures::{self, Session};
use crate::requests::RequestId;
use crate::roster::StudentId;
use crate::storage::SessionScope;

/// Which session a command works on.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Class identifier
    #[arg(
        long = "class",
        value_name = "ID",
        default_value_t = 1,
        conflicts_with = "lecture"
    )]
    pub class_id: u32,

    /// Work on one timetable lecture instead of a class (see `rollcall lectures`)
    #[arg(long, value_name = "ID", requires = "date")]
    pub lecture: Option<u32>,

    /// Date of the lecture (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "lecture")]
    pub date: Option<NaiveDate>,
}

impl SessionArgs {
    /// The storage scope these arguments select.
    #[must_use]
    pub fn scope(&self) -> SessionScope {
        match (self.lecture, self.date) {
            (Some(lecture_id), Some(date)) => SessionScope::lecture(lecture_id, date),
            _ => SessionScope::class(self.class_id),
        }
    }

    /// Look the selected class or lecture up.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown class or lecture, or a lecture that is
    /// not held on the given date.
    pub fn resolve(&self) -> crate::Result<Session> {
        fixtures::resolve(self.scope())
    }
}

/// Timetable arguments.
#[derive(Debug, Args)]
pub struct LecturesCommand {
    /// Day to list (YYYY-MM-DD, defaults to today)
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl LecturesCommand {
    /// The requested day, or `today` when none was given.
    #[must_use]
    pub fn day(&self, today: NaiveDate) -> NaiveDate {
        self.date.unwrap_or(today)
    }
}

/// Login arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Four-digit PIN
    pub pin: String,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Automatic scan arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Session code shown to the class
    #[arg(long)]
    pub code: String,

    /// Record the scan but don't open the register afterwards
    #[arg(long)]
    pub no_continue: bool,
}

/// Attendance register commands.
#[derive(Debug, Subcommand)]
pub enum AttendanceCommand {
    /// Show the register
    Show {
        #[command(flatten)]
        session: SessionArgs,

        /// Only students whose name or roll number contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only present or absent students
        #[arg(short, long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Mark students present
    Mark {
        #[command(flatten)]
        session: SessionArgs,

        /// Student identifiers
        #[arg(required = true)]
        ids: Vec<StudentId>,
    },

    /// Mark students absent
    Unmark {
        #[command(flatten)]
        session: SessionArgs,

        /// Student identifiers
        #[arg(required = true)]
        ids: Vec<StudentId>,
    },

    /// Flip students between present and absent
    Toggle {
        #[command(flatten)]
        session: SessionArgs,

        /// Student identifiers
        #[arg(required = true)]
        ids: Vec<StudentId>,
    },

    /// Mark every student present
    AllPresent {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Mark every student absent
    AllAbsent {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Keep auto-detected students as manual marks before scanning again
    Rescan {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Forget everything stored for the session
    Reset {
        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Attendance request commands.
#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// List pending requests
    List {
        #[command(flatten)]
        session: SessionArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Accept a request and mark the student present
    Accept {
        #[command(flatten)]
        session: SessionArgs,

        /// Request identifier
        id: RequestId,
    },

    /// Reject a request
    Reject {
        #[command(flatten)]
        session: SessionArgs,

        /// Request identifier
        id: RequestId,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Presence filter argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FilterArg {
    /// Everyone
    #[default]
    All,
    /// Present students
    Present,
    /// Absent students
    Absent,
}

impl From<FilterArg> for PresenceFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => Self::All,
            FilterArg::Present => Self::Present,
            FilterArg::Absent => Self::Absent,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conversion() {
        assert_eq!(PresenceFilter::from(FilterArg::All), PresenceFilter::All);
        assert_eq!(
            PresenceFilter::from(FilterArg::Present),
            PresenceFilter::Present
        );
        assert_eq!(
            PresenceFilter::from(FilterArg::Absent),
            PresenceFilter::Absent
        );
    }

    #[test]
    fn test_session_scope() {
        let args = SessionArgs {
            class_id: 2,
            lecture: None,
            date: None,
        };
        assert_eq!(args.scope(), SessionScope::class(2));

        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let args = SessionArgs {
            class_id: 1,
            lecture: Some(6),
            date: Some(date),
        };
        assert_eq!(args.scope(), SessionScope::lecture(6, date));
    }

    #[test]
    fn test_session_resolve() {
        let friday = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let args = SessionArgs {
            class_id: 1,
            lecture: Some(6),
            date: Some(friday),
        };
        assert_eq!(args.resolve().unwrap().subject(), "History");

        let args = SessionArgs {
            class_id: 1,
            lecture: Some(99),
            date: Some(friday),
        };
        assert!(matches!(
            args.resolve(),
            Err(crate::Error::UnknownLecture(99))
        ));

        let args = SessionArgs {
            class_id: 1,
            lecture: Some(1),
            date: Some(friday),
        };
        assert!(matches!(
            args.resolve(),
            Err(crate::Error::LectureNotScheduled { lecture_id: 1, .. })
        ));

        let args = SessionArgs {
            class_id: 4,
            lecture: None,
            date: None,
        };
        assert!(matches!(args.resolve(), Err(crate::Error::UnknownClass(4))));
    }

    #[test]
    fn test_lectures_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let cmd = LecturesCommand {
            date: None,
            json: false,
        };
        assert_eq!(cmd.day(today), today);

        let other = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let cmd = LecturesCommand {
            date: Some(other),
            json: true,
        };
        assert_eq!(cmd.day(today), other);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }
}
