//! Command-line interface for rollcall.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AttendanceCommand, ConfigCommand, FilterArg, LecturesCommand, LoginCommand, OutputFormat,
    RequestsCommand, ScanCommand, SessionArgs, StatusCommand,
};

use crate::logging::Verbosity;

/// rollcall - Take attendance with a proximity scan
///
/// Unlock with your PIN, run a scan behind the session code, then review the
/// register and resolve attendance requests.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Unlock with your PIN
    Login(LoginCommand),

    /// Lock again
    Logout,

    /// Show login state and scanned classes
    Status(StatusCommand),

    /// List classes
    Classes,

    /// List the lectures held on a date
    #[command(visible_alias = "timetable")]
    Lectures(LecturesCommand),

    /// Run an automatic scan
    Scan(ScanCommand),

    /// Review and edit the register
    #[command(subcommand)]
    Attendance(AttendanceCommand),

    /// Resolve attendance requests
    #[command(subcommand)]
    Requests(RequestsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Check if the command needs a valid login.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Scan(_) | Self::Attendance(_) | Self::Requests(_)
        )
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SessionScope;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "rollcall");
    }

    #[test]
    fn test_parse_login() {
        let cli = parse(&["rollcall", "login", "1234"]);
        match cli.command {
            Command::Login(cmd) => assert_eq!(cmd.pin, "1234"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_scan() {
        let cli = parse(&["rollcall", "scan", "--class", "2", "--code", "123456"]);
        let Command::Scan(cmd) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(cmd.code, "123456");
        assert!(!cmd.no_continue);
        assert_eq!(cmd.session.scope(), SessionScope::class(2));
    }

    #[test]
    fn test_parse_lecture_session() {
        let cli = parse(&[
            "rollcall", "scan", "--lecture", "3", "--date", "2024-03-12", "--code", "123456",
        ]);
        let Command::Scan(cmd) = cli.command else {
            panic!("expected scan");
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        assert_eq!(cmd.session.scope(), SessionScope::lecture(3, date));
        assert_eq!(cmd.session.resolve().unwrap().subject(), "Chemistry");
    }

    #[test]
    fn test_lecture_and_date_go_together() {
        for args in [
            &["rollcall", "attendance", "show", "--date", "2024-03-12"][..],
            &["rollcall", "attendance", "show", "--lecture", "3"][..],
            &[
                "rollcall", "attendance", "show", "--class", "2", "--lecture", "3", "--date",
                "2024-03-12",
            ][..],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_parse_lectures() {
        let cli = parse(&["rollcall", "lectures", "--date", "2024-03-11"]);
        let Command::Lectures(cmd) = cli.command else {
            panic!("expected lectures");
        };
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2024, 3, 11));
        assert!(!cmd.json);

        let cli = parse(&["rollcall", "timetable", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Lectures(LecturesCommand {
                date: None,
                json: true
            })
        ));
    }

    #[test]
    fn test_scan_requires_code() {
        assert!(Cli::try_parse_from(["rollcall", "scan"]).is_err());
    }

    #[test]
    fn test_parse_attendance_show() {
        let cli = parse(&[
            "rollcall", "attendance", "show", "--search", "wil", "--filter", "present",
        ]);
        match cli.command {
            Command::Attendance(AttendanceCommand::Show {
                session,
                search,
                filter,
                format,
            }) => {
                assert_eq!(session.scope(), SessionScope::class(1));
                assert_eq!(search, "wil");
                assert_eq!(filter, FilterArg::Present);
                assert_eq!(format, OutputFormat::Table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_mark_many() {
        let cli = parse(&["rollcall", "attendance", "mark", "3", "4", "9"]);
        match cli.command {
            Command::Attendance(AttendanceCommand::Mark { ids, .. }) => {
                assert_eq!(ids, vec![3, 4, 9]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["rollcall", "attendance", "mark"]).is_err());
    }

    #[test]
    fn test_parse_requests_accept() {
        let cli = parse(&["rollcall", "requests", "accept", "101", "--class", "3"]);
        match cli.command {
            Command::Requests(RequestsCommand::Accept { session, id }) => {
                assert_eq!(id, 101);
                assert_eq!(session.class_id, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_requires_login() {
        assert!(!parse(&["rollcall", "login", "1234"]).command.requires_login());
        assert!(!parse(&["rollcall", "status"]).command.requires_login());
        assert!(!parse(&["rollcall", "classes"]).command.requires_login());
        assert!(!parse(&["rollcall", "lectures"]).command.requires_login());
        assert!(!parse(&["rollcall", "config", "path"]).command.requires_login());
        assert!(parse(&["rollcall", "requests", "list"]).command.requires_login());
        assert!(parse(&["rollcall", "attendance", "reset"]).command.requires_login());
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&["rollcall", "-c", "/custom/config.toml", "-vv", "classes"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.verbosity(), Verbosity::Trace);

        let cli = parse(&["rollcall", "classes", "-q"]);
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }
}
