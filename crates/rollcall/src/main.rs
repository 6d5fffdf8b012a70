//! `rollcall` - CLI for taking attendance

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use clap::Parser;

use rollcall::attendance::PresenceFilter;
use rollcall::auth::Authenticator;
use rollcall::cli::{
    AttendanceCommand, Cli, Command, ConfigCommand, LecturesCommand, OutputFormat,
    RequestsCommand, ScanCommand, SessionArgs,
};
use rollcall::fixtures;
use rollcall::gate::INVALID_CODE_MESSAGE;
use rollcall::handoff::{self, ScanHandoff};
use rollcall::register::{LedgerOrigin, Register};
use rollcall::scan::ScanEvent;
use rollcall::{autoscan, init_logging, Config, Error, SessionScope, SqliteStore, StudentId};

type CliResult = Result<(), Box<dyn std::error::Error>>;

const PROGRESS_WIDTH: u32 = 30;

fn main() -> CliResult {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    let command = match cli.command {
        Command::Config(cmd) => return handle_config(&config, cmd),
        other => other,
    };

    let store = SqliteStore::open(config.database_path())?;
    let now = Utc::now();
    let auth = Authenticator::new(&store, &config.auth.pin, config.session_ttl());
    if command.requires_login() {
        auth.require(now)?;
    }

    match command {
        Command::Login(cmd) => {
            let session = auth.login(&cmd.pin, now)?;
            println!(
                "Unlocked until {}.",
                session.expires_at.with_timezone(&chrono::Local).format("%H:%M")
            );
            Ok(())
        }
        Command::Logout => {
            if auth.logout()? {
                println!("Locked.");
            } else {
                println!("Not logged in.");
            }
            Ok(())
        }
        Command::Status(cmd) => handle_status(&config, &store, &auth, now, cmd.json),
        Command::Classes => {
            handle_classes(&store);
            Ok(())
        }
        Command::Lectures(cmd) => handle_lectures(&store, &cmd),
        Command::Scan(cmd) => handle_scan(&config, &store, &cmd),
        Command::Attendance(cmd) => handle_attendance(&store, cmd),
        Command::Requests(cmd) => handle_requests(&store, cmd),
        Command::Config(_) => unreachable!("handled before opening the store"),
    }
}

fn open_register<'a>(store: &'a SqliteStore, session: &SessionArgs) -> Result<Register<'a>, Error> {
    session.resolve()?;
    Ok(Register::open(
        store,
        session.scope(),
        fixtures::roster(),
        fixtures::pending_requests(),
        None,
    ))
}

fn handle_status(
    config: &Config,
    store: &SqliteStore,
    auth: &Authenticator<'_>,
    now: DateTime<Utc>,
    json: bool,
) -> CliResult {
    let session = auth.current(now);
    let classes: Vec<_> = fixtures::classes()
        .iter()
        .map(|c| (c, handoff::has_auto_scanned(store, SessionScope::class(c.id))))
        .collect();

    if json {
        let status = serde_json::json!({
            "logged_in": session.is_some(),
            "expires_at": session.as_ref().map(|s| s.expires_at),
            "database_path": config.database_path(),
            "classes": classes.iter().map(|(c, scanned)| serde_json::json!({
                "id": c.id,
                "code": c.code,
                "subject": c.subject,
                "auto_scanned": scanned,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("rollcall status");
    println!("---------------");
    match &session {
        Some(s) => println!(
            "Session:   unlocked ({} min left)",
            s.remaining(now).num_minutes()
        ),
        None => println!("Session:   locked"),
    }
    println!("Database:  {}", config.database_path().display());
    println!();
    for (class, scanned) in classes {
        println!(
            "  {:<6} {:<30} {}",
            class.code,
            class.subject,
            if scanned { "scanned" } else { "-" }
        );
    }
    Ok(())
}

fn handle_classes(store: &SqliteStore) {
    for class in fixtures::classes() {
        let scanned = handoff::has_auto_scanned(store, SessionScope::class(class.id));
        println!(
            "{:>3}  {:<6} {:<30} {:<6} {:<7}{}",
            class.id,
            class.code,
            class.subject,
            class.group,
            class.room,
            if scanned { "  [scanned]" } else { "" }
        );
    }
}

fn handle_lectures(store: &SqliteStore, cmd: &LecturesCommand) -> CliResult {
    let date = cmd.day(Local::now().date_naive());
    let lectures: Vec<_> = fixtures::lectures_on(date)
        .into_iter()
        .map(|l| (l, handoff::has_auto_scanned(store, SessionScope::lecture(l.id, date))))
        .collect();

    if cmd.json {
        let out: Vec<_> = lectures
            .iter()
            .map(|(l, scanned)| {
                serde_json::json!({
                    "id": l.id,
                    "subject": l.subject,
                    "group": l.group,
                    "room": l.room,
                    "start": l.start().format("%H:%M").to_string(),
                    "end": l.end().format("%H:%M").to_string(),
                    "auto_scanned": scanned,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} ({})", date, date.format("%A"));
    if lectures.is_empty() {
        println!("No lectures.");
    }
    for (lecture, scanned) in lectures {
        println!(
            "{:>3}  {}-{}  {:<12} {:<8} {:<9}{}",
            lecture.id,
            lecture.start().format("%H:%M"),
            lecture.end().format("%H:%M"),
            lecture.subject,
            lecture.group,
            lecture.room,
            if scanned { "  [scanned]" } else { "" }
        );
    }
    Ok(())
}

/// Number of filled bar cells for a 0 to 100 progress value.
fn progress_cells(progress: f64) -> usize {
    let cells = (progress.clamp(0.0, 100.0) / 100.0 * f64::from(PROGRESS_WIDTH)).round();
    (0..=PROGRESS_WIDTH)
        .rev()
        .find(|&n| f64::from(n) <= cells)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

fn print_event(event: &ScanEvent) {
    let width = usize::try_from(PROGRESS_WIDTH).unwrap_or_default();
    match event {
        ScanEvent::Progress { progress, .. } => {
            let filled = progress_cells(*progress);
            print!(
                "\r[{}{}] {:>3.0}%",
                "#".repeat(filled),
                " ".repeat(width.saturating_sub(filled)),
                progress
            );
        }
        ScanEvent::Detected(student) => {
            print!("\r{:<pad$}\r", "", pad = width + 8);
            println!("  found {} ({})", student.name, student.roll_no);
        }
        ScanEvent::Completed(_) | ScanEvent::Cancelled(_) => println!(),
    }
    let _ = std::io::stdout().flush();
}

fn handle_scan(config: &Config, store: &SqliteStore, cmd: &ScanCommand) -> CliResult {
    let session = cmd.session.resolve()?;
    let scope = cmd.session.scope();
    let roster = fixtures::roster();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(async {
        let scan = autoscan::run(
            config,
            &roster,
            &cmd.code,
            autoscan::strategy_for(config),
            print_event,
        );
        tokio::select! {
            result = scan => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    let summary = match outcome {
        None => {
            println!();
            println!("Scan cancelled; nothing recorded.");
            return Ok(());
        }
        Some(Err(Error::InvalidSessionCode)) => {
            eprintln!("{INVALID_CODE_MESSAGE}");
            std::process::exit(1);
        }
        Some(result) => result?,
    };

    println!(
        "{} ({}): detected {} of {} students with registered devices.",
        session.subject(),
        scope,
        summary.detected.len(),
        summary.roster_size
    );

    let handoff = ScanHandoff::from_summary(&summary);
    handoff.record(store, scope)?;
    if cmd.no_continue {
        return Ok(());
    }

    let register = Register::open(
        store,
        scope,
        roster,
        fixtures::pending_requests(),
        Some(&handoff),
    );
    match register.origin() {
        LedgerOrigin::Merged { added } => {
            println!("Added {added} newly detected students; earlier marks kept.");
        }
        LedgerOrigin::Restored => println!(
            "This session already has a register; run `rollcall attendance rescan` before scanning to merge new detections."
        ),
        LedgerOrigin::Seeded => {}
    }
    println!();
    print_register(&register, "", PresenceFilter::All, OutputFormat::Table)
}

fn print_register(
    register: &Register<'_>,
    search: &str,
    filter: PresenceFilter,
    format: OutputFormat,
) -> CliResult {
    let rows = register.query(search, filter);
    let stats = register.stats();

    match format {
        OutputFormat::Json => {
            let students: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.student.id,
                        "name": row.student.name,
                        "roll_no": row.student.roll_no,
                        "previous_attendance": row.student.previous_attendance,
                        "present": row.record.present,
                        "provenance": row.record.provenance,
                    })
                })
                .collect();
            let out = serde_json::json!({
                "scope": register.scope().to_string(),
                "stats": stats,
                "students": students,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }
        OutputFormat::Table => {
            println!(
                "{:>3}  {:<7} {:<18} {:>5}  {:<7}  {}",
                "ID", "ROLL", "NAME", "PREV", "PRESENT", "SOURCE"
            );
            for row in &rows {
                println!(
                    "{:>3}  {:<7} {:<18} {:>4}%  {:<7}  {}",
                    row.student.id,
                    row.student.roll_no,
                    row.student.name,
                    row.student.previous_attendance,
                    if row.record.present { "yes" } else { "no" },
                    row.record.provenance
                );
            }
        }
        OutputFormat::Plain => {
            for row in &rows {
                println!(
                    "{} {} {}",
                    row.student.roll_no,
                    row.student.name,
                    if row.record.present { "present" } else { "absent" }
                );
            }
        }
    }

    println!();
    println!(
        "Present {}/{} ({}%)  auto {}  manual {}  request {}",
        stats.present,
        stats.total,
        stats.percentage,
        stats.auto_detected,
        stats.manually_marked,
        stats.request_approved
    );
    Ok(())
}

fn print_summary(register: &Register<'_>) {
    let stats = register.stats();
    println!(
        "{}: {}/{} present ({}%)",
        register.scope(),
        stats.present,
        stats.total,
        stats.percentage
    );
}

fn set_presence(register: &mut Register<'_>, ids: &[StudentId], present: bool) {
    for &id in ids {
        if !register.set_present(id, present) {
            println!("{id}: not on the roster");
        }
    }
}

fn handle_attendance(store: &SqliteStore, cmd: AttendanceCommand) -> CliResult {
    match cmd {
        AttendanceCommand::Show {
            session,
            search,
            filter,
            format,
        } => {
            let register = open_register(store, &session)?;
            print_register(&register, &search, filter.into(), format)?;
        }
        AttendanceCommand::Mark { session, ids } => {
            let mut register = open_register(store, &session)?;
            set_presence(&mut register, &ids, true);
            print_summary(&register);
        }
        AttendanceCommand::Unmark { session, ids } => {
            let mut register = open_register(store, &session)?;
            set_presence(&mut register, &ids, false);
            print_summary(&register);
        }
        AttendanceCommand::Toggle { session, ids } => {
            let mut register = open_register(store, &session)?;
            for id in ids {
                match register.toggle(id) {
                    Some(true) => println!("{id}: present"),
                    Some(false) => println!("{id}: absent"),
                    None => println!("{id}: not on the roster"),
                }
            }
            print_summary(&register);
        }
        AttendanceCommand::AllPresent { session } => {
            let mut register = open_register(store, &session)?;
            register.mark_all_present();
            print_summary(&register);
        }
        AttendanceCommand::AllAbsent { session } => {
            let mut register = open_register(store, &session)?;
            register.mark_all_absent();
            print_summary(&register);
        }
        AttendanceCommand::Rescan { session } => {
            let mut register = open_register(store, &session)?;
            let converted = register.prepare_rescan();
            println!("{converted} auto-detected students kept as manual marks.");
            println!("Run `rollcall scan` again; new detections are added to absent students only.");
        }
        AttendanceCommand::Reset { session } => {
            session.resolve()?;
            let removed = Register::reset(store, session.scope())?;
            println!("Cleared {removed} stored values for {}.", session.scope());
        }
    }
    Ok(())
}

fn handle_requests(store: &SqliteStore, cmd: RequestsCommand) -> CliResult {
    match cmd {
        RequestsCommand::List { session, format } => {
            let register = open_register(store, &session)?;
            let pending = register.requests().pending();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(pending)?),
                OutputFormat::Table | OutputFormat::Plain => {
                    if pending.is_empty() {
                        println!("No pending requests.");
                    }
                    for request in pending {
                        println!(
                            "{:>4}  {:<7} {:<18} {:<8}  {}",
                            request.id,
                            request.roll_no,
                            request.name,
                            fixtures::format_time(request.submitted_at),
                            request.reason
                        );
                    }
                }
            }
        }
        RequestsCommand::Accept { session, id } => {
            let mut register = open_register(store, &session)?;
            match register.accept(id) {
                Some(request) => println!("Accepted: {} marked present.", request.name),
                None => println!("No pending request {id}."),
            }
        }
        RequestsCommand::Reject { session, id } => {
            let mut register = open_register(store, &session)?;
            match register.reject(id) {
                Some(request) => println!("Rejected request from {}.", request.name),
                None => println!("No pending request {id}."),
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut value = serde_json::to_value(config)?;
                value["auth"]["pin"] = "****".into();
                value["gate"]["session_code"] = "******".into();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Scan]");
                println!("  Duration (ms):      {}", config.scan.duration_ms);
                println!("  Tick interval (ms): {}", config.scan.tick_interval_ms);
                match config.scan.seed {
                    Some(seed) => println!("  Seed:               {seed}"),
                    None => println!("  Seed:               random"),
                }
                println!();
                println!("[Auth]");
                println!("  PIN:                ****");
                println!("  Session (minutes):  {}", config.auth.session_ttl_minutes);
                println!();
                println!("[Gate]");
                println!("  Session code:       ******");
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_cells() {
        assert_eq!(progress_cells(0.0), 0);
        assert_eq!(progress_cells(50.0), 15);
        assert_eq!(progress_cells(51.0), 15);
        assert_eq!(progress_cells(52.0), 16);
        assert_eq!(progress_cells(100.0), 30);
        assert_eq!(progress_cells(140.0), 30);
        assert_eq!(progress_cells(-5.0), 0);
    }
}
