//! `rollcall` - attendance taking for instructors
//!
//! A PIN-locked register backed by a local key-value store. A simulated
//! proximity scan, opened with a per-session code, seeds the register; the
//! instructor then edits it by hand and resolves attendance requests.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod attendance;
pub mod auth;
pub mod autoscan;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod gate;
pub mod handoff;
pub mod logging;
pub mod register;
pub mod requests;
pub mod roster;
pub mod scan;
pub mod storage;

pub use attendance::{AttendanceLedger, AttendanceRecord, AttendanceStats, PresenceFilter, Provenance};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use register::Register;
pub use requests::{AttendanceRequest, RequestQueue};
pub use roster::{RosterEntry, StudentId};
pub use storage::{KvStore, MemoryStore, SessionScope, SqliteStore};
