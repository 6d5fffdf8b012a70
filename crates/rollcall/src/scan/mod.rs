//! Simulated proximity scanning.
//!
//! A scan walks a fixed number of ticks. Every second tick one student who has
//! not been seen yet is "detected", chosen by a pluggable
//! [`DetectionStrategy`]. The scan completes when the tick budget runs out or
//! everyone has been detected, whichever happens first.
//!
//! [`ScanSimulator`] is the synchronous state machine. The timer that drives
//! it lives in [`monitor`].

pub mod monitor;

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, trace};

use crate::roster::{RosterEntry, StudentId};

pub use monitor::{
    DetectionMonitor, ScanController, ScanError, ScanEvent, ScanHandle, SimulatedMonitor,
};

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Not started.
    #[default]
    Idle,
    /// Ticking.
    Running,
    /// Finished normally.
    Complete,
    /// Stopped by the caller.
    Cancelled,
}

impl ScanStatus {
    /// Check if the scan has reached a terminal state.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Total scan length and tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTiming {
    /// Total scan duration.
    pub duration: Duration,
    /// Time between ticks.
    pub tick_interval: Duration,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(15_000),
            tick_interval: Duration::from_millis(500),
        }
    }
}

impl ScanTiming {
    /// Number of ticks in a full scan (at least one).
    #[must_use]
    pub fn total_ticks(&self) -> u32 {
        let interval = self.tick_interval.as_millis().max(1);
        let ticks = self.duration.as_millis() / interval;
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }
}

/// Chooses which undetected student a tick picks up.
pub trait DetectionStrategy: Send + fmt::Debug {
    /// Return an index into `candidates`, or `None` to detect nobody.
    ///
    /// `candidates` is never empty.
    fn select(&mut self, candidates: &[RosterEntry]) -> Option<usize>;
}

/// Uniform random selection.
#[derive(Debug)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    /// Seed from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic selection from a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DetectionStrategy for RandomStrategy {
    fn select(&mut self, candidates: &[RosterEntry]) -> Option<usize> {
        Some(self.rng.gen_range(0..candidates.len()))
    }
}

/// Detects students in a fixed order, then nobody.
///
/// Scripted ids that are not (or no longer) candidates are skipped.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStrategy {
    order: VecDeque<StudentId>,
}

impl ScriptedStrategy {
    /// Detect `order` one per detecting tick.
    #[must_use]
    pub fn new(order: impl IntoIterator<Item = StudentId>) -> Self {
        Self {
            order: order.into_iter().collect(),
        }
    }
}

impl DetectionStrategy for ScriptedStrategy {
    fn select(&mut self, candidates: &[RosterEntry]) -> Option<usize> {
        while let Some(id) = self.order.pop_front() {
            if let Some(index) = candidates.iter().position(|s| s.id == id) {
                return Some(index);
            }
        }
        None
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Tick number, starting at 1.
    pub tick: u32,
    /// Progress after this tick, 0 to 100.
    pub progress: f64,
    /// Student detected on this tick.
    pub detected: Option<RosterEntry>,
    /// Whether this tick finished the scan.
    pub completed: bool,
}

/// Result of a finished (or cancelled) scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    /// Final status.
    pub status: ScanStatus,
    /// Students detected, in detection order.
    pub detected: Vec<RosterEntry>,
    /// Ticks elapsed.
    pub ticks: u32,
    /// Tick budget.
    pub total_ticks: u32,
    /// Number of scannable students.
    pub roster_size: usize,
}

impl ScanSummary {
    /// Ids of detected students in detection order.
    #[must_use]
    pub fn detected_ids(&self) -> Vec<StudentId> {
        self.detected.iter().map(|s| s.id).collect()
    }
}

/// Tick-driven scan state machine.
#[derive(Debug)]
pub struct ScanSimulator {
    roster: Vec<RosterEntry>,
    total_ticks: u32,
    tick: u32,
    progress: f64,
    status: ScanStatus,
    detected: Vec<RosterEntry>,
    strategy: Box<dyn DetectionStrategy>,
}

impl ScanSimulator {
    /// Create an idle simulator over `roster`.
    #[must_use]
    pub fn new(
        roster: Vec<RosterEntry>,
        timing: ScanTiming,
        strategy: Box<dyn DetectionStrategy>,
    ) -> Self {
        Self {
            roster,
            total_ticks: timing.total_ticks(),
            tick: 0,
            progress: 0.0,
            status: ScanStatus::Idle,
            detected: Vec::new(),
            strategy,
        }
    }

    /// Begin a fresh scan, discarding any previous detections.
    pub fn start(&mut self) {
        self.tick = 0;
        self.progress = 0.0;
        self.detected.clear();
        self.status = ScanStatus::Running;
        debug!(
            roster = self.roster.len(),
            total_ticks = self.total_ticks,
            "Scan started"
        );
    }

    /// Stop the scan. Detections so far are kept; further ticks do nothing.
    pub fn cancel(&mut self) {
        if self.status == ScanStatus::Running {
            self.status = ScanStatus::Cancelled;
            debug!(tick = self.tick, "Scan cancelled");
        }
    }

    /// Advance one tick. Returns `None` unless the scan is running.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.status != ScanStatus::Running {
            return None;
        }

        self.tick += 1;
        self.progress = (f64::from(self.tick) / f64::from(self.total_ticks) * 100.0).min(100.0);

        let detected = if self.tick % 2 == 0 {
            self.detect_one()
        } else {
            None
        };

        let completed =
            self.tick >= self.total_ticks || self.detected.len() == self.roster.len();
        if completed {
            self.status = ScanStatus::Complete;
            self.progress = 100.0;
            debug!(
                tick = self.tick,
                detected = self.detected.len(),
                "Scan complete"
            );
        }

        trace!(tick = self.tick, progress = self.progress, "Scan tick");
        Some(TickOutcome {
            tick: self.tick,
            progress: self.progress,
            detected,
            completed,
        })
    }

    fn detect_one(&mut self) -> Option<RosterEntry> {
        let candidates: Vec<RosterEntry> = self
            .roster
            .iter()
            .filter(|s| !self.detected.iter().any(|d| d.id == s.id))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = self.strategy.select(&candidates)?;
        let student = candidates.get(index)?.clone();
        debug!(student_id = student.id, name = %student.name, "Student detected");
        self.detected.push(student.clone());
        Some(student)
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.status
    }

    /// Progress, 0 to 100.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Ticks elapsed in the current scan.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.tick
    }

    /// Tick budget.
    #[must_use]
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// Students detected so far, in order.
    #[must_use]
    pub fn detections(&self) -> &[RosterEntry] {
        &self.detected
    }

    /// Snapshot of the scan.
    #[must_use]
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            status: self.status,
            detected: self.detected.clone(),
            ticks: self.tick,
            total_ticks: self.total_ticks,
            roster_size: self.roster.len(),
        }
    }
}
