//! Timer-driven scan execution.
//!
//! A [`DetectionMonitor`] drives a scan on a tokio interval and reports
//! [`ScanEvent`]s through a channel. [`ScanController`] owns at most one
//! running scan at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::{ScanSimulator, ScanStatus, ScanSummary, ScanTiming};
use crate::roster::RosterEntry;

/// Errors that can occur while running a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already running on this monitor.
    #[error("scan already running")]
    AlreadyRunning,

    /// No scan is running.
    #[error("no scan running")]
    NotRunning,

    /// The scan was cancelled before it finished.
    #[error("scan cancelled")]
    Cancelled,

    /// The scan task failed.
    #[error("scan task failed: {0}")]
    TaskFailed(String),
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Something observable that happened during a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A tick elapsed.
    Progress {
        /// Tick number, starting at 1.
        tick: u32,
        /// Progress, 0 to 100.
        progress: f64,
    },

    /// A student was detected.
    Detected(RosterEntry),

    /// The scan finished.
    Completed(ScanSummary),

    /// The scan was stopped early.
    Cancelled(ScanSummary),
}

/// A source of scan detections that runs on a timer.
#[async_trait::async_trait]
pub trait DetectionMonitor: Send {
    /// Check if a scan is in progress.
    fn is_running(&self) -> bool;

    /// Get a handle that can stop the scan from another task.
    fn stop_handle(&self) -> ScanHandle;

    /// Run a scan to completion, sending events through `tx`.
    ///
    /// Returns when the scan completes, is stopped, or the receiver is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AlreadyRunning`] if a scan is in progress.
    async fn start(&mut self, tx: mpsc::Sender<ScanEvent>) -> Result<ScanSummary>;
}

/// Stops a running scan.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    running: Arc<AtomicBool>,
}

impl ScanHandle {
    /// Signal the scan to stop. It does not tick again.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the scan is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Drives a [`ScanSimulator`] from a tokio interval.
#[derive(Debug)]
pub struct SimulatedMonitor {
    simulator: ScanSimulator,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
}

impl SimulatedMonitor {
    /// Create a monitor for `simulator`, ticking every `timing.tick_interval`.
    #[must_use]
    pub fn new(simulator: ScanSimulator, timing: ScanTiming) -> Self {
        Self {
            simulator,
            tick_interval: timing.tick_interval.max(Duration::from_millis(1)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The underlying simulator.
    #[must_use]
    pub fn simulator(&self) -> &ScanSimulator {
        &self.simulator
    }
}

#[async_trait::async_trait]
impl DetectionMonitor for SimulatedMonitor {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop_handle(&self) -> ScanHandle {
        ScanHandle {
            running: Arc::clone(&self.running),
        }
    }

    async fn start(&mut self, tx: mpsc::Sender<ScanEvent>) -> Result<ScanSummary> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyRunning);
        }

        debug!(
            interval_ms = self.tick_interval.as_millis(),
            total_ticks = self.simulator.total_ticks(),
            "Starting scan monitor"
        );

        self.simulator.start();
        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if !self.running.load(Ordering::SeqCst) {
                self.simulator.cancel();
                break;
            }

            let Some(outcome) = self.simulator.tick() else {
                break;
            };

            let mut events = Vec::with_capacity(2);
            events.push(ScanEvent::Progress {
                tick: outcome.tick,
                progress: outcome.progress,
            });
            if let Some(student) = outcome.detected {
                events.push(ScanEvent::Detected(student));
            }

            let mut closed = false;
            for event in events {
                if tx.send(event).await.is_err() {
                    closed = true;
                    break;
                }
            }
            if closed {
                debug!("Scan event channel closed, stopping scan");
                self.simulator.cancel();
                break;
            }

            if outcome.completed {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        let summary = self.simulator.summary();
        let event = if summary.status == ScanStatus::Complete {
            ScanEvent::Completed(summary.clone())
        } else {
            ScanEvent::Cancelled(summary.clone())
        };
        // Receiver may already be gone.
        let _ = tx.send(event).await;

        debug!(status = %summary.status, detected = summary.detected.len(), "Scan monitor stopped");
        Ok(summary)
    }
}

struct ActiveScan {
    handle: ScanHandle,
    task: JoinHandle<Result<ScanSummary>>,
}

/// Owns the single active scan.
///
/// Starting a scan cancels the previous one. Dropping the controller cancels
/// whatever is running.
#[derive(Default)]
pub struct ScanController {
    active: Option<ActiveScan>,
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("active", &self.is_active())
            .finish()
    }
}

impl ScanController {
    /// Create a controller with no scan running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `monitor` on the current runtime and return its event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<M>(&mut self, monitor: M) -> mpsc::Receiver<ScanEvent>
    where
        M: DetectionMonitor + 'static,
    {
        if self.cancel() {
            debug!("Previous scan cancelled by a new start");
        }

        let (tx, rx) = mpsc::channel(64);
        let handle = monitor.stop_handle();
        let mut monitor = monitor;
        let task = tokio::spawn(async move { monitor.start(tx).await });
        self.active = Some(ActiveScan { handle, task });
        rx
    }

    /// Check if a scan is still in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|scan| !scan.task.is_finished())
    }

    /// Stop the active scan. Returns whether there was one.
    ///
    /// No tick fires after this returns.
    pub fn cancel(&mut self) -> bool {
        let Some(scan) = self.active.take() else {
            return false;
        };
        scan.handle.stop();
        scan.task.abort();
        true
    }

    /// Wait for the active scan to end and return its summary.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotRunning`] if no scan was started,
    /// [`ScanError::Cancelled`] if it was aborted, or
    /// [`ScanError::TaskFailed`] if the task panicked.
    pub async fn finish(&mut self) -> Result<ScanSummary> {
        let scan = self.active.take().ok_or(ScanError::NotRunning)?;
        match scan.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ScanError::Cancelled),
            Err(e) => {
                warn!(error = %e, "Scan task failed");
                Err(ScanError::TaskFailed(e.to_string()))
            }
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.cancel();
    }
}
