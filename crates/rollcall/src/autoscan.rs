//! Gated automatic attendance: session code, then a timed scan.

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::gate::SessionCodeGate;
use crate::roster::{self, RosterEntry};
use crate::scan::{
    DetectionStrategy, RandomStrategy, ScanController, ScanEvent, ScanSimulator, ScanSummary,
    SimulatedMonitor,
};

/// Detection order from configuration: seeded if `scan.seed` is set.
#[must_use]
pub fn strategy_for(config: &Config) -> Box<dyn DetectionStrategy> {
    match config.scan.seed {
        Some(seed) => Box::new(RandomStrategy::seeded(seed)),
        None => Box::new(RandomStrategy::from_entropy()),
    }
}

/// Check `code` against the configured gate, then scan the students in
/// `roster` that carry a registered device.
///
/// `on_event` sees every scan event as it happens. Dropping the returned
/// future cancels the scan.
///
/// # Errors
///
/// Returns [`Error::InvalidSessionCode`](crate::Error::InvalidSessionCode)
/// without scanning if the code is wrong, or a scan error if the scan task
/// fails.
pub async fn run<F>(
    config: &Config,
    roster: &[RosterEntry],
    code: &str,
    strategy: Box<dyn DetectionStrategy>,
    mut on_event: F,
) -> Result<ScanSummary>
where
    F: FnMut(&ScanEvent),
{
    let mut gate = SessionCodeGate::new(&config.gate.session_code);
    gate.submit(code)?;

    let timing = config.scan_timing();
    let simulator = ScanSimulator::new(roster::scannable(roster), timing, strategy);
    let mut controller = ScanController::new();
    let mut events = controller.start(SimulatedMonitor::new(simulator, timing));

    while let Some(event) = events.recv().await {
        on_event(&event);
    }

    let summary = controller.finish().await?;
    info!(
        detected = summary.detected.len(),
        scannable = summary.roster_size,
        "Automatic scan finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fixtures;
    use crate::scan::{ScanStatus, ScriptedStrategy};

    #[tokio::test(start_paused = true)]
    async fn test_wrong_code_does_not_scan() {
        let config = Config::default();
        let mut events = 0;
        let result = run(
            &config,
            &fixtures::roster(),
            "000000",
            strategy_for(&config),
            |_| events += 1,
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidSessionCode)));
        assert_eq!(events, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_device_holders_only() {
        let mut config = Config::default();
        config.scan.seed = Some(11);
        let mut detected = Vec::new();

        let summary = run(
            &config,
            &fixtures::roster(),
            "123456",
            strategy_for(&config),
            |event| {
                if let ScanEvent::Detected(student) = event {
                    detected.push(student.id);
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.status, ScanStatus::Complete);
        assert_eq!(summary.roster_size, 10);
        assert_eq!(summary.detected_ids(), detected);
        assert!(detected.iter().all(|id| (1..=10).contains(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_run() {
        let config = Config::default();
        let summary = run(
            &config,
            &fixtures::roster(),
            "123456",
            Box::new(ScriptedStrategy::new([2, 5, 7, 12])),
            |_| {},
        )
        .await
        .unwrap();
        // 12 has no registered device.
        assert_eq!(summary.detected_ids(), vec![2, 5, 7]);
    }
}
