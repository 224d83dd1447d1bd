//! The polling daemon loop.
//!
//! Runs update cycles on a wall-clock schedule supplied by a [`PollPolicy`].
//! The loop is deliberately indifferent to each cycle's outcome: a failed
//! cycle does not change the schedule, trigger a retry, or terminate the
//! loop. Recovery is purely time-based. Cycles never overlap because the
//! loop awaits each cycle to completion before sleeping.

use std::time::Duration;

use anyhow::Context;
use chrono::Local;

use crate::git::RevisionSource;
use crate::logging::CycleLog;
use crate::notify::Notify;
use crate::stack::StackController;
use crate::updater::Updater;

/// Schedule of delays between update cycles.
///
/// Decoupled from the updater's result type so bounded-retry or backoff
/// policies can be substituted without touching the updater.
pub trait PollPolicy {
    /// Delay before the next cycle, given how many cycles have completed.
    /// `None` stops the loop.
    fn next_delay(&self, completed_cycles: u64) -> Option<Duration>;
}

/// Default policy: the same interval forever.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl PollPolicy for FixedInterval {
    fn next_delay(&self, _completed_cycles: u64) -> Option<Duration> {
        Some(self.interval)
    }
}

/// Run update cycles until the policy stops the loop (never, for
/// [`FixedInterval`]) or the process is terminated externally.
///
/// Loop bookkeeping goes to `daemon_log`; the cycles themselves write to
/// `cycle_log` (mirrored to stdout as configured by the caller).
pub async fn run_daemon<R, S, N, P>(
    updater: &Updater<'_, R, S, N>,
    policy: &P,
    daemon_log: &CycleLog,
    cycle_log: &CycleLog,
) -> anyhow::Result<()>
where
    R: RevisionSource,
    S: StackController,
    N: Notify,
    P: PollPolicy,
{
    let mut completed: u64 = 0;
    loop {
        daemon_log.line("Starting update check...");
        // The outcome is deliberately not inspected; scheduling never
        // depends on it.
        let _ = updater.run_cycle(cycle_log).await;
        completed += 1;

        let Some(delay) = policy.next_delay(completed) else {
            return Ok(());
        };
        let next = Local::now()
            + chrono::Duration::from_std(delay).context("Poll interval out of range")?;
        daemon_log.line(&format!("Next check at {}", next.format("%Y-%m-%d %H:%M:%S")));
        tokio::time::sleep(delay).await;
    }
}
