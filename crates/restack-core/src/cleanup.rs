//! Best-effort teardown of the daemon and the managed stack.
//!
//! Every step is individually non-fatal; the tool always reaches a clean
//! terminal state even when steps fail. The named persistent data volume is
//! never an argument to any step, so it survives teardown untouched.

use crate::install::ServiceControl;
use crate::logging::CycleLog;
use crate::settings::Settings;
use crate::stack::StackController;

/// Result of one teardown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Skipped,
    Failed,
}

/// One teardown step with its diagnosable result.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub status: StepStatus,
    pub detail: String,
}

/// Aggregate of all teardown steps. Converging to this report is the tool's
/// whole contract; individual failures stay visible inside it.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub steps: Vec<Step>,
}

impl CleanupReport {
    fn push(&mut self, name: &'static str, status: StepStatus, detail: impl Into<String>) {
        self.steps.push(Step {
            name,
            status,
            detail: detail.into(),
        });
    }

    pub fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }
}

/// Tear down the daemon service and the stack, absorbing every error into
/// the report.
pub fn run_cleanup<S, C>(
    settings: &Settings,
    stack: &S,
    service: &C,
    log: &CycleLog,
) -> CleanupReport
where
    S: StackController,
    C: ServiceControl,
{
    let mut report = CleanupReport::default();

    log.line("Stopping daemon service...");
    if !service.unit_installed() {
        report.push("daemon service", StepStatus::Skipped, "unit not installed");
    } else {
        let stopped = service.stop_unit().and_then(|()| service.disable_unit());
        match stopped {
            Ok(()) => report.push("daemon service", StepStatus::Ok, "stopped and disabled"),
            Err(err) => report.push("daemon service", StepStatus::Failed, format!("{err:#}")),
        }
    }

    log.line("Stopping stack...");
    if !stack.compose_present() {
        report.push("stack", StepStatus::Skipped, "compose file not present");
    } else {
        match stack.stop_with_orphans() {
            Ok(()) => report.push("stack", StepStatus::Ok, "stopped, orphans removed"),
            Err(err) => report.push("stack", StepStatus::Failed, format!("{err:#}")),
        }
    }

    log.line("Removing surviving containers...");
    match stack.remove_containers(&settings.service_prefix) {
        Ok(0) => report.push("containers", StepStatus::Skipped, "none matched"),
        Ok(count) => report.push(
            "containers",
            StepStatus::Ok,
            format!("removed {count} container(s)"),
        ),
        Err(err) => report.push("containers", StepStatus::Failed, format!("{err:#}")),
    }

    log.line("Removing stack network...");
    match stack.remove_network(&settings.network_name) {
        Ok(true) => report.push("network", StepStatus::Ok, "removed"),
        Ok(false) => report.push("network", StepStatus::Skipped, "not present"),
        Err(err) => report.push("network", StepStatus::Failed, format!("{err:#}")),
    }

    log.line("Pruning unused networks...");
    match stack.prune_networks() {
        Ok(()) => report.push("network prune", StepStatus::Ok, "pruned"),
        Err(err) => report.push("network prune", StepStatus::Failed, format!("{err:#}")),
    }

    log.line("Cleanup complete.");
    report
}
