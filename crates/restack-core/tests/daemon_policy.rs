//! Tests for the polling loop and its scheduling policy.

mod support;

use std::time::Duration;

use restack_core::daemon::{FixedInterval, PollPolicy, run_daemon};
use restack_core::logging::CycleLog;
use restack_core::settings::Settings;
use restack_core::updater::Updater;

use support::{FakeSource, FakeStack, NEW_REV, OLD_REV, RecordingNotifier};

/// Stops the loop after a fixed number of cycles; used only by tests.
struct Bounded {
    limit: u64,
    delay: Duration,
}

impl PollPolicy for Bounded {
    fn next_delay(&self, completed_cycles: u64) -> Option<Duration> {
        (completed_cycles < self.limit).then_some(self.delay)
    }
}

#[test]
fn fixed_interval_never_stops() {
    let policy = FixedInterval::new(Duration::from_secs(300));
    for cycles in [0, 1, 10, 1_000_000] {
        assert_eq!(policy.next_delay(cycles), Some(Duration::from_secs(300)));
    }
}

#[tokio::test]
async fn always_failing_updater_keeps_the_loop_running() {
    let settings = Settings::for_repo("/srv/stack");
    let mut source = FakeSource::new(OLD_REV, NEW_REV);
    source.fetch_error = Some("remote unreachable".to_string());
    let stack = FakeStack::new();
    let notifier = RecordingNotifier::new();
    let updater = Updater::new(&settings, &source, &stack, &notifier);

    let policy = Bounded {
        limit: 3,
        delay: Duration::from_millis(1),
    };
    let log = CycleLog::new(None, false);
    run_daemon(&updater, &policy, &log, &log).await.unwrap();

    // Every scheduled cycle ran despite every one of them failing.
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn cycles_run_to_completion_before_the_next_is_scheduled() {
    let settings = Settings::for_repo("/srv/stack");
    let source = FakeSource::new(OLD_REV, NEW_REV);
    let stack = FakeStack::new();
    let notifier = RecordingNotifier::new();
    let updater = Updater::new(&settings, &source, &stack, &notifier);

    let policy = Bounded {
        limit: 2,
        delay: Duration::from_millis(1),
    };
    let log = CycleLog::new(None, false);
    run_daemon(&updater, &policy, &log, &log).await.unwrap();

    // First cycle updates, second finds the copy already current; the pull
    // count proves the cycles were serialized, not overlapped.
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(source.pull_count(), 1);
    assert_eq!(stack.calls(), vec!["stop", "build_and_start"]);
}
