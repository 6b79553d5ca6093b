//! Deterministic time for hook tests.

use repose_core::clock::{ManualClock, set_clock};
use repose_core::pump;
use web_time::Duration;

/// Install a fresh manual clock on this test's thread.
pub(crate) fn manual_clock() -> ManualClock {
    let clock = ManualClock::new();
    set_clock(Box::new(clock.clone()));
    clock
}

/// Let spawned tasks reach their timers, then move time forward and fire.
pub(crate) fn advance(clock: &ManualClock, ms: u64) {
    pump();
    clock.advance(Duration::from_millis(ms));
    pump();
}
