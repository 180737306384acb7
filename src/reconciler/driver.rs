//! The top-level loop that owns one [`Reconciler`] for the daemon's
//! lifetime: pump the host run loop, ingest whatever events arrive, tick
//! the pipeline, and run periodic validation once it falls due.

use std::time::{Duration, Instant};

use crate::platform::{PlatformAdapter, SaChannel};
use crate::reconciler::pipeline::Reconciler;
use crate::reconciler::PERIODIC_VALIDATION_INTERVAL;

/// How long a single `run_once` call may block waiting for a host
/// callback before the loop comes back around to check `signals.running()`.
const RUN_ONCE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drives `reconciler` until [`CrossThreadSignals::running`] goes false,
/// i.e. until `begin_shutdown` is called from another thread (typically
/// the daemon's signal handler).
pub fn run<P: PlatformAdapter + SaChannel>(reconciler: &mut Reconciler<P>) {
    while reconciler.signals.running() {
        step(reconciler, RUN_ONCE_TIMEOUT);
    }
}

/// One iteration of the loop: block on the host run loop for up to
/// `timeout`, ingest whatever events it returns, tick the pipeline (a
/// no-op if nothing is dirty), and run periodic validation on schedule.
pub fn step<P: PlatformAdapter + SaChannel>(reconciler: &mut Reconciler<P>, timeout: Duration) {
    for event in reconciler.adapter.run_once(timeout) {
        reconciler.ingest(event);
    }
    reconciler.tick();
    if reconciler.last_validation().elapsed() >= PERIODIC_VALIDATION_INTERVAL {
        reconciler.run_periodic_validation();
    }
}

/// Steps the loop for at most `budget` wall-clock time without blocking on
/// a real host run loop; used by tests and by `tesserac --replay`-style
/// tooling where the mock adapter returns immediately from `run_once`.
pub fn run_with_timeout<P: PlatformAdapter + SaChannel>(reconciler: &mut Reconciler<P>, budget: Duration) {
    let start = Instant::now();
    while start.elapsed() < budget && reconciler.signals.running() {
        step(reconciler, Duration::from_millis(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::platform::mock::MockAdapter;

    #[test]
    fn step_ingests_queued_events_and_ticks() {
        let adapter = MockAdapter::new();
        adapter.queue_event(crate::platform::PlatformEvent::AppLaunched { pid: 123 });
        let mut reconciler = Reconciler::new(Config::default(), adapter);
        step(&mut reconciler, Duration::from_millis(0));
        assert!(reconciler.dirty.is_clean());
    }

    #[test]
    fn run_with_timeout_stops_after_shutdown_signal() {
        let mut reconciler = Reconciler::new(Config::default(), MockAdapter::new());
        reconciler.signals.begin_shutdown();
        run_with_timeout(&mut reconciler, Duration::from_millis(50));
        assert!(!reconciler.signals.running());
    }
}
