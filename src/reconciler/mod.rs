//! The dirty reconciler: bit-packed flags, bounded dedup'd queues, and the
//! handful of atomics touched from outside the loop thread. Event intake
//! (`ingest`) does only the minimal work safe to run outside the loop
//! thread; `tick` runs the full ordered pipeline in `pipeline.rs`.

pub mod driver;
pub mod pipeline;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::common::collections::HashSet;
use crate::model::ids::Pid;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u32 {
        // layout
        const LAYOUT_CURRENT       = 1 << 0;
        const LAYOUT_ALL           = 1 << 1;
        const REBUILD_VIEW         = 1 << 2;
        // sync
        const SCAN_APPS            = 1 << 3;
        const SYNC_SPACES          = 1 << 4;
        const SYNC_CONFIG          = 1 << 5;
        // validation
        const VALIDATE_STATE       = 1 << 6;
        const REFRESH_WINDOW_SPACES = 1 << 7;
        // app-event
        const APPS_LAUNCHED        = 1 << 8;
        const APPS_TERMINATED      = 1 << 9;
        const APP_FOCUS_CHANGED    = 1 << 10;
        const APPS_HIDDEN          = 1 << 11;
        const APPS_SHOWN           = 1 << 12;
    }
}

/// A fixed-capacity, insert-deduplicating set, used for dirty space ids.
/// Once full, further inserts are silently dropped: overflow at this
/// capacity implies pathological input rather than expected load.
#[derive(Debug, Clone)]
pub struct BoundedSet<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T: Copy + PartialEq> BoundedSet<T> {
    pub fn new(capacity: usize) -> Self { BoundedSet { capacity, items: Vec::with_capacity(capacity) } }

    pub fn insert(&mut self, item: T) {
        if self.items.contains(&item) {
            return;
        }
        if self.items.len() >= self.capacity {
            return;
        }
        self.items.push(item);
    }

    pub fn drain(&mut self) -> Vec<T> { std::mem::take(&mut self.items) }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &T> { self.items.iter() }
}

impl<T> Default for BoundedSet<T> {
    fn default() -> Self { BoundedSet { capacity: 16, items: Vec::new() } }
}

pub const DIRTY_SPACES_CAPACITY: usize = 16;
pub const PID_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Default)]
pub struct PidQueues {
    pub launched: BoundedSet<Pid>,
    pub terminated: BoundedSet<Pid>,
    pub hidden: BoundedSet<Pid>,
    pub shown: BoundedSet<Pid>,
}

/// The handful of values a callback running on a non-loop host thread may
/// write; read with acquire, written with release.
#[derive(Debug, Default)]
pub struct CrossThreadSignals {
    display_change_pending: AtomicBool,
    display_change_time_millis: AtomicU64,
    pending_window_moves: AtomicBool,
    pending_moves_time_millis: AtomicU64,
    shutting_down: AtomicBool,
    running: AtomicBool,
}

fn millis_since(epoch: Instant, at: Instant) -> u64 { at.saturating_duration_since(epoch).as_millis() as u64 }

impl CrossThreadSignals {
    pub fn new() -> Self { let s = Self::default(); s.running.store(true, Ordering::Release); s }

    pub fn mark_display_change(&self, epoch: Instant, now: Instant) {
        self.display_change_pending.store(true, Ordering::Release);
        self.display_change_time_millis.store(millis_since(epoch, now), Ordering::Release);
    }

    pub fn take_display_change_pending(&self) -> bool {
        self.display_change_pending.swap(false, Ordering::AcqRel)
    }

    pub fn display_change_pending(&self) -> bool { self.display_change_pending.load(Ordering::Acquire) }

    pub fn display_change_millis(&self) -> u64 { self.display_change_time_millis.load(Ordering::Acquire) }

    pub fn mark_pending_window_moves(&self, epoch: Instant, now: Instant) {
        self.pending_window_moves.store(true, Ordering::Release);
        self.pending_moves_time_millis.store(millis_since(epoch, now), Ordering::Release);
    }

    pub fn clear_pending_window_moves(&self) { self.pending_window_moves.store(false, Ordering::Release); }

    pub fn pending_window_moves(&self) -> bool { self.pending_window_moves.load(Ordering::Acquire) }

    pub fn pending_moves_millis(&self) -> u64 { self.pending_moves_time_millis.load(Ordering::Acquire) }

    pub fn shutting_down(&self) -> bool { self.shutting_down.load(Ordering::Acquire) }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    pub fn running(&self) -> bool { self.running.load(Ordering::Acquire) }
}

pub const DISPLAY_CHANGE_SETTLE: Duration = Duration::from_millis(500);
pub const PENDING_MOVES_TIMEOUT: Duration = Duration::from_secs(5);
pub const LAYOUT_REVERT_PASS_DELAY: Duration = Duration::from_millis(200);
pub const PERIODIC_VALIDATION_INTERVAL: Duration = Duration::from_secs(5);
pub const SHUTDOWN_QUIESCENCE: Duration = Duration::from_millis(50);

/// All the dirty-tracking state for one reconciler instance, independent
/// of the state store and platform adapter it operates on.
#[derive(Debug, Default)]
pub struct DirtyState {
    pub flags: DirtyFlags,
    pub dirty_spaces: BoundedSet<crate::model::ids::SpaceId>,
    pub pids: PidQueues,
    pub pending_focus_pid: Option<Pid>,
    pub pending_config: Option<Box<crate::common::config::Config>>,
}

impl DirtyState {
    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
            && self.dirty_spaces.is_empty()
            && self.pids.launched.is_empty()
            && self.pids.terminated.is_empty()
            && self.pids.hidden.is_empty()
            && self.pids.shown.is_empty()
            && self.pending_focus_pid.is_none()
            && self.pending_config.is_none()
    }

    pub fn clear(&mut self) {
        self.flags = DirtyFlags::empty();
        self.dirty_spaces.drain();
        self.pids.launched.drain();
        self.pids.terminated.drain();
        self.pids.hidden.drain();
        self.pids.shown.drain();
        self.pending_focus_pid = None;
        self.pending_config = None;
    }
}

/// One externally observed occurrence pushed into event intake (see
/// [`crate::platform::PlatformEvent`]); `ingest` translates each into the
/// minimal dirty-state mutation safe to perform off the loop thread.
pub fn ingest(dirty: &mut DirtyState, event: crate::platform::PlatformEvent) {
    use crate::platform::PlatformEvent as E;
    match event {
        E::AppLaunched { pid } => {
            dirty.pids.launched.insert(pid);
            dirty.flags |= DirtyFlags::APPS_LAUNCHED;
        }
        E::AppTerminated { pid } => {
            dirty.pids.terminated.insert(pid);
            dirty.flags |= DirtyFlags::APPS_TERMINATED;
        }
        E::AppHidden { pid } => {
            dirty.pids.hidden.insert(pid);
            dirty.flags |= DirtyFlags::APPS_HIDDEN;
        }
        E::AppShown { pid } => {
            dirty.pids.shown.insert(pid);
            dirty.flags |= DirtyFlags::APPS_SHOWN;
        }
        E::WindowFocusChanged { pid } => {
            dirty.pending_focus_pid = Some(pid);
            dirty.flags |= DirtyFlags::APP_FOCUS_CHANGED;
        }
        E::DisplaysChanged => {
            // Display reconfiguration callbacks may run on a non-loop
            // thread; the settled procedure itself is debounced through
            // `CrossThreadSignals`, handled by the driver rather than here.
            dirty.flags |= DirtyFlags::VALIDATE_STATE;
        }
        E::ConfigChanged(config) => {
            dirty.pending_config = Some(config);
            dirty.flags |= DirtyFlags::SYNC_CONFIG | DirtyFlags::SYNC_SPACES;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_set_dedups_and_caps() {
        let mut set: BoundedSet<u32> = BoundedSet::new(2);
        set.insert(1);
        set.insert(1);
        set.insert(2);
        set.insert(3);
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn ingest_app_launched_sets_flag_and_queue() {
        let mut dirty = DirtyState::default();
        ingest(&mut dirty, crate::platform::PlatformEvent::AppLaunched { pid: 7 });
        assert!(dirty.flags.contains(DirtyFlags::APPS_LAUNCHED));
        assert_eq!(dirty.pids.launched.iter().copied().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut dirty = DirtyState::default();
        ingest(&mut dirty, crate::platform::PlatformEvent::AppLaunched { pid: 7 });
        dirty.clear();
        assert!(dirty.is_clean());
    }
}
