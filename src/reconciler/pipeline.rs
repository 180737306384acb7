//! The reconciler: owns the state store, dirty tracking, and the
//! platform/SA adapters, and runs the fixed-order per-tick pipeline.

use std::time::{Duration, Instant};

use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;
use tracing::{debug, warn};

use crate::common::config::Config;
use crate::model::ids::{Pid, SpaceId, WindowId};
use crate::model::State;
use crate::platform::{PlatformAdapter, PlatformEvent, SaChannel};
use crate::reconciler::{
    CrossThreadSignals, DirtyFlags, DirtyState, DISPLAY_CHANGE_SETTLE, PENDING_MOVES_TIMEOUT,
};
use crate::rules::RuleEngine;

pub struct Reconciler<P> {
    pub state: State,
    pub config: Config,
    pub rules: RuleEngine,
    pub dirty: DirtyState,
    pub signals: CrossThreadSignals,
    pub adapter: P,
    epoch: Instant,
    last_validation: Instant,
    focused_window_id: Option<WindowId>,
}

impl<P: PlatformAdapter + SaChannel> Reconciler<P> {
    pub fn new(config: Config, adapter: P) -> Self {
        let rules = RuleEngine::from_config(&config);
        let now = Instant::now();
        Reconciler {
            state: State::default(),
            config,
            rules,
            dirty: DirtyState::default(),
            signals: CrossThreadSignals::new(),
            adapter,
            epoch: now,
            last_validation: now,
            focused_window_id: None,
        }
    }

    pub fn ingest(&mut self, event: PlatformEvent) { crate::reconciler::ingest(&mut self.dirty, event) }

    /// One run of the ordered reconciliation pipeline. Returns early after
    /// steps 1 or 2 if either consumed the whole tick.
    pub fn tick(&mut self) {
        let now = Instant::now();

        // Applying a freshly-watched config file is independent of which
        // pipeline step ends up running this tick; do it first so it is
        // never lost behind an early return in steps 1-2.
        if let Some(config) = self.dirty.pending_config.take() {
            self.config = *config;
            self.rules = RuleEngine::from_config(&self.config);
        }

        // Step 1: debounced display change.
        if self.signals.display_change_pending() {
            let elapsed = now.saturating_duration_since(self.epoch).as_millis() as u64
                - self.signals.display_change_millis();
            if Duration::from_millis(elapsed) >= DISPLAY_CHANGE_SETTLE {
                self.signals.take_display_change_pending();
                self.run_display_settled();
                self.dirty.clear();
                return;
            }
        }

        // Step 2: deferred window moves.
        if self.signals.pending_window_moves() {
            let elapsed = now.saturating_duration_since(self.epoch).as_millis() as u64
                - self.signals.pending_moves_millis();
            if Duration::from_millis(elapsed) >= PENDING_MOVES_TIMEOUT.as_millis() as u64 {
                warn!("giving up on deferred window moves after 5s");
                self.signals.clear_pending_window_moves();
            } else if self.adapter.is_available() {
                let deferred = crate::sync_planner::move_windows_to_match_labels(
                    &mut self.state,
                    &self.rules,
                    &self.adapter,
                );
                if !deferred {
                    self.signals.clear_pending_window_moves();
                    self.dirty.flags |= DirtyFlags::LAYOUT_ALL;
                }
            }
        }

        // Step 3: short-circuit.
        if self.dirty.is_clean() {
            return;
        }

        // Step 4: validate state.
        if self.dirty.flags.contains(DirtyFlags::VALIDATE_STATE) {
            self.validate_state();
        }

        // Step 5: process terminations.
        let terminated = self.dirty.pids.terminated.drain();
        for pid in terminated {
            let removed = self.state.windows.remove_all_for_pid(pid);
            if !removed.is_empty() {
                self.dirty.flags |= DirtyFlags::LAYOUT_ALL;
            }
            self.state.apps.remove(pid);
        }

        // Step 6: refresh window -> space mapping.
        if self.dirty.flags.contains(DirtyFlags::REFRESH_WINDOW_SPACES) {
            self.refresh_window_spaces();
        }

        // Step 7: scan running apps.
        if self.dirty.flags.contains(DirtyFlags::SCAN_APPS) {
            crate::sync_planner::scan_windows(&mut self.state, &self.adapter);
        }

        // Step 8: sync spaces / sync config.
        if self.dirty.flags.intersects(DirtyFlags::SYNC_SPACES | DirtyFlags::SYNC_CONFIG) {
            self.rules = RuleEngine::from_config(&self.config);
            let outcome = crate::sync_planner::run(
                &mut self.state,
                &self.config,
                &self.rules,
                &self.adapter,
                false,
            );
            if outcome.deferred_moves {
                self.signals.mark_pending_window_moves(self.epoch, now);
            }
            for space in outcome.spaces_to_layout {
                self.dirty.dirty_spaces.insert(space);
            }
        }

        // Step 9: process launches.
        let launched = self.dirty.pids.launched.drain();
        if !launched.is_empty() {
            for pid in launched {
                self.track_launch(pid);
            }
            self.dirty.flags |= DirtyFlags::LAYOUT_CURRENT;
        }

        // Step 10: hidden/shown.
        let hidden = self.dirty.pids.hidden.drain();
        for pid in hidden {
            for window in self.state.windows.for_pid(pid).collect::<Vec<_>>() {
                self.state.windows.set_flag(window, |f| f.hidden = true);
            }
            self.dirty.flags |= DirtyFlags::LAYOUT_CURRENT;
        }
        let shown = self.dirty.pids.shown.drain();
        for pid in shown {
            for window in self.state.windows.for_pid(pid).collect::<Vec<_>>() {
                self.state.windows.set_flag(window, |f| f.hidden = false);
            }
            self.dirty.flags |= DirtyFlags::LAYOUT_CURRENT;
        }

        // Step 11: focus change.
        if let Some(pid) = self.dirty.pending_focus_pid.take() {
            self.resolve_focus(pid);
        }

        // Step 12: rebuild view.
        if self.dirty.flags.contains(DirtyFlags::REBUILD_VIEW) {
            if let Some(current) = self.state.spaces.current_space_id() {
                self.state.spaces.remove_view(current);
            }
        }

        // Step 13: apply layouts.
        self.apply_layouts();

        // Step 14: clear all flags and queues.
        self.dirty.clear();
    }

    /// Runs the sync planner in display-change mode and schedules the two
    /// layout passes §4.6 step 9 calls for.
    fn run_display_settled(&mut self) {
        let outcome =
            crate::sync_planner::run(&mut self.state, &self.config, &self.rules, &self.adapter, true);
        if outcome.deferred_moves {
            self.signals.mark_pending_window_moves(self.epoch, Instant::now());
        }
        for &space in &outcome.spaces_to_layout {
            self.layout_space(space);
        }
        crate::sync_planner::layout_settle_delay();
        for &space in &outcome.spaces_to_layout {
            self.layout_space(space);
        }
    }

    fn validate_state(&mut self) {
        let stale: Vec<WindowId> = self
            .state
            .windows
            .iter()
            .filter(|w| self.adapter.get_window_space(w.id).is_none())
            .map(|w| w.id)
            .collect();
        for window in stale {
            self.state.windows.remove(window);
        }

        let dead: Vec<Pid> = self
            .state
            .apps
            .iter()
            .map(|(&pid, _)| pid)
            .filter(|&pid| kill(NixPid::from_raw(pid), None).is_err())
            .collect();
        for pid in dead {
            self.state.apps.remove(pid);
            self.state.windows.remove_all_for_pid(pid);
        }

        if let Some(focused) = self.focused_window_id {
            if !self.state.windows.contains(focused) {
                self.focused_window_id = None;
                self.state.windows.set_focused(None);
            }
        }
    }

    fn refresh_window_spaces(&mut self) {
        let ids: Vec<WindowId> = self.state.windows.iter().map(|w| w.id).collect();
        for window in ids {
            let Some(cached) = self.state.windows.get(window).map(|w| w.space_id) else { continue };
            let queried = self.adapter.get_window_space(window);
            let resolved = queried.unwrap_or(cached);
            if resolved != cached {
                self.state.windows.set_space(window, resolved);
                self.dirty.dirty_spaces.insert(cached);
                self.dirty.dirty_spaces.insert(resolved);
            }
        }
    }

    fn track_launch(&mut self, pid: Pid) {
        let app_name = self.adapter.app_name(pid);
        let effect = app_name.as_deref().map(|n| self.rules.resolve(n)).unwrap_or_default();
        let Ok(handle) = self.adapter.subscribe_observer(pid) else { return };
        self.state.apps.insert(pid, handle);

        for window in self.adapter.list_windows_for_app(pid) {
            let Some(space) = self.adapter.get_window_space(window) else { continue };
            self.state.windows.add(window, pid, space, None);
            if !effect.manage {
                self.state.windows.set_flag(window, |f| f.floating = true);
            }
            if let Some(opacity) = effect.opacity {
                let _ = self.adapter.set_window_opacity(window, opacity);
            }
        }
    }

    fn resolve_focus(&mut self, pid: Pid) {
        let already_tracked: Vec<WindowId> = self.state.windows.for_pid(pid).collect();
        let mut focused = already_tracked.first().copied();
        if focused.is_none() {
            // The platform may surface a window the core had not yet
            // seen; fall back to an AX query rather than give up on focus.
            for window in self.adapter.list_windows_for_app(pid) {
                if let Some(space) = self.adapter.get_window_space(window) {
                    self.state.windows.add(window, pid, space, None);
                    focused = Some(window);
                    break;
                }
            }
        }
        if let Some(window) = focused {
            self.focused_window_id = Some(window);
            self.state.windows.set_focused(Some(window));
            if let Some(space) = self.state.windows.get(window).map(|w| w.space_id) {
                self.state.spaces.set_current_space(space);
            }
        }
    }

    fn apply_layouts(&mut self) {
        if self.dirty.flags.contains(DirtyFlags::LAYOUT_ALL) {
            let displays = self.state.displays.get_active_list().to_vec();
            for display in displays {
                if let Some(space) = self.adapter.get_current_space(display) {
                    self.layout_space(space);
                }
            }
        } else if self.dirty.flags.contains(DirtyFlags::LAYOUT_CURRENT) {
            if let Some(space) = self.state.spaces.current_space_id() {
                self.layout_space(space);
            }
        } else {
            let dirty_spaces: Vec<SpaceId> = self.dirty.dirty_spaces.iter().copied().collect();
            for space in dirty_spaces {
                if self.state.spaces.has_view(space) {
                    self.layout_space(space);
                }
            }
        }
    }

    pub(crate) fn layout_space(&mut self, space: SpaceId) {
        let Some(display) = self
            .state
            .displays
            .get_active_list()
            .iter()
            .find(|&&d| self.adapter.get_spaces_for_display(d).contains(&space))
            .copied()
        else {
            return;
        };
        let bounds = self
            .adapter
            .get_display_frame(display)
            .deflate_sides(
                self.config.padding.top + self.config.external_bar.top,
                self.config.padding.bottom + self.config.external_bar.bottom,
                self.config.padding.left,
                self.config.padding.right,
            );
        let windows = self.state.windows.tileable_for_space(space);
        let frames =
            self.state.spaces.apply_layout(space, bounds, &windows, self.config.gap, self.config.split_ratio);
        if let Some(view) = self.state.spaces.view(space) {
            tracing::trace!(?space, tree = %view.render_tree(), "space layout applied");
        }
        for (window, frame) in frames {
            if let Err(err) = self.adapter.set_window_frame(window, frame) {
                debug!(?window, %err, "frame set failed, continuing with remaining windows");
            }
        }
    }

    /// The window the reconciler last resolved as focused, tracked
    /// outside `state.windows` so validation can clear it without a
    /// second source of truth.
    pub fn focused_window(&self) -> Option<WindowId> { self.focused_window_id }

    /// Command handlers that must feel instantaneous set focus directly
    /// rather than going through a dirty flag.
    pub fn set_focused_window(&mut self, window: WindowId) {
        self.focused_window_id = Some(window);
        self.state.windows.set_focused(Some(window));
        if let Some(space) = self.state.windows.get(window).map(|w| w.space_id) {
            self.state.spaces.set_current_space(space);
        }
    }

    pub fn run_periodic_validation(&mut self) {
        self.dirty.flags |= DirtyFlags::VALIDATE_STATE;
        self.validate_state();
        let _ = self.adapter.enable_event_tap();
        debug!(windows = self.state.windows.len(), apps = self.state.apps.len(), "periodic validation");
        self.last_validation = Instant::now();
    }

    pub fn last_validation(&self) -> Instant { self.last_validation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockAdapter;
    use crate::platform::PlatformEvent;

    #[test]
    fn config_changed_event_replaces_config_before_the_rest_of_the_tick() {
        let mut reconciler = Reconciler::new(Config::default(), MockAdapter::new());
        assert_eq!(reconciler.config.gap, 8.0);

        let new_config = Config { gap: 42.0, ..Config::default() };
        reconciler.ingest(PlatformEvent::ConfigChanged(Box::new(new_config)));
        reconciler.tick();

        assert_eq!(reconciler.config.gap, 42.0);
        assert!(reconciler.dirty.pending_config.is_none());
    }

    #[test]
    fn config_changed_applies_even_when_display_change_consumes_the_tick() {
        let mut reconciler = Reconciler::new(Config::default(), MockAdapter::new());
        let new_config = Config { gap: 16.0, ..Config::default() };
        reconciler.ingest(PlatformEvent::ConfigChanged(Box::new(new_config)));
        let epoch = reconciler.epoch;
        reconciler.signals.mark_display_change(epoch, epoch);
        std::thread::sleep(DISPLAY_CHANGE_SETTLE + Duration::from_millis(50));

        reconciler.tick();

        assert_eq!(reconciler.config.gap, 16.0);
        assert!(!reconciler.signals.display_change_pending());
    }
}
