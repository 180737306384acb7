//! The sync planner: one subroutine, run at startup (after config load)
//! and again whenever a display change has settled. Reconciles configured
//! spaces/displays against whatever the host currently reports.

use std::thread::sleep;
use std::time::Duration;

use tracing::warn;

use crate::common::collections::HashMap;
use crate::common::config::{Config, DisplayKind};
use crate::model::ids::{DisplayId, Pid, SpaceId};
use crate::model::State;
use crate::platform::{PlatformAdapter, SaChannel};
use crate::rules::RuleEngine;

const HOST_SETTLE_DELAY: Duration = Duration::from_millis(100);
const LAYOUT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Returned by [`run`] so the reconciler knows whether to set
/// `dirty.pending_window_moves` (SA channel was unavailable partway
/// through) and which spaces now need a layout pass.
pub struct PlanOutcome {
    pub deferred_moves: bool,
    pub spaces_to_layout: Vec<SpaceId>,
}

/// Runs the full startup/display-hot-plug procedure, and — if
/// `restore_current_spaces` is set — restores each
/// display's previously current space afterwards (needed only on the
/// display-change trigger, since creating spaces can shift focus on some
/// hosts).
pub fn run<P: PlatformAdapter + SaChannel>(
    state: &mut State,
    config: &Config,
    rules: &RuleEngine,
    adapter: &P,
    restore_current_spaces: bool,
) -> PlanOutcome {
    let mut previous_current: HashMap<DisplayId, SpaceId> = HashMap::default();
    if restore_current_spaces {
        for &display in state.displays.get_active_list() {
            if let Some(space) = adapter.get_current_space(display) {
                previous_current.insert(display, space);
            }
        }
    }

    // Step 1: match displays to labels.
    match_displays_to_labels(state, config, adapter);

    // Step 2: scan windows (adds untracked apps/windows, refreshes known ones).
    scan_windows(state, adapter);

    loop {
        // Step 3: build target state — which display each configured space targets.
        let targets = build_target_state(state, config);

        // Step 4: smart labeling.
        smart_label_from_rules(state, rules, adapter, &targets);

        // Step 5: reconcile space count per display.
        let topology_changed = reconcile_space_counts(state, adapter, &targets);

        // Step 6: rescan if topology changed.
        if topology_changed {
            scan_windows(state, adapter);
            continue;
        }

        // Step 7: position-label remaining spaces.
        position_label_remaining(state, adapter, &targets);
        break;
    }

    // Step 8: move windows to match labels.
    let deferred_moves = move_windows_to_match_labels(state, rules, adapter);

    // Step 9: layout visible spaces, twice, 200ms apart.
    let spaces_to_layout: Vec<SpaceId> = state
        .displays
        .get_active_list()
        .iter()
        .filter_map(|&d| adapter.get_current_space(d))
        .collect();

    if restore_current_spaces {
        for (display, space) in previous_current {
            if state.displays.get_active_list().contains(&display) {
                let _ = PlatformAdapter::focus_space(adapter, space);
            }
        }
    }

    PlanOutcome { deferred_moves, spaces_to_layout }
}

fn match_displays_to_labels<P: PlatformAdapter>(state: &mut State, config: &Config, adapter: &P) {
    let active = adapter.get_active_display_list();
    state.displays.set_active_list(active.clone());
    for configured in &config.displays {
        let Some(&matched) = active.first() else { continue };
        let wants_external = matches!(configured.kind, DisplayKind::External);
        let pick = active
            .iter()
            .find(|&&d| (d != active[0]) == wants_external)
            .copied()
            .unwrap_or(matched);
        state.displays.set_label(pick, configured.label.clone());
    }
}

pub(crate) fn scan_windows<P: PlatformAdapter>(state: &mut State, adapter: &P) {
    let running = adapter.list_running_apps();
    for pid in running {
        if !state.apps.contains(pid) {
            let windows = adapter.list_windows_for_app(pid);
            if let Ok(handle) = adapter.subscribe_observer(pid) {
                state.apps.insert(pid, handle);
            }
            for window in windows {
                let Some(space) = adapter.get_window_space(window) else { continue };
                state.windows.add(window, pid, space, None);
            }
        } else {
            for window in state.windows.for_pid(pid).collect::<Vec<_>>() {
                if let Some(space) = adapter.get_window_space(window) {
                    state.windows.set_space(window, space);
                }
            }
        }
    }
}

struct Target {
    label: String,
    display: DisplayId,
}

fn build_target_state(state: &State, config: &Config) -> Vec<Target> {
    let fallback = state.displays.get_by_index(0);
    config
        .spaces
        .iter()
        .filter_map(|configured| {
            let display = configured
                .display
                .as_deref()
                .and_then(|label| state.displays.id_of_label(label))
                .or(fallback)?;
            Some(Target { label: configured.name.clone(), display })
        })
        .collect()
}

fn smart_label_from_rules<P: PlatformAdapter>(
    state: &mut State,
    rules: &RuleEngine,
    adapter: &P,
    targets: &[Target],
) {
    for pid in state.apps.iter().map(|(&pid, _)| pid).collect::<Vec<Pid>>() {
        let Some(app_name) = adapter.app_name(pid) else { continue };
        let effect = rules.resolve(&app_name);
        let Some(target_label) = effect.target_space_label else { continue };
        let Some(target) = targets.iter().find(|t| t.label == target_label) else { continue };
        for window in state.windows.for_pid(pid).collect::<Vec<_>>() {
            let Some(space) = adapter.get_window_space(window) else { continue };
            let Some(display) = adapter.get_current_space(target.display) else { continue };
            if space == display && state.spaces.label_of(space).is_none() {
                state.spaces.set_label(space, target_label.clone());
            }
        }
    }
}

fn reconcile_space_counts<P: PlatformAdapter + SaChannel>(
    state: &mut State,
    adapter: &P,
    targets: &[Target],
) -> bool {
    let mut changed = false;
    let active_displays = state.displays.get_active_list().to_vec();
    for display in active_displays {
        let have: Vec<SpaceId> = adapter.get_spaces_for_display(display);
        let want = targets.iter().filter(|t| t.display == display).count();

        if have.len() < want {
            let Some(&last) = have.last() else { continue };
            for _ in have.len()..want {
                if !adapter.is_available() {
                    warn!(?display, "sa channel unavailable, cannot create space");
                    break;
                }
                match adapter.create_space(last) {
                    Ok(_) => {
                        changed = true;
                        sleep(HOST_SETTLE_DELAY);
                    }
                    Err(err) => {
                        warn!(?display, %err, "failed to create space");
                        break;
                    }
                }
            }
        } else if have.len() > want {
            let mut trailing: Vec<SpaceId> = have[want..].to_vec();
            trailing.reverse();
            let Some(&first) = have.first() else { continue };
            for space in trailing {
                let is_empty = state.windows.by_space(space).is_empty();
                if !is_empty {
                    for window in state.windows.by_space(space).to_vec() {
                        let _ = adapter.move_window_to_space(window, first);
                        state.windows.set_space(window, first);
                    }
                }
                if adapter.destroy_space(space).is_ok() {
                    changed = true;
                    sleep(HOST_SETTLE_DELAY);
                }
            }
        }
    }
    changed
}

fn position_label_remaining<P: PlatformAdapter>(state: &mut State, adapter: &P, targets: &[Target]) {
    for display in state.displays.get_active_list().to_vec() {
        let spaces = adapter.get_spaces_for_display(display);
        let mut unlabeled = spaces.into_iter().filter(|s| state.spaces.label_of(*s).is_none());
        for target in targets.iter().filter(|t| t.display == display) {
            if state.spaces.id_of_label(&target.label).is_some() {
                continue;
            }
            if let Some(space) = unlabeled.next() {
                state.spaces.set_label(space, target.label.clone());
            }
        }
    }
}

pub(crate) fn move_windows_to_match_labels<P: PlatformAdapter>(
    state: &mut State,
    rules: &RuleEngine,
    adapter: &P,
) -> bool {
    for window in state.windows.iter().map(|w| w.id).collect::<Vec<_>>() {
        let Some(record) = state.windows.get(window) else { continue };
        let pid = record.owning_pid;
        let Some(app_name) = adapter.app_name(pid) else { continue };
        let effect = rules.resolve(&app_name);
        if !effect.manage {
            continue;
        }
        let Some(target_label) = effect.target_space_label else { continue };
        let Some(target_space) = state.spaces.id_of_label(&target_label) else { continue };
        let current_label = state.spaces.label_of(record.space_id);
        if current_label == Some(target_label.as_str()) {
            continue;
        }
        if adapter.move_window_to_space(window, target_space).is_err() {
            return true;
        }
        state.windows.set_space(window, target_space);
    }
    false
}

/// Applies [`PlanOutcome::spaces_to_layout`] twice, `LAYOUT_SETTLE_DELAY`
/// apart, the way §4.6 step 9 mandates. Actual frame-setting is deferred
/// to the caller (the pipeline), which has the bounds and gap for each
/// space; this just performs the required sleep between passes.
pub(crate) fn layout_settle_delay() { sleep(LAYOUT_SETTLE_DELAY); }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockAdapter;

    #[test]
    fn build_target_state_falls_back_to_display_index_zero() {
        let mut state = State::default();
        state.displays.set_active_list(vec![DisplayId(1)]);
        let config = Config {
            spaces: vec![crate::common::config::ConfiguredSpace {
                name: "code".into(),
                display: Some("missing".into()),
            }],
            ..Config::default()
        };
        let targets = build_target_state(&state, &config);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].display, DisplayId(1));
    }

    #[test]
    fn reconcile_grows_spaces_when_sa_available() {
        let mut state = State::default();
        state.displays.set_active_list(vec![DisplayId(1)]);
        let adapter = MockAdapter::new();
        adapter.add_display(DisplayId(1), vec![SpaceId(1)]);
        adapter.set_sa_available(true);
        let targets = vec![
            Target { label: "a".into(), display: DisplayId(1) },
            Target { label: "b".into(), display: DisplayId(1) },
        ];
        reconcile_space_counts(&mut state, &adapter, &targets);
        assert_eq!(adapter.get_spaces_for_display(DisplayId(1)).len(), 2);
    }
}
