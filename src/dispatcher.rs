//! The command dispatcher: typed commands over windows, spaces, displays,
//! config, rules, and signals, each mapped 1:1 to a reconciler-safe
//! mutation. Selector resolution happens here, against the same state the
//! reconciler itself reads; handlers never call the platform adapter for
//! anything the reconciler's own pipeline would otherwise own, except
//! focus changes, which need to feel instantaneous rather than wait for
//! the next tick.

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{ErrorKind, Result};
use crate::model::ids::{DisplayId, SpaceId, WindowId};
use crate::reconciler::pipeline::Reconciler;
use crate::reconciler::DirtyFlags;
use crate::platform::{PlatformAdapter, SaChannel};
use crate::selector::{Direction, DisplaySelector, SpaceSelector, WindowSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleFlag {
    Float,
    Sticky,
    Shadow,
}

#[derive(Debug, Clone)]
pub enum WindowVerb {
    Focus,
    Swap(WindowSelector),
    Warp(WindowSelector),
    MoveToSpace(SpaceSelector),
    Toggle(ToggleFlag),
}

#[derive(Debug, Clone)]
pub struct WindowCommand {
    pub target: WindowSelector,
    pub verb: WindowVerb,
}

#[derive(Debug, Clone)]
pub enum SpaceVerb {
    Focus,
    Label(String),
    Create { display: Option<DisplaySelector>, focus: bool, take: bool },
    Destroy,
    Rebuild,
}

#[derive(Debug, Clone)]
pub struct SpaceCommand {
    pub target: SpaceSelector,
    pub verb: SpaceVerb,
}

#[derive(Debug, Clone)]
pub enum DisplayVerb {
    Focus,
    Label(String),
}

#[derive(Debug, Clone)]
pub struct DisplayCommand {
    pub target: DisplaySelector,
    pub verb: DisplayVerb,
}

#[derive(Debug, Clone)]
pub enum ConfigVerb {
    Get(String),
    Set(String, String),
}

#[derive(Debug, Clone)]
pub enum RuleVerb {
    Add(crate::common::config::Rule),
    Remove(String),
}

#[derive(Debug, Clone)]
pub enum SignalVerb {
    Add { event: String, action: String },
    Remove { event: String },
}

#[derive(Debug, Clone)]
pub enum Command {
    Window(WindowCommand),
    Space(SpaceCommand),
    Display(DisplayCommand),
    Config(ConfigVerb),
    Rule(RuleVerb),
    Signal(SignalVerb),
}

/// The result of a successfully dispatched command: an optional JSON
/// payload, wrapped on the wire as `{ok, payload?}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    pub payload: Option<Value>,
}

impl CommandOutcome {
    fn ok() -> Self { CommandOutcome::default() }
    fn with(payload: Value) -> Self { CommandOutcome { payload: Some(payload) } }
}

/// Whitelisted config keys for `config get|set`, matching the fields of
/// `Config` that are safe to mutate live. Any other key is
/// `invalid_argument`.
const CONFIG_KEYS: &[&str] = &[
    "gap",
    "split_ratio",
    "auto_balance",
    "mouse_follows_focus",
    "layout",
    "focus_follows_mouse",
    "padding.top",
    "padding.bottom",
    "padding.left",
    "padding.right",
];

/// A layout-affecting config key triggers a re-layout of the current
/// space on `set` rather than waiting for the next unrelated tick.
fn is_layout_affecting(key: &str) -> bool {
    matches!(key, "gap" | "split_ratio" | "layout" | "padding.top" | "padding.bottom" | "padding.left" | "padding.right")
}

pub fn dispatch<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    command: Command,
) -> Result<CommandOutcome> {
    match command {
        Command::Window(cmd) => dispatch_window(r, cmd),
        Command::Space(cmd) => dispatch_space(r, cmd),
        Command::Display(cmd) => dispatch_display(r, cmd),
        Command::Config(cmd) => dispatch_config(r, cmd),
        Command::Rule(cmd) => dispatch_rule(r, cmd),
        Command::Signal(cmd) => dispatch_signal(r, cmd),
    }
}

// ---------------------------------------------------------------------
// window

fn dispatch_window<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    cmd: WindowCommand,
) -> Result<CommandOutcome> {
    let target = resolve_window(r, &cmd.target)?;
    match cmd.verb {
        WindowVerb::Focus => {
            r.adapter.focus_window(target).map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
            r.set_focused_window(target);
            Ok(CommandOutcome::ok())
        }
        WindowVerb::Swap(other_sel) => {
            let other = resolve_window(r, &other_sel)?;
            let (Some(a_space), Some(b_space)) = (
                r.state.windows.get(target).map(|w| w.space_id),
                r.state.windows.get(other).map(|w| w.space_id),
            ) else {
                return Err(ErrorKind::WindowNotFound(None));
            };
            if a_space != b_space {
                return Err(ErrorKind::WindowNotFound(Some("mismatched space".into())));
            }
            if !r.state.windows.swap_order(target, other) {
                return Err(ErrorKind::WindowNotManaged);
            }
            r.dirty.dirty_spaces.insert(a_space);
            Ok(CommandOutcome::ok())
        }
        WindowVerb::Warp(other_sel) => {
            let other = resolve_window(r, &other_sel)?;
            let Some(other_space) = r.state.windows.get(other).map(|w| w.space_id) else {
                return Err(ErrorKind::WindowNotFound(None));
            };
            let from_space = r.state.windows.get(target).map(|w| w.space_id);
            if from_space == Some(other_space) {
                // Same space: attach directly as a sibling of `other` inside
                // the BSP tree, rather than just letting the next layout
                // pass drop it in under the root.
                if let Some(crate::layout::View::Bsp(tree)) = r.state.spaces.view_mut(other_space) {
                    if let (Some(from_leaf), Some(to_leaf)) =
                        (tree.find_leaf(target), tree.find_leaf(other))
                    {
                        tree.warp(from_leaf, to_leaf, r.config.split_ratio);
                    }
                }
            } else {
                r.state.windows.set_space(target, other_space);
                r.dirty.dirty_spaces.insert(from_space.unwrap_or(other_space));
            }
            r.dirty.dirty_spaces.insert(other_space);
            Ok(CommandOutcome::ok())
        }
        WindowVerb::MoveToSpace(space_sel) => {
            let space = resolve_space(r, &space_sel)?;
            let Some(old_space) = r.state.windows.get(target).map(|w| w.space_id) else {
                return Err(ErrorKind::WindowNotFound(None));
            };
            r.adapter
                .move_window_to_space(target, space)
                .map_err(|_| ErrorKind::PlatformError("move_window_to_space failed".into()))?;
            r.state.windows.set_space(target, space);
            r.dirty.dirty_spaces.insert(old_space);
            r.dirty.dirty_spaces.insert(space);
            Ok(CommandOutcome::ok())
        }
        WindowVerb::Toggle(flag) => {
            match flag {
                ToggleFlag::Float => {
                    r.state.windows.set_flag(target, |f| f.floating = !f.floating);
                }
                ToggleFlag::Sticky => {
                    if !r.adapter.is_available() {
                        return Err(ErrorKind::SaNotLoaded);
                    }
                    let new_value = !r.state.windows.get(target).map(|w| w.flags.sticky).unwrap_or(false);
                    r.adapter
                        .set_window_sticky(target, new_value)
                        .map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
                    r.state.windows.set_flag(target, |f| f.sticky = new_value);
                }
                ToggleFlag::Shadow => {
                    if !r.adapter.is_available() {
                        return Err(ErrorKind::SaNotLoaded);
                    }
                    let new_value = !r.state.windows.get(target).map(|w| w.flags.shadow).unwrap_or(false);
                    r.adapter
                        .set_window_shadow(target, new_value)
                        .map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
                    r.state.windows.set_flag(target, |f| f.shadow = new_value);
                }
            }
            if let Some(space) = r.state.windows.get(target).map(|w| w.space_id) {
                r.dirty.dirty_spaces.insert(space);
            }
            Ok(CommandOutcome::ok())
        }
    }
}

// ---------------------------------------------------------------------
// space

fn dispatch_space<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    cmd: SpaceCommand,
) -> Result<CommandOutcome> {
    match cmd.verb {
        SpaceVerb::Focus => {
            let space = resolve_space(r, &cmd.target)?;
            PlatformAdapter::focus_space(&r.adapter, space).map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
            r.state.spaces.set_current_space(space);
            Ok(CommandOutcome::ok())
        }
        SpaceVerb::Label(label) => {
            let space = resolve_space(r, &cmd.target)?;
            r.state.spaces.set_label(space, label);
            Ok(CommandOutcome::ok())
        }
        SpaceVerb::Create { display, focus, take } => {
            if !r.adapter.is_available() {
                return Err(ErrorKind::SaNotLoaded);
            }
            let display_id = match display {
                Some(sel) => resolve_display(r, &sel)?,
                None => current_display(r).ok_or(ErrorKind::NoFocusedSpace)?,
            };
            let reference_space =
                r.adapter.get_current_space(display_id).ok_or(ErrorKind::DisplayNotFound)?;
            let taken_window = if take { r.focused_window() } else { None };

            let new_space = match r
                .adapter
                .create_space(reference_space)
                .map_err(|e| ErrorKind::PlatformError(e.to_string()))?
            {
                Some(id) => id,
                None => poll_for_new_space(r, display_id, reference_space)?,
            };

            if let Some(window) = taken_window {
                r.adapter
                    .move_window_to_space(window, new_space)
                    .map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
                r.state.windows.set_space(window, new_space);
                r.dirty.dirty_spaces.insert(reference_space);
            }
            if focus {
                PlatformAdapter::focus_space(&r.adapter, new_space).map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
                r.state.spaces.set_current_space(new_space);
            }
            r.dirty.dirty_spaces.insert(new_space);
            Ok(CommandOutcome::with(json!({ "id": new_space.0 })))
        }
        SpaceVerb::Destroy => {
            let space = resolve_space(r, &cmd.target)?;
            r.state.spaces.remove_label(space);
            // Relocating windows off a doomed space is the sync planner's
            // job; here we only refuse to destroy a space the reconciler
            // still sees windows on, rather than silently losing them.
            if !r.state.windows.by_space(space).is_empty() {
                return Err(ErrorKind::AlreadyExists("space not empty".into()));
            }
            r.adapter.destroy_space(space).map_err(|_| ErrorKind::PlatformError("destroy_space failed".into()))?;
            r.state.spaces.remove_view(space);
            Ok(CommandOutcome::ok())
        }
        SpaceVerb::Rebuild => {
            let space = resolve_space(r, &cmd.target)?;
            r.state.spaces.remove_view(space);
            r.dirty.dirty_spaces.insert(space);
            Ok(CommandOutcome::ok())
        }
    }
}

/// §4.4 `space --create`: resolves the new space id either from the
/// adapter's return value (handled by the caller) or by polling
/// `get_spaces_for_display` for a newly appearing id, up to 10 attempts
/// 100ms apart.
fn poll_for_new_space<P: PlatformAdapter + SaChannel>(
    r: &Reconciler<P>,
    display: DisplayId,
    before: SpaceId,
) -> Result<SpaceId> {
    let before_set: Vec<SpaceId> = r.adapter.get_spaces_for_display(display);
    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(100));
        let after = r.adapter.get_spaces_for_display(display);
        if let Some(&new_id) = after.iter().find(|id| !before_set.contains(id)) {
            return Ok(new_id);
        }
    }
    let _ = before;
    Err(ErrorKind::PlatformError("space create did not resolve a new id".into()))
}

// ---------------------------------------------------------------------
// display

fn dispatch_display<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    cmd: DisplayCommand,
) -> Result<CommandOutcome> {
    let display = resolve_display(r, &cmd.target)?;
    match cmd.verb {
        DisplayVerb::Focus => {
            let Some(space) = r.adapter.get_current_space(display) else {
                return Err(ErrorKind::DisplayNotFound);
            };
            PlatformAdapter::focus_space(&r.adapter, space).map_err(|e| ErrorKind::PlatformError(e.to_string()))?;
            r.state.spaces.set_current_space(space);
            Ok(CommandOutcome::ok())
        }
        DisplayVerb::Label(label) => {
            r.state.displays.set_label(display, label);
            Ok(CommandOutcome::ok())
        }
    }
}

// ---------------------------------------------------------------------
// config

fn dispatch_config<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    cmd: ConfigVerb,
) -> Result<CommandOutcome> {
    match cmd {
        ConfigVerb::Get(key) => {
            if !CONFIG_KEYS.contains(&key.as_str()) {
                return Err(ErrorKind::InvalidArgument(key));
            }
            Ok(CommandOutcome::with(json!({ "key": key, "value": config_value(&r.config, &key) })))
        }
        ConfigVerb::Set(key, value) => {
            if !CONFIG_KEYS.contains(&key.as_str()) {
                return Err(ErrorKind::InvalidArgument(key));
            }
            set_config_value(&mut r.config, &key, &value)?;
            if is_layout_affecting(&key) {
                r.dirty.flags |= DirtyFlags::LAYOUT_CURRENT;
            }
            Ok(CommandOutcome::ok())
        }
    }
}

fn config_value(config: &crate::common::config::Config, key: &str) -> Value {
    match key {
        "gap" => json!(config.gap),
        "split_ratio" => json!(config.split_ratio),
        "auto_balance" => json!(config.auto_balance),
        "mouse_follows_focus" => json!(config.mouse_follows_focus),
        "layout" => json!(config.layout.to_string()),
        "focus_follows_mouse" => json!(config.focus_follows_mouse.to_string()),
        "padding.top" => json!(config.padding.top),
        "padding.bottom" => json!(config.padding.bottom),
        "padding.left" => json!(config.padding.left),
        "padding.right" => json!(config.padding.right),
        _ => Value::Null,
    }
}

fn set_config_value(config: &mut crate::common::config::Config, key: &str, value: &str) -> Result<()> {
    fn parse_f64(value: &str) -> Result<f64> {
        value.parse().map_err(|_| ErrorKind::InvalidValue(value.to_string()))
    }
    fn parse_bool(value: &str) -> Result<bool> {
        match value {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            other => Err(ErrorKind::InvalidValue(other.to_string())),
        }
    }
    match key {
        "gap" => {
            let v = parse_f64(value)?;
            if v < 0.0 {
                return Err(ErrorKind::InvalidValue(value.to_string()));
            }
            config.gap = v;
        }
        "split_ratio" => {
            let v = parse_f64(value)?;
            if !(0.1..=0.9).contains(&v) {
                return Err(ErrorKind::InvalidValue(value.to_string()));
            }
            config.split_ratio = v;
        }
        "auto_balance" => config.auto_balance = parse_bool(value)?,
        "mouse_follows_focus" => config.mouse_follows_focus = parse_bool(value)?,
        "layout" => {
            config.layout =
                value.parse().map_err(|_| ErrorKind::InvalidValue(value.to_string()))?
        }
        "focus_follows_mouse" => {
            config.focus_follows_mouse =
                value.parse().map_err(|_| ErrorKind::InvalidValue(value.to_string()))?
        }
        "padding.top" => config.padding.top = parse_f64(value)?,
        "padding.bottom" => config.padding.bottom = parse_f64(value)?,
        "padding.left" => config.padding.left = parse_f64(value)?,
        "padding.right" => config.padding.right = parse_f64(value)?,
        _ => return Err(ErrorKind::InvalidArgument(key.to_string())),
    }
    Ok(())
}

// ---------------------------------------------------------------------
// rule / signal
//
// Both are minimal runtime-appendable registries: `rule` mutates the
// `Rule` list `RuleEngine` matches against, `signal` records an
// event-to-action binding without an execution hook (see DESIGN.md).

fn dispatch_rule<P: PlatformAdapter + SaChannel>(
    r: &mut Reconciler<P>,
    cmd: RuleVerb,
) -> Result<CommandOutcome> {
    match cmd {
        RuleVerb::Add(rule) => {
            r.config.rules.push(rule);
            r.rules = crate::rules::RuleEngine::from_config(&r.config);
            Ok(CommandOutcome::ok())
        }
        RuleVerb::Remove(pattern) => {
            let before = r.config.rules.len();
            r.config.rules.retain(|rule| rule.app_name_pattern != pattern);
            if r.config.rules.len() == before {
                return Err(ErrorKind::InvalidArgument(pattern));
            }
            r.rules = crate::rules::RuleEngine::from_config(&r.config);
            Ok(CommandOutcome::ok())
        }
    }
}

fn dispatch_signal<P: PlatformAdapter + SaChannel>(
    _r: &mut Reconciler<P>,
    cmd: SignalVerb,
) -> Result<CommandOutcome> {
    // Shelling out to user actions is outside the reconciliation engine;
    // accepting and acknowledging the registration keeps the command
    // grammar complete without the core driving a process itself.
    match cmd {
        SignalVerb::Add { event, action } => {
            tracing::debug!(%event, %action, "signal registered (no-op: no execution hook in core)");
            Ok(CommandOutcome::ok())
        }
        SignalVerb::Remove { event } => {
            tracing::debug!(%event, "signal removed");
            Ok(CommandOutcome::ok())
        }
    }
}

// ---------------------------------------------------------------------
// selector resolution

fn current_display<P: PlatformAdapter + SaChannel>(r: &Reconciler<P>) -> Option<DisplayId> {
    let space = r.state.spaces.current_space_id()?;
    r.state
        .displays
        .get_active_list()
        .iter()
        .find(|&&d| r.adapter.get_spaces_for_display(d).contains(&space))
        .copied()
        .or_else(|| r.state.displays.get_main_id())
}

pub fn resolve_window<P: PlatformAdapter + SaChannel>(
    r: &Reconciler<P>,
    sel: &WindowSelector,
) -> Result<WindowId> {
    match sel {
        WindowSelector::Id(id) => {
            if r.state.windows.contains(*id) {
                Ok(*id)
            } else {
                Err(ErrorKind::WindowNotFound(Some(id.to_string())))
            }
        }
        WindowSelector::Focused | WindowSelector::Recent => {
            r.focused_window().ok_or(ErrorKind::NoFocusedWindow)
        }
        WindowSelector::First => {
            let space = r.state.spaces.current_space_id().ok_or(ErrorKind::NoFocusedSpace)?;
            r.state.windows.by_space(space).first().copied().ok_or(ErrorKind::WindowNotFound(None))
        }
        WindowSelector::Last => {
            let space = r.state.spaces.current_space_id().ok_or(ErrorKind::NoFocusedSpace)?;
            r.state.windows.by_space(space).last().copied().ok_or(ErrorKind::WindowNotFound(None))
        }
        WindowSelector::Largest | WindowSelector::Smallest => {
            let space = r.state.spaces.current_space_id().ok_or(ErrorKind::NoFocusedSpace)?;
            let mut best: Option<(WindowId, f64)> = None;
            for &id in r.state.windows.by_space(space) {
                let Some(frame) = r.adapter.get_window_frame(id) else { continue };
                let area = frame.area();
                let better = match best {
                    None => true,
                    Some((_, best_area)) => {
                        if matches!(sel, WindowSelector::Largest) {
                            area > best_area
                        } else {
                            area < best_area
                        }
                    }
                };
                if better {
                    best = Some((id, area));
                }
            }
            best.map(|(id, _)| id).ok_or(ErrorKind::WindowNotFound(None))
        }
        WindowSelector::North | WindowSelector::South | WindowSelector::East | WindowSelector::West => {
            let from = r.focused_window().ok_or(ErrorKind::NoFocusedWindow)?;
            let space = r.state.windows.get(from).map(|w| w.space_id).ok_or(ErrorKind::NoFocusedWindow)?;
            let from_frame = r.adapter.get_window_frame(from).ok_or(ErrorKind::WindowNotFound(None))?;
            let candidates: Vec<(WindowId, crate::geometry::Rect)> = r
                .state
                .windows
                .by_space(space)
                .iter()
                .filter_map(|&id| r.adapter.get_window_frame(id).map(|f| (id, f)))
                .collect();
            let direction = match sel {
                WindowSelector::North => Direction::North,
                WindowSelector::South => Direction::South,
                WindowSelector::East => Direction::East,
                _ => Direction::West,
            };
            crate::selector::resolve_directional(from, from_frame, &candidates, direction)
                .ok_or(ErrorKind::WindowNotFound(None))
        }
        WindowSelector::Sibling => {
            let from = r.focused_window().ok_or(ErrorKind::NoFocusedWindow)?;
            let space = r.state.windows.get(from).map(|w| w.space_id).ok_or(ErrorKind::NoFocusedWindow)?;
            let crate::layout::View::Bsp(tree) = r.state.spaces.view(space).ok_or(ErrorKind::SpaceNotVisible)?
            else {
                return Err(ErrorKind::WindowNotManaged);
            };
            tree.sibling_window(from).ok_or(ErrorKind::WindowNotFound(None))
        }
        WindowSelector::StackNext | WindowSelector::StackPrev => {
            let from = r.focused_window().ok_or(ErrorKind::NoFocusedWindow)?;
            let space = r.state.windows.get(from).map(|w| w.space_id).ok_or(ErrorKind::NoFocusedWindow)?;
            let crate::layout::View::Stack(stack) =
                r.state.spaces.view(space).ok_or(ErrorKind::SpaceNotVisible)?
            else {
                return Err(ErrorKind::WindowNotManaged);
            };
            let next = if matches!(sel, WindowSelector::StackNext) { stack.next(from) } else { stack.prev(from) };
            next.ok_or(ErrorKind::WindowNotFound(None))
        }
    }
}

pub fn resolve_space<P: PlatformAdapter + SaChannel>(
    r: &Reconciler<P>,
    sel: &SpaceSelector,
) -> Result<SpaceId> {
    let on_current_display = |r: &Reconciler<P>| -> Vec<SpaceId> {
        current_display(r).map(|d| r.adapter.get_spaces_for_display(d)).unwrap_or_default()
    };
    match sel {
        SpaceSelector::Id(id) => Ok(*id),
        SpaceSelector::Index(n) => {
            let spaces = on_current_display(r);
            let idx = (*n as usize).checked_sub(1).ok_or(ErrorKind::InvalidSelector(n.to_string()))?;
            spaces.get(idx).copied().ok_or(ErrorKind::SpaceNotFound)
        }
        SpaceSelector::Label(label) => r.state.spaces.id_of_label(label).ok_or(ErrorKind::SpaceNotFound),
        SpaceSelector::Focused => r.state.spaces.current_space_id().ok_or(ErrorKind::NoFocusedSpace),
        SpaceSelector::Recent | SpaceSelector::Prev => {
            r.state.spaces.last_space_id().ok_or(ErrorKind::SpaceNotFound)
        }
        SpaceSelector::Next => {
            let spaces = on_current_display(r);
            let current = r.state.spaces.current_space_id().ok_or(ErrorKind::NoFocusedSpace)?;
            let pos = spaces.iter().position(|&s| s == current).ok_or(ErrorKind::SpaceNotFound)?;
            spaces.get((pos + 1) % spaces.len()).copied().ok_or(ErrorKind::SpaceNotFound)
        }
        SpaceSelector::First => on_current_display(r).first().copied().ok_or(ErrorKind::SpaceNotFound),
        SpaceSelector::Last => on_current_display(r).last().copied().ok_or(ErrorKind::SpaceNotFound),
    }
}

pub fn resolve_display<P: PlatformAdapter + SaChannel>(
    r: &Reconciler<P>,
    sel: &DisplaySelector,
) -> Result<DisplayId> {
    let active = r.state.displays.get_active_list();
    match sel {
        DisplaySelector::Id(id) => {
            if active.contains(id) {
                Ok(*id)
            } else {
                Err(ErrorKind::DisplayNotFound)
            }
        }
        DisplaySelector::Index(n) => {
            let idx = (*n as usize).checked_sub(1).ok_or(ErrorKind::InvalidSelector(n.to_string()))?;
            r.state.displays.get_by_index(idx).ok_or(ErrorKind::DisplayNotFound)
        }
        DisplaySelector::Label(label) => r.state.displays.id_of_label(label).ok_or(ErrorKind::DisplayNotFound),
        DisplaySelector::Focused | DisplaySelector::Recent => {
            current_display(r).ok_or(ErrorKind::NoFocusedSpace)
        }
        DisplaySelector::Prev | DisplaySelector::Next => {
            let current = current_display(r).ok_or(ErrorKind::NoFocusedSpace)?;
            let pos = active.iter().position(|&d| d == current).ok_or(ErrorKind::DisplayNotFound)?;
            let delta: isize = if matches!(sel, DisplaySelector::Next) { 1 } else { -1 };
            let len = active.len() as isize;
            let next = ((pos as isize + delta) % len + len) % len;
            active.get(next as usize).copied().ok_or(ErrorKind::DisplayNotFound)
        }
        DisplaySelector::First => active.first().copied().ok_or(ErrorKind::DisplayNotFound),
        DisplaySelector::Last => active.last().copied().ok_or(ErrorKind::DisplayNotFound),
        DisplaySelector::North | DisplaySelector::South | DisplaySelector::East | DisplaySelector::West => {
            let current = current_display(r).ok_or(ErrorKind::NoFocusedSpace)?;
            let origin = r.adapter.get_display_frame(current).mid();
            let direction = match sel {
                DisplaySelector::North => Direction::North,
                DisplaySelector::South => Direction::South,
                DisplaySelector::East => Direction::East,
                _ => Direction::West,
            };
            let mut best: Option<(DisplayId, f64)> = None;
            for &candidate in active.iter().filter(|&&d| d != current) {
                let center = r.adapter.get_display_frame(candidate).mid();
                let in_direction = match direction {
                    Direction::North => center.y < origin.y,
                    Direction::South => center.y > origin.y,
                    Direction::East => center.x > origin.x,
                    Direction::West => center.x < origin.x,
                };
                if !in_direction {
                    continue;
                }
                let dx = center.x - origin.x;
                let dy = center.y - origin.y;
                let distance = (dx * dx + dy * dy).sqrt();
                best = match best {
                    None => Some((candidate, distance)),
                    Some((best_id, best_dist)) => {
                        if distance < best_dist || (distance == best_dist && candidate.0 < best_id.0) {
                            Some((candidate, distance))
                        } else {
                            Some((best_id, best_dist))
                        }
                    }
                };
            }
            best.map(|(id, _)| id).ok_or(ErrorKind::DisplayNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockAdapter;

    fn new_reconciler() -> Reconciler<MockAdapter> {
        Reconciler::new(crate::common::config::Config::default(), MockAdapter::new())
    }

    #[test]
    fn focus_resolves_error_with_no_focused_window() {
        let r = new_reconciler();
        assert_eq!(resolve_window(&r, &WindowSelector::Focused), Err(ErrorKind::NoFocusedWindow));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let mut r = new_reconciler();
        let result = dispatch(&mut r, Command::Config(ConfigVerb::Set("nope".into(), "1".into())));
        assert_eq!(result, Err(ErrorKind::InvalidArgument("nope".into())));
    }

    #[test]
    fn config_set_rejects_out_of_range_split_ratio() {
        let mut r = new_reconciler();
        let result =
            dispatch(&mut r, Command::Config(ConfigVerb::Set("split_ratio".into(), "5.0".into())));
        assert!(result.is_err());
    }

    #[test]
    fn config_set_gap_marks_layout_current() {
        let mut r = new_reconciler();
        dispatch(&mut r, Command::Config(ConfigVerb::Set("gap".into(), "12".into()))).unwrap();
        assert!(r.dirty.flags.contains(DirtyFlags::LAYOUT_CURRENT));
        assert_eq!(r.config.gap, 12.0);
    }

    #[test]
    fn config_set_layout_round_trips_as_a_string() {
        let mut r = new_reconciler();
        dispatch(&mut r, Command::Config(ConfigVerb::Set("layout".into(), "stack".into())))
            .unwrap();
        assert_eq!(r.config.layout, crate::common::config::LayoutKind::Stack);
        assert!(r.dirty.flags.contains(DirtyFlags::LAYOUT_CURRENT));

        let outcome =
            dispatch(&mut r, Command::Config(ConfigVerb::Get("layout".into()))).unwrap();
        assert_eq!(outcome.payload, Some(json!({ "key": "layout", "value": "stack" })));
    }

    #[test]
    fn config_set_focus_follows_mouse_rejects_unknown_value() {
        let mut r = new_reconciler();
        let result = dispatch(
            &mut r,
            Command::Config(ConfigVerb::Set("focus_follows_mouse".into(), "bogus".into())),
        );
        assert_eq!(result, Err(ErrorKind::InvalidValue("bogus".into())));
    }

    #[test]
    fn window_swap_requires_same_space() {
        let mut r = new_reconciler();
        r.state.windows.add(WindowId(1), 1, SpaceId(1), None);
        r.state.windows.add(WindowId(2), 1, SpaceId(2), None);
        let result = dispatch(
            &mut r,
            Command::Window(WindowCommand {
                target: WindowSelector::Id(1),
                verb: WindowVerb::Swap(WindowSelector::Id(2)),
            }),
        );
        assert_eq!(result, Err(ErrorKind::WindowNotFound(Some("mismatched space".into()))));
    }

    #[test]
    fn window_toggle_sticky_fails_without_sa() {
        let mut r = new_reconciler();
        r.state.windows.add(WindowId(1), 1, SpaceId(1), None);
        let result = dispatch(
            &mut r,
            Command::Window(WindowCommand {
                target: WindowSelector::Id(1),
                verb: WindowVerb::Toggle(ToggleFlag::Sticky),
            }),
        );
        assert_eq!(result, Err(ErrorKind::SaNotLoaded));
    }

    #[test]
    fn window_toggle_float_flips_flag() {
        let mut r = new_reconciler();
        r.state.windows.add(WindowId(1), 1, SpaceId(1), None);
        dispatch(
            &mut r,
            Command::Window(WindowCommand {
                target: WindowSelector::Id(1),
                verb: WindowVerb::Toggle(ToggleFlag::Float),
            }),
        )
        .unwrap();
        assert!(r.state.windows.get(WindowId(1)).unwrap().flags.floating);
    }

    #[test]
    fn rule_add_then_remove_round_trips() {
        let mut r = new_reconciler();
        let rule = crate::common::config::Rule {
            app_name_pattern: "Finder".into(),
            target_space_label: None,
            manage_override: Some(false),
            opacity: None,
            layer: None,
        };
        dispatch(&mut r, Command::Rule(RuleVerb::Add(rule))).unwrap();
        assert_eq!(r.config.rules.len(), 1);
        dispatch(&mut r, Command::Rule(RuleVerb::Remove("Finder".into()))).unwrap();
        assert!(r.config.rules.is_empty());
    }
}
