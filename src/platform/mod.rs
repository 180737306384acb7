//! The boundary between the reconciler and the host window server. Every
//! platform round-trip goes through [`PlatformAdapter`]; every external
//! occurrence (a callback, a socket accept, a signal) is represented as a
//! [`PlatformEvent`] pushed onto the reconciler's queues rather than
//! handled inline at the call site.

pub mod mock;

#[cfg(target_os = "macos")]
pub mod mac;

use crate::common::config::{Config, Layer};
use crate::geometry::{Point, Rect};
use crate::model::ids::{AxHandle, DisplayId, Pid, SpaceId, WindowId};

/// One externally observed occurrence. Platform callbacks and the signal
/// handler construct these and push them straight onto a queue; no layout
/// or map walk happens at the call site — that discipline is what keeps
/// the dirty reconciler the single place state actually changes.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    AppLaunched { pid: Pid },
    AppTerminated { pid: Pid },
    AppHidden { pid: Pid },
    AppShown { pid: Pid },
    WindowFocusChanged { pid: Pid },
    DisplaysChanged,
    /// Carries the already-parsed, already-validated config: the
    /// reconciler never touches the filesystem itself (see
    /// [`crate::common::config_watcher`]).
    ConfigChanged(Box<Config>),
}

/// Blocking RPC-like calls into the host window server. Implementations
/// must never block the loop thread for longer than a single host round
/// trip; retries and settle-delays are the reconciler's responsibility,
/// not the adapter's.
pub trait PlatformAdapter {
    fn get_active_display_list(&self) -> Vec<DisplayId>;
    fn get_display_frame(&self, display: DisplayId) -> Rect;
    fn get_spaces_for_display(&self, display: DisplayId) -> Vec<SpaceId>;
    fn get_current_space(&self, display: DisplayId) -> Option<SpaceId>;
    fn get_window_space(&self, window: WindowId) -> Option<SpaceId>;
    fn get_window_frame(&self, window: WindowId) -> Option<Rect>;
    /// The window's title, used only by the `--windows` query surface.
    /// `None` if the window no longer exists or the title is unset.
    fn window_title(&self, window: WindowId) -> Option<String>;
    fn set_window_frame(&self, window: WindowId, frame: Rect) -> crate::error::Result<()>;
    fn move_window_to_space(&self, window: WindowId, space: SpaceId) -> crate::error::Result<()>;
    fn find_window_under_point(&self, point: Point) -> Option<(WindowId, Pid)>;

    fn focus_window(&self, window: WindowId) -> crate::error::Result<()>;
    fn focus_space(&self, space: SpaceId) -> crate::error::Result<()>;

    fn enable_event_tap(&self) -> crate::error::Result<()>;
    fn disable_event_tap(&self) -> crate::error::Result<()>;

    fn subscribe_observer(&self, pid: Pid) -> crate::error::Result<AxHandle>;
    fn unsubscribe_observer(&self, handle: AxHandle) -> crate::error::Result<()>;

    /// Running application pids eligible for accessibility tracking, used
    /// by the sync planner's app scan.
    fn list_running_apps(&self) -> Vec<Pid>;
    fn list_windows_for_app(&self, pid: Pid) -> Vec<WindowId>;
    /// The app's display name, used by the rule engine to match
    /// `app_name_pattern`. `None` if the pid is no longer running.
    fn app_name(&self, pid: Pid) -> Option<String>;

    /// Blocks the calling thread on the host run loop for up to `timeout`,
    /// delivering any callbacks that arrive in that window, and returns
    /// the [`PlatformEvent`]s those callbacks queued. This is the single
    /// suspension point the reconciler driver loops on.
    fn run_once(&self, timeout: std::time::Duration) -> Vec<PlatformEvent>;
}

/// The best-effort scripting-addition channel: operations the host's
/// public API does not expose. Callers must check [`SaChannel::is_available`]
/// first and fail with `sa_not_loaded` rather than retry.
pub trait SaChannel {
    fn is_available(&self) -> bool;
    fn create_space(&self, ref_space: SpaceId) -> crate::error::Result<Option<SpaceId>>;
    fn destroy_space(&self, space: SpaceId) -> crate::error::Result<()>;
    fn move_space_after(
        &self,
        src: SpaceId,
        dst: SpaceId,
        fallback: SpaceId,
        preserve_focus: bool,
    ) -> crate::error::Result<()>;
    fn focus_space(&self, space: SpaceId) -> crate::error::Result<()>;
    fn set_window_opacity(&self, window: WindowId, opacity: f64) -> crate::error::Result<()>;
    fn set_window_shadow(&self, window: WindowId, shadow: bool) -> crate::error::Result<()>;
    fn set_window_sticky(&self, window: WindowId, sticky: bool) -> crate::error::Result<()>;
    fn set_window_layer(&self, window: WindowId, layer: Layer) -> crate::error::Result<()>;
}
