//! An in-memory [`PlatformAdapter`]/[`SaChannel`] pair for reconciler and
//! sync-planner tests. All state lives behind `RefCell`s since the trait
//! takes `&self` to mirror the real adapter's shared-handle shape.

use std::cell::RefCell;

use crate::common::collections::HashMap;
use crate::common::config::Layer;
use crate::error::{ErrorKind, Result};
use crate::geometry::{Point, Rect};
use crate::model::ids::{AxHandle, DisplayId, Pid, SpaceId, WindowId};
use crate::platform::{PlatformAdapter, PlatformEvent, SaChannel};

#[derive(Debug, Default)]
struct MockState {
    displays: Vec<DisplayId>,
    display_frames: HashMap<DisplayId, Rect>,
    spaces_by_display: HashMap<DisplayId, Vec<SpaceId>>,
    current_space_by_display: HashMap<DisplayId, SpaceId>,
    window_space: HashMap<WindowId, SpaceId>,
    window_frame: HashMap<WindowId, Rect>,
    window_title: HashMap<WindowId, String>,
    apps: HashMap<Pid, Vec<WindowId>>,
    app_names: HashMap<Pid, String>,
    next_ax_handle: u64,
    sa_available: bool,
    opacity: HashMap<WindowId, f64>,
    shadow: HashMap<WindowId, bool>,
    sticky: HashMap<WindowId, bool>,
    layer: HashMap<WindowId, Layer>,
    event_tap_enabled: bool,
    pending_events: Vec<PlatformEvent>,
}

#[derive(Debug, Default)]
pub struct MockAdapter {
    state: RefCell<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self { Self::default() }

    pub fn add_display(&self, id: DisplayId, spaces: Vec<SpaceId>) {
        let mut s = self.state.borrow_mut();
        s.displays.push(id);
        if let Some(&first) = spaces.first() {
            s.current_space_by_display.insert(id, first);
        }
        s.spaces_by_display.insert(id, spaces);
        s.display_frames.entry(id).or_insert(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    pub fn set_display_frame(&self, id: DisplayId, frame: Rect) {
        self.state.borrow_mut().display_frames.insert(id, frame);
    }

    pub fn add_window(&self, window: WindowId, pid: Pid, space: SpaceId, frame: Rect) {
        let mut s = self.state.borrow_mut();
        s.apps.entry(pid).or_default().push(window);
        s.window_space.insert(window, space);
        s.window_frame.insert(window, frame);
    }

    pub fn set_window_title(&self, window: WindowId, title: impl Into<String>) {
        self.state.borrow_mut().window_title.insert(window, title.into());
    }

    pub fn set_app_name(&self, pid: Pid, name: impl Into<String>) {
        self.state.borrow_mut().app_names.insert(pid, name.into());
    }

    pub fn set_current_space(&self, display: DisplayId, space: SpaceId) {
        self.state.borrow_mut().current_space_by_display.insert(display, space);
    }

    pub fn add_space_to_display(&self, display: DisplayId, space: SpaceId) {
        self.state.borrow_mut().spaces_by_display.entry(display).or_default().push(space);
    }

    pub fn set_sa_available(&self, available: bool) {
        self.state.borrow_mut().sa_available = available;
    }

    /// Queues an event to be returned by the next `run_once` call,
    /// simulating a platform callback arriving between ticks.
    pub fn queue_event(&self, event: PlatformEvent) {
        self.state.borrow_mut().pending_events.push(event);
    }

    pub fn terminate_app(&self, pid: Pid) -> Vec<WindowId> {
        let mut s = self.state.borrow_mut();
        let windows = s.apps.remove(&pid).unwrap_or_default();
        for w in &windows {
            s.window_space.remove(w);
            s.window_frame.remove(w);
            s.window_title.remove(w);
        }
        windows
    }
}

impl PlatformAdapter for MockAdapter {
    fn get_active_display_list(&self) -> Vec<DisplayId> { self.state.borrow().displays.clone() }

    fn get_display_frame(&self, display: DisplayId) -> Rect {
        self.state.borrow().display_frames.get(&display).copied().unwrap_or(Rect::new(0.0, 0.0, 1920.0, 1080.0))
    }

    fn get_spaces_for_display(&self, display: DisplayId) -> Vec<SpaceId> {
        self.state.borrow().spaces_by_display.get(&display).cloned().unwrap_or_default()
    }

    fn get_current_space(&self, display: DisplayId) -> Option<SpaceId> {
        self.state.borrow().current_space_by_display.get(&display).copied()
    }

    fn get_window_space(&self, window: WindowId) -> Option<SpaceId> {
        self.state.borrow().window_space.get(&window).copied()
    }

    fn get_window_frame(&self, window: WindowId) -> Option<Rect> {
        self.state.borrow().window_frame.get(&window).copied()
    }

    fn window_title(&self, window: WindowId) -> Option<String> {
        self.state.borrow().window_title.get(&window).cloned()
    }

    fn set_window_frame(&self, window: WindowId, frame: Rect) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if !s.window_frame.contains_key(&window) {
            return Err(ErrorKind::WindowNotFound(Some(window.to_string())));
        }
        s.window_frame.insert(window, frame);
        Ok(())
    }

    fn move_window_to_space(&self, window: WindowId, space: SpaceId) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if !s.window_frame.contains_key(&window) {
            return Err(ErrorKind::WindowNotFound(Some(window.to_string())));
        }
        s.window_space.insert(window, space);
        Ok(())
    }

    fn find_window_under_point(&self, point: Point) -> Option<(WindowId, Pid)> {
        let s = self.state.borrow();
        for (&pid, windows) in s.apps.iter() {
            for &w in windows {
                if let Some(frame) = s.window_frame.get(&w) {
                    if frame.contains(point) {
                        return Some((w, pid));
                    }
                }
            }
        }
        None
    }

    fn focus_window(&self, window: WindowId) -> Result<()> {
        if !self.state.borrow().window_frame.contains_key(&window) {
            return Err(ErrorKind::WindowNotFound(Some(window.to_string())));
        }
        Ok(())
    }

    fn focus_space(&self, space: SpaceId) -> Result<()> {
        let mut s = self.state.borrow_mut();
        let display = s
            .spaces_by_display
            .iter()
            .find(|(_, spaces)| spaces.contains(&space))
            .map(|(&d, _)| d)
            .ok_or(ErrorKind::SpaceNotFound)?;
        s.current_space_by_display.insert(display, space);
        Ok(())
    }

    fn enable_event_tap(&self) -> Result<()> {
        self.state.borrow_mut().event_tap_enabled = true;
        Ok(())
    }

    fn disable_event_tap(&self) -> Result<()> {
        self.state.borrow_mut().event_tap_enabled = false;
        Ok(())
    }

    fn subscribe_observer(&self, _pid: Pid) -> Result<AxHandle> {
        let mut s = self.state.borrow_mut();
        let handle = AxHandle(s.next_ax_handle);
        s.next_ax_handle += 1;
        Ok(handle)
    }

    fn unsubscribe_observer(&self, _handle: AxHandle) -> Result<()> { Ok(()) }

    fn list_running_apps(&self) -> Vec<Pid> { self.state.borrow().apps.keys().copied().collect() }

    fn list_windows_for_app(&self, pid: Pid) -> Vec<WindowId> {
        self.state.borrow().apps.get(&pid).cloned().unwrap_or_default()
    }

    fn app_name(&self, pid: Pid) -> Option<String> { self.state.borrow().app_names.get(&pid).cloned() }

    fn run_once(&self, _timeout: std::time::Duration) -> Vec<PlatformEvent> {
        std::mem::take(&mut self.state.borrow_mut().pending_events)
    }
}

impl SaChannel for MockAdapter {
    fn is_available(&self) -> bool { self.state.borrow().sa_available }

    fn create_space(&self, ref_space: SpaceId) -> Result<Option<SpaceId>> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        let mut s = self.state.borrow_mut();
        let display = s
            .spaces_by_display
            .iter()
            .find(|(_, spaces)| spaces.contains(&ref_space))
            .map(|(&d, _)| d)
            .ok_or(ErrorKind::SpaceNotFound)?;
        let new_id = SpaceId(1000 + s.spaces_by_display.values().map(Vec::len).sum::<usize>() as u64);
        s.spaces_by_display.get_mut(&display).unwrap().push(new_id);
        Ok(Some(new_id))
    }

    fn destroy_space(&self, space: SpaceId) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        let mut s = self.state.borrow_mut();
        for spaces in s.spaces_by_display.values_mut() {
            spaces.retain(|&id| id != space);
        }
        Ok(())
    }

    fn move_space_after(
        &self,
        _src: SpaceId,
        _dst: SpaceId,
        _fallback: SpaceId,
        _preserve_focus: bool,
    ) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        Ok(())
    }

    fn focus_space(&self, space: SpaceId) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        PlatformAdapter::focus_space(self, space)
    }

    fn set_window_opacity(&self, window: WindowId, opacity: f64) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        self.state.borrow_mut().opacity.insert(window, opacity);
        Ok(())
    }

    fn set_window_shadow(&self, window: WindowId, shadow: bool) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        self.state.borrow_mut().shadow.insert(window, shadow);
        Ok(())
    }

    fn set_window_sticky(&self, window: WindowId, sticky: bool) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        self.state.borrow_mut().sticky.insert(window, sticky);
        Ok(())
    }

    fn set_window_layer(&self, window: WindowId, layer: Layer) -> Result<()> {
        if !self.is_available() {
            return Err(ErrorKind::SaNotLoaded);
        }
        self.state.borrow_mut().layer.insert(window, layer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sa_channel_refuses_when_unavailable() {
        let adapter = MockAdapter::new();
        assert_eq!(adapter.create_space(SpaceId(1)), Err(ErrorKind::SaNotLoaded));
    }

    #[test]
    fn find_window_under_point_matches_frame() {
        let adapter = MockAdapter::new();
        adapter.add_display(DisplayId(1), vec![SpaceId(1)]);
        adapter.add_window(WindowId(1), 100, SpaceId(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(adapter.find_window_under_point(Point { x: 50.0, y: 50.0 }), Some((WindowId(1), 100)));
        assert_eq!(adapter.find_window_under_point(Point { x: 500.0, y: 500.0 }), None);
    }
}
