//! The per-space `View` and the layout computation that turns a tileable
//! window set plus a bounds rectangle into a set of frame-set requests.

pub mod bsp;
pub mod float;
pub mod stack;

use crate::geometry::Rect;
use crate::model::ids::WindowId;

pub use bsp::Bsp;
pub use float::Float;
pub use stack::Stack;

#[derive(Debug, Clone)]
pub enum View {
    Bsp(Bsp),
    Stack(Stack),
    Float(Float),
}

impl View {
    pub fn empty_bsp() -> View { View::Bsp(Bsp::default()) }

    pub fn kind(&self) -> &'static str {
        match self {
            View::Bsp(_) => "bsp",
            View::Stack(_) => "stack",
            View::Float(_) => "float",
        }
    }

    pub fn windows(&self) -> Vec<WindowId> {
        match self {
            View::Bsp(tree) => tree.windows(),
            View::Stack(stack) => stack.windows().to_vec(),
            View::Float(float) => float.windows().collect(),
        }
    }

    pub fn contains(&self, window: WindowId) -> bool { self.windows().contains(&window) }

    /// An ASCII dump of the tree shape, for `tracing::trace!` logging
    /// around layout application. Only `Bsp` has a shape worth drawing;
    /// `Stack` and `Float` report their flat window order instead.
    pub fn render_tree(&self) -> String {
        match self {
            View::Bsp(tree) => tree.render(),
            View::Stack(stack) => format!("{:?}", stack.windows()),
            View::Float(float) => format!("{:?}", float.windows().collect::<Vec<_>>()),
        }
    }

    /// Reconciles the view's membership with `windows` (adding missing
    /// ones, dropping stale ones) and returns the resulting frame-set
    /// requests. A `Float` view never produces frame requests: windows
    /// keep their current frames.
    pub fn sync_and_layout(
        &mut self,
        windows: &[WindowId],
        bounds: Rect,
        gap: f64,
        default_ratio: f64,
    ) -> Vec<(WindowId, Rect)> {
        match self {
            View::Bsp(tree) => {
                let current: Vec<WindowId> = tree.windows();
                for &stale in current.iter().filter(|w| !windows.contains(w)) {
                    if let Some(leaf) = tree.find_leaf(stale) {
                        tree.remove(leaf);
                    }
                }
                for &fresh in windows.iter().filter(|w| !current.contains(w)) {
                    // Attach to the first leaf, not `root()` — once a space
                    // has >= 2 windows `root()` is a `Split`, not a leaf.
                    let target = tree.first_leaf();
                    tree.insert(target, fresh, default_ratio);
                }
                tree.layout(bounds, gap)
            }
            View::Stack(stack) => {
                for &stale in stack.windows().to_vec().iter().filter(|w| !windows.contains(w)) {
                    stack.remove(stale);
                }
                for &fresh in windows.iter().filter(|w| !stack.windows().contains(w)) {
                    stack.push(fresh);
                }
                stack.layout(bounds)
            }
            View::Float(float) => {
                let current: Vec<WindowId> = float.windows().collect();
                for &stale in current.iter().filter(|w| !windows.contains(w)) {
                    float.remove(stale);
                }
                for &fresh in windows.iter().filter(|w| !current.contains(w)) {
                    float.push(fresh);
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(n: u64) -> WindowId { WindowId(n) }

    #[test]
    fn bsp_view_adds_and_drops_to_match_window_set() {
        let mut view = View::empty_bsp();
        let bounds = Rect::new(0.0, 0.0, 200.0, 200.0);
        let frames = view.sync_and_layout(&[wid(1), wid(2)], bounds, 0.0, 0.5);
        assert_eq!(frames.len(), 2);
        let frames = view.sync_and_layout(&[wid(2)], bounds, 0.0, 0.5);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, wid(2));
    }

    #[test]
    fn float_view_never_produces_frames() {
        let mut view = View::Float(Float::default());
        let frames = view.sync_and_layout(&[wid(1)], Rect::ZERO, 0.0, 0.5);
        assert!(frames.is_empty());
        assert!(view.contains(wid(1)));
    }
}
