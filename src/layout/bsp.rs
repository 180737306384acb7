//! Binary space-partitioning tree: leaves hold window ids, internal nodes
//! hold a split axis and ratio. Stored in a slotmap arena so leaves and
//! splits can be referenced by a stable, `Copy` id instead of a pointer.

use slotmap::{new_key_type, SlotMap};

use crate::geometry::{Axis, Rect};
use crate::model::ids::WindowId;

new_key_type! { pub struct NodeId; }

const DEFAULT_RATIO: f64 = 0.5;

#[derive(Debug, Clone)]
enum Node {
    Leaf { window: WindowId, parent: Option<NodeId> },
    Split { axis: Axis, ratio: f64, left: NodeId, right: NodeId, parent: Option<NodeId> },
}

impl Node {
    fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Leaf { parent, .. } | Node::Split { parent, .. } => *parent,
        }
    }

    fn set_parent(&mut self, new_parent: Option<NodeId>) {
        match self {
            Node::Leaf { parent, .. } | Node::Split { parent, .. } => *parent = new_parent,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bsp {
    arena: SlotMap<NodeId, Node>,
    root: Option<NodeId>,
}

impl Bsp {
    pub fn is_empty(&self) -> bool { self.root.is_none() }

    pub fn root(&self) -> Option<NodeId> { self.root }

    /// Inserts `window` as a sibling of `target` (or as the sole root, if
    /// the tree is empty). `target` need not be a leaf itself — if it names
    /// an internal node (e.g. a space's `root()` once it has more than one
    /// window), the insert resolves down to the first leaf under it. The
    /// new leaf takes half of the target leaf's space and the split
    /// inherits the axis perpendicular to the target's parent; the target
    /// leaf keeps its `NodeId` and is simply reparented under the new split.
    pub fn insert(&mut self, target: Option<NodeId>, window: WindowId, default_ratio: f64) -> NodeId {
        let Some(target) = target.or(self.root).map(|t| self.first_leaf_under(t)) else {
            let leaf = self.arena.insert(Node::Leaf { window, parent: None });
            self.root = Some(leaf);
            return leaf;
        };

        let axis = self.perpendicular_axis_at(target);
        let parent = self.arena[target].parent();

        let new_leaf = self.arena.insert(Node::Leaf { window, parent: None });

        let split = self.arena.insert(Node::Split {
            axis,
            ratio: default_ratio.clamp(0.1, 0.9),
            left: target,
            right: new_leaf,
            parent,
        });
        self.arena[target].set_parent(Some(split));
        self.arena[new_leaf].set_parent(Some(split));

        self.reparent_child(parent, target, split);

        new_leaf
    }

    /// The leftmost leaf under `node` (`node` itself, if it already is one).
    fn first_leaf_under(&self, node: NodeId) -> NodeId {
        match &self.arena[node] {
            Node::Leaf { .. } => node,
            Node::Split { left, .. } => self.first_leaf_under(*left),
        }
    }

    /// The tree's leftmost leaf, or `None` if the tree is empty. Used by
    /// callers that insert without a specific focused leaf in hand.
    pub fn first_leaf(&self) -> Option<NodeId> { self.root.map(|r| self.first_leaf_under(r)) }

    /// Removes the leaf at `node`; the sibling replaces the parent split.
    /// Returns the id the sibling now occupies (which may equal the old
    /// parent id, since the sibling's subtree is spliced in place).
    pub fn remove(&mut self, node: NodeId) -> Option<NodeId> {
        let parent_id = self.arena.get(node)?.parent();
        let Some(parent_id) = parent_id else {
            // `node` is the root; removing it empties the tree.
            self.arena.remove(node);
            self.root = None;
            return None;
        };

        let Node::Split { left, right, parent: grandparent, .. } = self.arena[parent_id].clone()
        else {
            return None;
        };
        let sibling = if left == node { right } else { left };

        self.arena.remove(node);
        self.arena.remove(parent_id);
        self.arena.get_mut(sibling).unwrap().set_parent(grandparent);

        match grandparent {
            Some(gp) => {
                self.reparent_child(Some(gp), parent_id, sibling);
            }
            None => {
                self.root = Some(sibling);
            }
        }
        Some(sibling)
    }

    /// Recomputes every split ratio to 0.5, so every sibling pair is
    /// evenly sized.
    pub fn balance(&mut self) {
        let splits: Vec<NodeId> = self
            .arena
            .iter()
            .filter_map(|(id, n)| matches!(n, Node::Split { .. }).then_some(id))
            .collect();
        for id in splits {
            if let Node::Split { ratio, .. } = &mut self.arena[id] {
                *ratio = DEFAULT_RATIO;
            }
        }
    }

    /// Swaps the window payloads of two leaves in place, leaving tree
    /// shape untouched.
    pub fn swap_leaves(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (wa, wb) = match (self.window_of(a), self.window_of(b)) {
            (Some(wa), Some(wb)) => (wa, wb),
            _ => return false,
        };
        if let Node::Leaf { window, .. } = &mut self.arena[a] {
            *window = wb;
        }
        if let Node::Leaf { window, .. } = &mut self.arena[b] {
            *window = wa;
        }
        true
    }

    /// Detaches the leaf at `from` and reinserts it as a sibling of `to`.
    pub fn warp(&mut self, from: NodeId, to: NodeId, default_ratio: f64) -> Option<NodeId> {
        let window = self.window_of(from)?;
        self.remove(from)?;
        Some(self.insert(Some(to), window, default_ratio))
    }

    pub fn find_leaf(&self, window: WindowId) -> Option<NodeId> {
        self.arena.iter().find_map(|(id, n)| match n {
            Node::Leaf { window: w, .. } if *w == window => Some(id),
            _ => None,
        })
    }

    /// The window on the other side of the nearest split containing
    /// `window`'s leaf, or `None` if `window` is the tree's sole leaf.
    pub fn sibling_window(&self, window: WindowId) -> Option<WindowId> {
        let leaf = self.find_leaf(window)?;
        let parent_id = self.arena.get(leaf)?.parent()?;
        let Node::Split { left, right, .. } = &self.arena[parent_id] else { return None };
        let sibling_node = if *left == leaf { *right } else { *left };
        self.first_window_under(sibling_node)
    }

    fn first_window_under(&self, node: NodeId) -> Option<WindowId> {
        match &self.arena[node] {
            Node::Leaf { window, .. } => Some(*window),
            Node::Split { left, .. } => self.first_window_under(*left),
        }
    }

    pub fn window_of(&self, node: NodeId) -> Option<WindowId> {
        match self.arena.get(node)? {
            Node::Leaf { window, .. } => Some(*window),
            Node::Split { .. } => None,
        }
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.arena
            .iter()
            .filter_map(|(_, n)| match n {
                Node::Leaf { window, .. } => Some(*window),
                Node::Split { .. } => None,
            })
            .collect()
    }

    /// Recursively assigns a frame to every leaf given the space's outer
    /// `bounds`, deflating each adjacent edge by `gap / 2`. Returns the
    /// `(window, frame)` pairs in tree order.
    pub fn layout(&self, bounds: Rect, gap: f64) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.layout_node(root, bounds, gap, &mut out);
        }
        out
    }

    fn layout_node(&self, node: NodeId, bounds: Rect, gap: f64, out: &mut Vec<(WindowId, Rect)>) {
        match &self.arena[node] {
            Node::Leaf { window, .. } => {
                out.push((*window, bounds.deflate(gap / 2.0)));
            }
            Node::Split { axis, ratio, left, right, .. } => {
                let (a, b) = bounds.split(*axis, *ratio);
                self.layout_node(*left, a, gap, out);
                self.layout_node(*right, b, gap, out);
            }
        }
    }

    fn perpendicular_axis_at(&self, node: NodeId) -> Axis {
        match self.arena.get(node).and_then(|n| n.parent()).and_then(|p| self.arena.get(p)) {
            Some(Node::Split { axis, .. }) => axis.perpendicular(),
            // A leaf with no parent is the tree's first split: spec §8
            // scenario #1 requires it to be a left/right (`Horizontal`) split.
            _ => Axis::Horizontal,
        }
    }

    fn reparent_child(&mut self, parent: Option<NodeId>, old_child: NodeId, new_child: NodeId) {
        let Some(parent) = parent else {
            self.root = Some(new_child);
            return;
        };
        if let Node::Split { left, right, .. } = &mut self.arena[parent] {
            if *left == old_child {
                *left = new_child;
            } else if *right == old_child {
                *right = new_child;
            }
        }
    }

    /// Renders the tree as an indented ASCII diagram — splits show their
    /// axis and ratio, leaves show the window id. Used for `tracing::trace!`
    /// dumps around layout application, the same debugging aid the
    /// teacher's own layout engine prints through `ascii_tree`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(root) = self.root else { return out };
        let tree = self.ascii_tree_node(root);
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn ascii_tree_node(&self, node: NodeId) -> ascii_tree::Tree {
        match &self.arena[node] {
            Node::Leaf { window, .. } => ascii_tree::Tree::Leaf(vec![format!("window {}", window.0)]),
            Node::Split { axis, ratio, left, right, .. } => {
                let desc = format!("{axis:?} {ratio:.2}");
                ascii_tree::Tree::Node(desc, vec![self.ascii_tree_node(*left), self.ascii_tree_node(*right)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(n: u64) -> WindowId { WindowId(n) }

    #[test]
    fn insert_into_empty_tree_becomes_root() {
        let mut b = Bsp::default();
        let leaf = b.insert(None, wid(1), 0.5);
        assert_eq!(b.root(), Some(leaf));
        assert_eq!(b.windows(), vec![wid(1)]);
    }

    #[test]
    fn insert_splits_target_leaf() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        let mut windows = b.windows();
        windows.sort_by_key(|w| w.0);
        assert_eq!(windows, vec![wid(1), wid(2)]);
    }

    #[test]
    fn remove_leaf_promotes_sibling() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        let second = b.insert(Some(first), wid(2), 0.5);
        b.remove(second);
        assert_eq!(b.windows(), vec![wid(1)]);
    }

    #[test]
    fn remove_only_root_empties_tree() {
        let mut b = Bsp::default();
        let only = b.insert(None, wid(1), 0.5);
        b.remove(only);
        assert!(b.is_empty());
    }

    #[test]
    fn layout_splits_bounds_in_two() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        let bounds = Rect::new(0.0, 0.0, 200.0, 100.0);
        let frames = b.layout(bounds, 0.0);
        assert_eq!(frames.len(), 2);
        let total_area: f64 = frames.iter().map(|(_, r)| r.area()).sum();
        assert!((total_area - bounds.area()).abs() < 1e-6);
    }

    #[test]
    fn balance_resets_all_ratios() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.9);
        b.insert(Some(first), wid(2), 0.9);
        b.balance();
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let frames = b.layout(bounds, 0.0);
        assert_eq!(frames[0].1.width, frames[1].1.width);
    }

    #[test]
    fn render_draws_a_leaf_per_window() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        let rendered = b.render();
        assert!(rendered.contains("window 1"));
        assert!(rendered.contains("window 2"));
    }

    #[test]
    fn render_of_empty_tree_is_empty() {
        let b = Bsp::default();
        assert!(b.render().is_empty());
    }

    #[test]
    fn swap_leaves_exchanges_windows_not_shape() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        // `insert` preserves `first`'s NodeId (it's reparented under the new
        // split, not replaced), so it stays a live key after this call.
        let second = b.insert(Some(first), wid(2), 0.5);
        b.swap_leaves(first, second);
        assert_eq!(b.window_of(first), Some(wid(2)));
        assert_eq!(b.window_of(second), Some(wid(1)));
    }

    #[test]
    fn insert_preserves_target_leaf_node_id() {
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        assert_eq!(b.window_of(first), Some(wid(1)));
    }

    #[test]
    fn insert_against_root_resolves_to_a_leaf_without_panicking() {
        // Regression: once a space has >= 2 windows, `root()` names an
        // internal `Split` node. Passing it straight to `insert` must not
        // panic; it resolves to the first leaf under it instead.
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        let root = b.root().unwrap();
        b.insert(Some(root), wid(3), 0.5);
        let mut windows = b.windows();
        windows.sort_by_key(|w| w.0);
        assert_eq!(windows, vec![wid(1), wid(2), wid(3)]);
    }

    #[test]
    fn first_split_is_horizontal_left_right() {
        // Spec §8 scenario #1: inserting w2 against w1 in an empty space
        // produces a left/right split, not a top/bottom one.
        let mut b = Bsp::default();
        let first = b.insert(None, wid(1), 0.5);
        b.insert(Some(first), wid(2), 0.5);
        let bounds = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let mut frames = b.layout(bounds, 10.0);
        frames.sort_by_key(|(w, _)| w.0);
        assert_eq!(frames[0], (wid(1), Rect::new(5.0, 5.0, 490.0, 990.0)));
        assert_eq!(frames[1], (wid(2), Rect::new(505.0, 5.0, 490.0, 990.0)));
    }
}
