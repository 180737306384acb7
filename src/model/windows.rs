//! The `Windows` indexed collection.
//!
//! `by_id` is the source of truth; `by_pid` and `by_space` are derived
//! indices kept in lockstep by every mutating method here — callers must
//! never reach into the indices directly.

use crate::common::collections::HashMap;
use crate::model::ids::{AxHandle, Pid, SpaceId, WindowId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFlags {
    pub floating: bool,
    pub sticky: bool,
    pub shadow: bool,
    pub minimized: bool,
    pub hidden: bool,
}

impl WindowFlags {
    /// A window excluded from layout: floating, sticky, hidden, or minimized.
    pub fn excluded_from_layout(&self) -> bool {
        self.floating || self.sticky || self.hidden || self.minimized
    }
}

#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub id: WindowId,
    pub owning_pid: Pid,
    pub space_id: SpaceId,
    pub ax_handle: Option<AxHandle>,
    pub flags: WindowFlags,
    /// Monotonic counter assigned at insertion; used nowhere directly but
    /// kept for debugging/ordering ties outside of `by_space`.
    pub inserted_at: u64,
}

#[derive(Debug, Default)]
pub struct Windows {
    by_id: HashMap<WindowId, WindowRecord>,
    by_pid: HashMap<Pid, crate::common::collections::HashSet<WindowId>>,
    by_space: HashMap<SpaceId, Vec<WindowId>>,
    focused: Option<WindowId>,
    next_seq: u64,
}

impl Windows {
    pub fn add(
        &mut self,
        id: WindowId,
        owning_pid: Pid,
        space_id: SpaceId,
        ax_handle: Option<AxHandle>,
    ) {
        if self.by_id.contains_key(&id) {
            // Re-adding a known window is a no-op for the indices; refresh
            // the record's mutable fields only.
            if let Some(existing) = self.by_id.get_mut(&id) {
                existing.owning_pid = owning_pid;
                existing.ax_handle = ax_handle;
            }
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id.insert(
            id,
            WindowRecord {
                id,
                owning_pid,
                space_id,
                ax_handle,
                flags: WindowFlags::default(),
                inserted_at: seq,
            },
        );
        self.by_pid.entry(owning_pid).or_default().insert(id);
        self.by_space.entry(space_id).or_default().push(id);
    }

    pub fn remove(&mut self, id: WindowId) -> Option<WindowRecord> {
        let record = self.by_id.remove(&id)?;
        if let Some(set) = self.by_pid.get_mut(&record.owning_pid) {
            set.remove(&id);
            if set.is_empty() {
                self.by_pid.remove(&record.owning_pid);
            }
        }
        if let Some(list) = self.by_space.get_mut(&record.space_id) {
            list.retain(|&w| w != id);
            if list.is_empty() {
                self.by_space.remove(&record.space_id);
            }
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        Some(record)
    }

    /// Removes every window owned by `pid`, returning the removed ids in
    /// their former `by_space` order. Used when an app terminates.
    pub fn remove_all_for_pid(&mut self, pid: Pid) -> Vec<WindowId> {
        let Some(ids) = self.by_pid.get(&pid).cloned() else { return Vec::new() };
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if self.remove(id).is_some() {
                removed.push(id);
            }
        }
        removed
    }

    /// Moves `id` from its current space bucket to `new_space` atomically.
    pub fn set_space(&mut self, id: WindowId, new_space: SpaceId) -> bool {
        let Some(record) = self.by_id.get_mut(&id) else { return false };
        let old_space = record.space_id;
        if old_space == new_space {
            return true;
        }
        record.space_id = new_space;
        if let Some(list) = self.by_space.get_mut(&old_space) {
            list.retain(|&w| w != id);
            if list.is_empty() {
                self.by_space.remove(&old_space);
            }
        }
        self.by_space.entry(new_space).or_default().push(id);
        true
    }

    pub fn set_focused(&mut self, id: Option<WindowId>) {
        self.focused = id.filter(|id| self.by_id.contains_key(id));
    }

    pub fn focused(&self) -> Option<WindowId> { self.focused }

    pub fn set_flag(&mut self, id: WindowId, flag: impl FnOnce(&mut WindowFlags)) -> bool {
        let Some(record) = self.by_id.get_mut(&id) else { return false };
        flag(&mut record.flags);
        true
    }

    /// Swaps the positions of `a` and `b` within their shared `by_space`
    /// bucket, leaving every other id in place. Both must be on the same
    /// space.
    pub fn swap_order(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(ra), Some(rb)) = (self.by_id.get(&a), self.by_id.get(&b)) else { return false };
        if ra.space_id != rb.space_id {
            return false;
        }
        let space = ra.space_id;
        let Some(list) = self.by_space.get_mut(&space) else { return false };
        let (Some(ia), Some(ib)) =
            (list.iter().position(|&w| w == a), list.iter().position(|&w| w == b))
        else {
            return false;
        };
        list.swap(ia, ib);
        true
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowRecord> { self.by_id.get(&id) }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowRecord> { self.by_id.get_mut(&id) }

    pub fn contains(&self, id: WindowId) -> bool { self.by_id.contains_key(&id) }

    pub fn iter(&self) -> impl Iterator<Item = &WindowRecord> { self.by_id.values() }

    pub fn for_pid(&self, pid: Pid) -> impl Iterator<Item = WindowId> + '_ {
        self.by_pid.get(&pid).into_iter().flatten().copied()
    }

    /// Windows on `space_id` in tiling (insertion) order, including
    /// non-tileable ones.
    pub fn by_space(&self, space_id: SpaceId) -> &[WindowId] {
        self.by_space.get(&space_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Windows on `space_id` that participate in layout: not floating,
    /// sticky, minimized, or hidden.
    pub fn tileable_for_space(&self, space_id: SpaceId) -> Vec<WindowId> {
        self.by_space(space_id)
            .iter()
            .copied()
            .filter(|&id| {
                self.by_id.get(&id).map(|r| !r.flags.excluded_from_layout()).unwrap_or(false)
            })
            .collect()
    }

    pub fn len(&self) -> usize { self.by_id.len() }

    pub fn is_empty(&self) -> bool { self.by_id.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wid(n: u64) -> WindowId { WindowId(n) }
    fn sid(n: u64) -> SpaceId { SpaceId(n) }

    #[test]
    fn add_updates_both_indices() {
        let mut w = Windows::default();
        w.add(wid(1), 100, sid(1), None);
        assert_eq!(w.by_space(sid(1)), &[wid(1)]);
        assert_eq!(w.for_pid(100).collect::<Vec<_>>(), vec![wid(1)]);
    }

    #[test]
    fn set_space_moves_atomically() {
        let mut w = Windows::default();
        w.add(wid(1), 100, sid(1), None);
        assert!(w.set_space(wid(1), sid(2)));
        assert_eq!(w.by_space(sid(1)), &[] as &[WindowId]);
        assert_eq!(w.by_space(sid(2)), &[wid(1)]);
        assert_eq!(w.get(wid(1)).unwrap().space_id, sid(2));
    }

    #[test]
    fn set_space_round_trip_is_identity() {
        let mut w = Windows::default();
        w.add(wid(1), 100, sid(1), None);
        w.add(wid(2), 100, sid(1), None);
        let before = w.by_space(sid(1)).to_vec();
        w.set_space(wid(1), sid(2));
        w.set_space(wid(1), sid(1));
        assert_eq!(w.by_space(sid(1)), before.as_slice());
    }

    #[test]
    fn swap_order_exchanges_positions_only() {
        use pretty_assertions::assert_eq;

        let mut w = Windows::default();
        w.add(wid(100), 1, sid(1), None);
        w.add(wid(200), 1, sid(1), None);
        w.add(wid(300), 1, sid(1), None);
        assert!(w.swap_order(wid(100), wid(300)));
        assert_eq!(w.by_space(sid(1)), &[wid(300), wid(200), wid(100)]);
    }

    #[test]
    fn swap_order_rejects_mismatched_space() {
        let mut w = Windows::default();
        w.add(wid(1), 1, sid(1), None);
        w.add(wid(2), 1, sid(2), None);
        assert!(!w.swap_order(wid(1), wid(2)));
    }

    #[test]
    fn remove_all_for_pid_clears_both_indices() {
        let mut w = Windows::default();
        w.add(wid(10), 9, sid(1), None);
        w.add(wid(11), 9, sid(1), None);
        let removed = w.remove_all_for_pid(9);
        assert_eq!(removed.len(), 2);
        assert!(w.by_space(sid(1)).is_empty());
        assert!(w.for_pid(9).next().is_none());
    }

    #[test]
    fn tileable_excludes_flagged_windows() {
        let mut w = Windows::default();
        w.add(wid(1), 1, sid(1), None);
        w.add(wid(2), 1, sid(1), None);
        w.set_flag(wid(2), |f| f.floating = true);
        assert_eq!(w.tileable_for_space(sid(1)), vec![wid(1)]);
    }

    #[test]
    fn set_focused_rejects_unknown_window() {
        let mut w = Windows::default();
        w.add(wid(1), 1, sid(1), None);
        w.set_focused(Some(wid(99)));
        assert_eq!(w.focused(), None);
        w.set_focused(Some(wid(1)));
        assert_eq!(w.focused(), Some(wid(1)));
    }
}
