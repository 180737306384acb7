//! The `Spaces` indexed collection: a space's view, its optional label,
//! and the focus history the reconciler needs to compute `last_space_id`
//! transitions.

use crate::common::collections::HashMap;
use crate::layout::View;
use crate::model::ids::SpaceId;

#[derive(Debug, Default)]
pub struct Spaces {
    views: HashMap<SpaceId, View>,
    label_to_id: HashMap<String, SpaceId>,
    id_to_label: HashMap<SpaceId, String>,
    current_space_id: Option<SpaceId>,
    last_space_id: Option<SpaceId>,
}

impl Spaces {
    /// Assigns `label` to `id`, stealing it from whatever id previously
    /// held it. A label is unique at all times.
    pub fn set_label(&mut self, id: SpaceId, label: impl Into<String>) {
        let label = label.into();
        if let Some(old_id) = self.label_to_id.get(&label).copied() {
            if old_id != id {
                self.id_to_label.remove(&old_id);
            }
        }
        if let Some(old_label) = self.id_to_label.remove(&id) {
            self.label_to_id.remove(&old_label);
        }
        self.label_to_id.insert(label.clone(), id);
        self.id_to_label.insert(id, label);
    }

    pub fn remove_label(&mut self, id: SpaceId) {
        if let Some(label) = self.id_to_label.remove(&id) {
            self.label_to_id.remove(&label);
        }
    }

    pub fn clear_labels(&mut self) {
        self.label_to_id.clear();
        self.id_to_label.clear();
    }

    pub fn label_of(&self, id: SpaceId) -> Option<&str> {
        self.id_to_label.get(&id).map(String::as_str)
    }

    pub fn id_of_label(&self, label: &str) -> Option<SpaceId> {
        self.label_to_id.get(label).copied()
    }

    pub fn remove_view(&mut self, id: SpaceId) -> Option<View> { self.views.remove(&id) }

    /// Returns the existing view for `id`, or creates an empty `Bsp` view
    /// if none exists yet.
    pub fn get_or_create_view(&mut self, id: SpaceId) -> &mut View {
        self.views.entry(id).or_insert_with(View::empty_bsp)
    }

    pub fn view(&self, id: SpaceId) -> Option<&View> { self.views.get(&id) }

    pub fn view_mut(&mut self, id: SpaceId) -> Option<&mut View> { self.views.get_mut(&id) }

    pub fn has_view(&self, id: SpaceId) -> bool { self.views.contains_key(&id) }

    pub fn current_space_id(&self) -> Option<SpaceId> { self.current_space_id }

    pub fn last_space_id(&self) -> Option<SpaceId> { self.last_space_id }

    /// Advances the focus-history pair. A no-op if `id` is already current.
    pub fn set_current_space(&mut self, id: SpaceId) {
        if self.current_space_id == Some(id) {
            return;
        }
        self.last_space_id = self.current_space_id;
        self.current_space_id = Some(id);
    }

    pub fn ids(&self) -> impl Iterator<Item = SpaceId> + '_ { self.views.keys().copied() }

    /// Reconciles `id`'s view with `windows` and returns the resulting
    /// frame-set requests. Creates the view (as an empty BSP) if this is
    /// the first time the space has had a tileable window.
    pub fn apply_layout(
        &mut self,
        id: SpaceId,
        bounds: crate::geometry::Rect,
        windows: &[crate::model::ids::WindowId],
        gap: f64,
        default_ratio: f64,
    ) -> Vec<(crate::model::ids::WindowId, crate::geometry::Rect)> {
        let view = self.get_or_create_view(id);
        view.sync_and_layout(windows, bounds, gap, default_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u64) -> SpaceId { SpaceId(n) }

    #[test]
    fn reassigning_label_steals_from_old_id() {
        let mut s = Spaces::default();
        s.set_label(sid(1), "code");
        s.set_label(sid(2), "code");
        assert_eq!(s.label_of(sid(1)), None);
        assert_eq!(s.id_of_label("code"), Some(sid(2)));
    }

    #[test]
    fn current_space_tracks_last() {
        let mut s = Spaces::default();
        s.set_current_space(sid(1));
        s.set_current_space(sid(2));
        assert_eq!(s.current_space_id(), Some(sid(2)));
        assert_eq!(s.last_space_id(), Some(sid(1)));
    }

    #[test]
    fn setting_same_current_space_is_noop() {
        let mut s = Spaces::default();
        s.set_current_space(sid(1));
        s.set_current_space(sid(2));
        s.set_current_space(sid(2));
        assert_eq!(s.last_space_id(), Some(sid(1)));
    }

    #[test]
    fn get_or_create_view_is_idempotent() {
        let mut s = Spaces::default();
        s.get_or_create_view(sid(1));
        assert!(s.has_view(sid(1)));
        s.get_or_create_view(sid(1));
        assert_eq!(s.ids().count(), 1);
    }
}
