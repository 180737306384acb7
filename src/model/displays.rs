//! The `Displays` indexed collection: active-display ordering plus the
//! optional label bijection used by display selectors. Mirrors `Spaces`'s
//! label bookkeeping at smaller scale.

use crate::common::collections::HashMap;
use crate::model::ids::DisplayId;

#[derive(Debug, Default)]
pub struct Displays {
    label_to_id: HashMap<String, DisplayId>,
    id_to_label: HashMap<DisplayId, String>,
    /// Active displays in the order the platform reports them; index 0 is
    /// conventionally the main display.
    active: Vec<DisplayId>,
}

impl Displays {
    pub fn set_label(&mut self, id: DisplayId, label: impl Into<String>) {
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

    pub fn remove_label(&mut self, id: DisplayId) {
        if let Some(label) = self.id_to_label.remove(&id) {
            self.label_to_id.remove(&label);
        }
    }

    pub fn label_of(&self, id: DisplayId) -> Option<&str> {
        self.id_to_label.get(&id).map(String::as_str)
    }

    pub fn id_of_label(&self, label: &str) -> Option<DisplayId> {
        self.label_to_id.get(label).copied()
    }

    /// Replaces the active-display list wholesale; called whenever the
    /// platform reports a hotplug event.
    pub fn set_active_list(&mut self, displays: Vec<DisplayId>) { self.active = displays; }

    pub fn get_active_list(&self) -> &[DisplayId] { &self.active }

    pub fn get_main_id(&self) -> Option<DisplayId> { self.active.first().copied() }

    pub fn get_by_index(&self, index: usize) -> Option<DisplayId> {
        self.active.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(n: u32) -> DisplayId { DisplayId(n) }

    #[test]
    fn main_id_is_first_active() {
        let mut d = Displays::default();
        d.set_active_list(vec![did(2), did(5)]);
        assert_eq!(d.get_main_id(), Some(did(2)));
        assert_eq!(d.get_by_index(1), Some(did(5)));
        assert_eq!(d.get_by_index(2), None);
    }

    #[test]
    fn reassigning_label_steals_from_old_id() {
        let mut d = Displays::default();
        d.set_label(did(1), "main");
        d.set_label(did(2), "main");
        assert_eq!(d.label_of(did(1)), None);
        assert_eq!(d.id_of_label("main"), Some(did(2)));
    }
}
