//! Float layout: windows are tracked for membership but never assigned a
//! computed frame — they keep whatever frame the user last left them at.

use crate::common::collections::HashSet;
use crate::model::ids::WindowId;

#[derive(Debug, Clone, Default)]
pub struct Float {
    members: HashSet<WindowId>,
}

impl Float {
    pub fn push(&mut self, window: WindowId) { self.members.insert(window); }

    pub fn remove(&mut self, window: WindowId) { self.members.remove(&window); }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ { self.members.iter().copied() }
}
