//! The `Apps` indexed collection: one record per running, AX-eligible
//! process. `observing_flag` tracks whether the accessibility-notification
//! subscription is currently live, independent of whether `observer` is
//! populated, so a failed re-subscribe after a permissions bounce doesn't
//! get silently treated as success.

use crate::common::collections::HashMap;
use crate::model::ids::{AxHandle, ObserverHandle, Pid};

#[derive(Debug, Clone)]
pub struct AppRecord {
    pub ax_handle: AxHandle,
    pub observer: Option<ObserverHandle>,
    pub observing_flag: bool,
}

#[derive(Debug, Default)]
pub struct Apps {
    by_pid: HashMap<Pid, AppRecord>,
}

impl Apps {
    pub fn insert(&mut self, pid: Pid, ax_handle: AxHandle) {
        self.by_pid.insert(pid, AppRecord { ax_handle, observer: None, observing_flag: false });
    }

    pub fn remove(&mut self, pid: Pid) -> Option<AppRecord> { self.by_pid.remove(&pid) }

    pub fn get(&self, pid: Pid) -> Option<&AppRecord> { self.by_pid.get(&pid) }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut AppRecord> { self.by_pid.get_mut(&pid) }

    pub fn contains(&self, pid: Pid) -> bool { self.by_pid.contains_key(&pid) }

    pub fn set_observer(&mut self, pid: Pid, observer: Option<ObserverHandle>) -> bool {
        let Some(record) = self.by_pid.get_mut(&pid) else { return false };
        record.observer = observer;
        record.observing_flag = observer.is_some();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pid, &AppRecord)> { self.by_pid.iter() }

    pub fn len(&self) -> usize { self.by_pid.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_observer_clears_flag_on_none() {
        let mut apps = Apps::default();
        apps.insert(42, AxHandle(1));
        apps.set_observer(42, Some(ObserverHandle(9)));
        assert!(apps.get(42).unwrap().observing_flag);
        apps.set_observer(42, None);
        assert!(!apps.get(42).unwrap().observing_flag);
    }

    #[test]
    fn remove_unknown_pid_is_none() {
        let mut apps = Apps::default();
        assert!(apps.remove(1).is_none());
    }
}
