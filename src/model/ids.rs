//! Opaque IDs from the host OS. Newtypes so a space id can never be passed
//! where a window id is expected.

use serde::{Deserialize, Serialize};

pub type Pid = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}
impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}
impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// An opaque token issued by the platform adapter for a retained
/// accessibility element. The core stores it and hands it back to the
/// adapter on every operation that needs the underlying handle; it never
/// inspects the value itself. The adapter is responsible for the
/// retain/release pairing behind the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxHandle(pub u64);

/// An opaque token for a registered accessibility-notification observer,
/// analogous to [`AxHandle`] but keyed separately since an app can have a
/// handle without (yet) having a live observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);
