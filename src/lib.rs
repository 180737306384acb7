//! Tessera: a tiling reconciliation engine for macOS window management.
//! The core (`reconciler`, `model`, `layout`, `selector`, `dispatcher`,
//! `sync_planner`, `rules`) never touches the filesystem or the host
//! window server directly; every external effect goes through the
//! [`platform::PlatformAdapter`]/[`platform::SaChannel`] boundary, and
//! every external occurrence arrives as a [`platform::PlatformEvent`].

pub mod common;
pub mod dispatcher;
pub mod error;
pub mod geometry;
pub mod ipc;
pub mod layout;
pub mod model;
pub mod platform;
pub mod reconciler;
pub mod rules;
pub mod selector;
pub mod sync_planner;
