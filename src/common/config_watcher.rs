//! Watches the config file for changes and reloads it on a background
//! thread, using a plain OS thread plus a channel send since this core
//! has no async runtime: the only contract the reconciler needs is an
//! already-parsed [`PlatformEvent::ConfigChanged`] landing in its event
//! intake.

use std::path::PathBuf;
use std::time::Duration;
use std::{fs, thread};

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use tracing::{debug, info, warn};

use crate::common::config::ConfigLoader;
use crate::platform::PlatformEvent;

const DEBOUNCE: Duration = Duration::from_millis(300);

pub struct ConfigWatcher;

impl ConfigWatcher {
    /// Spawns the watcher thread. Parse failures are logged and otherwise
    /// ignored — the daemon keeps running on its last-known-good config
    /// rather than refusing a reload over a typo (same philosophy as
    /// `Config::auto_fix`).
    pub fn spawn(config_path: PathBuf, sender: crossbeam_channel::Sender<PlatformEvent>) {
        thread::Builder::new()
            .name("config-watcher".into())
            .spawn(move || Self::run(config_path, sender))
            .expect("failed to spawn config-watcher thread");
    }

    fn run(config_path: PathBuf, sender: crossbeam_channel::Sender<PlatformEvent>) {
        let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            warn!(?config_path, "config path has no parent directory, hot-reload disabled");
            return;
        };
        if !parent.exists() {
            warn!(?parent, "config directory does not exist, hot-reload disabled");
            return;
        }

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let watch_target = config_path.clone();
        let debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in &events {
                    if event.kind == DebouncedEventKind::Any && event.path == watch_target {
                        let _ = tx.send(());
                    }
                }
            }
        });
        let mut debouncer = match debouncer {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "failed to start config file watcher");
                return;
            }
        };
        if let Err(err) = debouncer.watcher().watch(parent, RecursiveMode::NonRecursive) {
            warn!(%err, ?parent, "failed to watch config directory");
            return;
        }
        info!(?config_path, "watching config file for changes");

        for () in rx {
            if fs::metadata(&config_path).is_err() {
                continue;
            }
            match ConfigLoader::load(&config_path) {
                Ok(config) => {
                    debug!(?config_path, "config reloaded");
                    if sender.send(PlatformEvent::ConfigChanged(Box::new(config))).is_err() {
                        return;
                    }
                }
                Err(err) => warn!(%err, "failed to reload config, keeping last-known-good"),
            }
        }
    }
}
