//! `tesserad`: the daemon binary. Loads config, builds the reconciler
//! against the real macOS adapter, binds the command socket, and runs the
//! cooperative reconciliation loop until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::{self, SigHandler, Signal};

use tessera::common::config::{default_config_path, ConfigLoader};
use tessera::common::log;
use tessera::ipc::{self, InstanceLock};
use tessera::reconciler::driver;
use tessera::reconciler::pipeline::Reconciler;

#[cfg(target_os = "macos")]
use tessera::platform::mac::{ensure_accessibility_permission, MacHost};

#[derive(Parser)]
#[command(name = "tesserad")]
#[command(about = "Tiling window manager daemon")]
struct Cli {
    /// Path to the config file; defaults to ~/.tessera.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stay attached to the controlling terminal instead of the caller
    /// detaching us via a service manager (launchd plists pass this).
    #[arg(long)]
    foreground: bool,

    /// Overrides the `RUST_LOG` default level for this run.
    #[arg(long)]
    log_level: Option<String>,
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_: i32) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

/// Installs handlers for `SIGINT`/`SIGTERM` that only flip an atomic; the
/// main loop polls it once per iteration rather than unwinding out of
/// signal context.
fn install_signal_handlers() {
    // SAFETY: the handler touches only a single `AtomicBool` store, which
    // is async-signal-safe.
    unsafe {
        let _ = signal::signal(Signal::SIGINT, SigHandler::Handler(handle_shutdown_signal));
        let _ = signal::signal(Signal::SIGTERM, SigHandler::Handler(handle_shutdown_signal));
    }
}

/// How long each loop iteration blocks the host run loop before coming
/// back around to check for a pending IPC client or a shutdown signal.
const TICK_TIMEOUT: Duration = Duration::from_millis(250);

#[cfg(target_os = "macos")]
fn main() {
    let cli = Cli::parse();
    log::init(cli.log_level.as_deref().unwrap_or("info"));
    if !cli.foreground {
        tracing::info!("tesserad starting (run with --foreground to stay attached to this terminal)");
    }

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = match ConfigLoader::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to load config");
            std::process::exit(1);
        }
    };

    let _lock = match InstanceLock::acquire() {
        Ok(lock) => lock,
        Err(err) => {
            tracing::error!(%err, "refusing to start a second instance");
            std::process::exit(1);
        }
    };

    if !ensure_accessibility_permission() {
        tracing::error!("accessibility permission not granted, refusing to start");
        std::process::exit(1);
    }

    let listener = match ipc::bind() {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, "failed to bind command socket");
            std::process::exit(1);
        }
    };

    install_signal_handlers();

    let adapter = MacHost::new(ipc::sa_socket_path(), config_path);
    let mut reconciler = Reconciler::new(config, adapter);
    tracing::info!("tesserad ready");

    while !SHUTDOWN_REQUESTED.load(Ordering::Acquire) {
        driver::step(&mut reconciler, TICK_TIMEOUT);
        while ipc::try_serve_one(&listener, &mut reconciler).unwrap_or(false) {}
    }

    reconciler.signals.begin_shutdown();
    tracing::info!("tesserad shutting down");
}

#[cfg(not(target_os = "macos"))]
fn main() {
    eprintln!("tesserad only runs on macOS");
    std::process::exit(1);
}
