//! The yabai-style command socket: length-prefixed, null-separated
//! argument frames in, raw bytes or a `0x07`-prefixed failure message out.
//! Query responses are newline-terminated JSON.

pub mod protocol;

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;

use nix::fcntl::{Flock, FlockArg};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::dispatcher::{self, CommandOutcome};
use crate::error::ErrorKind;
use crate::platform::{PlatformAdapter, SaChannel};
use crate::reconciler::pipeline::Reconciler;

const PROGRAM_NAME: &str = "tessera";
/// Prefixes a failure response on the wire; chosen to be a byte that
/// never starts valid query JSON or a bare success payload.
pub const ERROR_PREFIX: u8 = 0x07;

fn user() -> String { std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()) }

pub fn socket_path() -> PathBuf { PathBuf::from(format!("/tmp/{PROGRAM_NAME}_{}.socket", user())) }

pub fn lock_path() -> PathBuf { PathBuf::from(format!("/tmp/{PROGRAM_NAME}_{}.lock", user())) }

pub fn sa_socket_path() -> PathBuf { PathBuf::from(format!("/tmp/{PROGRAM_NAME}-sa_{}.socket", user())) }

fn chmod_0600(path: &std::path::Path) -> io::Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

/// Holds the daemon's single-instance lock file (`flock`, exclusive,
/// non-blocking) for the process's lifetime; dropping it releases the lock.
pub struct InstanceLock {
    _flock: Flock<File>,
}

impl InstanceLock {
    /// Fails if another daemon instance already holds the lock, so the
    /// caller can refuse to start rather than run two reconcilers against
    /// the same windows.
    pub fn acquire() -> crate::error::Result<InstanceLock> {
        let path = lock_path();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| ErrorKind::SocketError(format!("opening lock file: {e}")))?;
        chmod_0600(&path).map_err(|e| ErrorKind::SocketError(format!("chmod lock file: {e}")))?;
        let flock = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, _)| ErrorKind::AlreadyExists("another daemon instance is running".to_string()))?;
        Ok(InstanceLock { _flock: flock })
    }
}

/// Binds the command socket at the conventional path, removing a stale
/// socket file left behind by a crashed previous instance first.
pub fn bind() -> io::Result<UnixListener> {
    let path = socket_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let listener = UnixListener::bind(&path)?;
    chmod_0600(&path)?;
    Ok(listener)
}

/// Reads one length-prefixed request frame: a 4-byte little-endian length
/// followed by that many bytes of null-separated argument strings.
fn read_request(stream: &mut UnixStream) -> io::Result<Vec<String>> {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(buf.split(|&b| b == 0).filter(|s| !s.is_empty()).map(|s| String::from_utf8_lossy(s).into_owned()).collect())
}

fn write_success(stream: &mut UnixStream, payload: &[u8]) -> io::Result<()> { stream.write_all(payload) }

fn write_failure(stream: &mut UnixStream, err: &ErrorKind) -> io::Result<()> {
    let message = format!("{}: {}", err.code(), err);
    let mut frame = vec![ERROR_PREFIX];
    frame.extend_from_slice(message.as_bytes());
    stream.write_all(&frame)
}

/// Accepts and serves exactly one client connection: yabai-style clients
/// open a fresh socket connection per invocation rather than holding one
/// open, so the server's job per tick is "accept if one is pending, serve
/// it fully, close it" — never block the loop thread waiting for a client.
pub fn try_serve_one<P: PlatformAdapter + SaChannel>(
    listener: &UnixListener,
    reconciler: &mut Reconciler<P>,
) -> io::Result<bool> {
    listener.set_nonblocking(true)?;
    let (mut stream, _addr) = match listener.accept() {
        Ok(pair) => pair,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
        Err(e) => return Err(e),
    };
    stream.set_nonblocking(false)?;

    let args = match read_request(&mut stream) {
        Ok(args) => args,
        Err(e) => {
            warn!(%e, "failed to read ipc request");
            return Ok(true);
        }
    };

    match protocol::parse(&args) {
        Ok(protocol::Request::Command(command)) => match dispatcher::dispatch(reconciler, command) {
            Ok(outcome) => {
                let _ = write_success(&mut stream, &outcome_bytes(&outcome));
            }
            Err(err) => {
                debug!(code = err.code(), "command failed");
                let _ = write_failure(&mut stream, &err);
            }
        },
        Ok(protocol::Request::Query(kind)) => {
            let mut body = serde_json::to_vec(&run_query(reconciler, kind)).unwrap_or_default();
            body.push(b'\n');
            let _ = write_success(&mut stream, &body);
        }
        Err(err) => {
            let _ = write_failure(&mut stream, &err);
        }
    }
    Ok(true)
}

fn outcome_bytes(outcome: &CommandOutcome) -> Vec<u8> {
    match &outcome.payload {
        Some(value) => {
            let mut bytes = serde_json::to_vec(value).unwrap_or_default();
            bytes.push(b'\n');
            bytes
        }
        None => Vec::new(),
    }
}

fn run_query<P: PlatformAdapter + SaChannel>(reconciler: &Reconciler<P>, kind: protocol::QueryKind) -> Value {
    match kind {
        protocol::QueryKind::Displays => query_displays(reconciler),
        protocol::QueryKind::Spaces => query_spaces(reconciler),
        protocol::QueryKind::Windows => query_windows(reconciler),
    }
}

fn query_displays<P: PlatformAdapter + SaChannel>(r: &Reconciler<P>) -> Value {
    let active = r.state.displays.get_active_list();
    let current = r.state.spaces.current_space_id();
    let displays: Vec<Value> = active
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            let frame = r.adapter.get_display_frame(id);
            let spaces = r.adapter.get_spaces_for_display(id);
            let has_focus = current.map(|c| spaces.contains(&c)).unwrap_or(false);
            json!({
                "id": id.0,
                "uuid": format!("display-{}", id.0),
                "index": index + 1,
                "label": r.state.displays.label_of(id),
                "frame": { "x": frame.x, "y": frame.y, "w": frame.width, "h": frame.height },
                "spaces": spaces.iter().map(|s| s.0).collect::<Vec<_>>(),
                "has-focus": has_focus,
            })
        })
        .collect();
    Value::Array(displays)
}

fn query_spaces<P: PlatformAdapter + SaChannel>(r: &Reconciler<P>) -> Value {
    let current = r.state.spaces.current_space_id();
    let mut spaces = Vec::new();
    for &display in r.state.displays.get_active_list() {
        for (index, space) in r.adapter.get_spaces_for_display(display).into_iter().enumerate() {
            let windows = r.state.windows.by_space(space);
            let kind = r.state.spaces.view(space).map(|v| v.kind()).unwrap_or("user");
            spaces.push(json!({
                "id": space.0,
                "uuid": format!("space-{}", space.0),
                "index": index + 1,
                "label": r.state.spaces.label_of(space),
                "type": kind,
                "display": display.0,
                "windows": windows.iter().map(|w| w.0).collect::<Vec<_>>(),
                "first-window": windows.first().map(|w| w.0),
                "last-window": windows.last().map(|w| w.0),
                "has-focus": current == Some(space),
                "is-visible": current == Some(space),
                "is-native-fullscreen": false,
            }));
        }
    }
    Value::Array(spaces)
}

fn query_windows<P: PlatformAdapter + SaChannel>(r: &Reconciler<P>) -> Value {
    let focused = r.focused_window();
    let windows: Vec<Value> = r
        .state
        .windows
        .iter()
        .map(|w| {
            let frame = r.adapter.get_window_frame(w.id).unwrap_or(crate::geometry::Rect::ZERO);
            json!({
                "id": w.id.0,
                "pid": w.owning_pid,
                "app": r.adapter.app_name(w.owning_pid),
                "title": r.adapter.window_title(w.id),
                "frame": { "x": frame.x, "y": frame.y, "w": frame.width, "h": frame.height },
                "role": "AXWindow",
                "subrole": "AXStandardWindow",
                "display": r.state.displays.get_active_list().iter().find(|&&d| {
                    r.adapter.get_spaces_for_display(d).contains(&w.space_id)
                }).map(|d| d.0),
                "space": w.space_id.0,
                "level": 0,
                "sub-level": 0,
                "layer": "normal",
                "sub-layer": "normal",
                "opacity": 1.0,
                "split-type": Value::Null,
                "split-child": Value::Null,
                "stack-index": Value::Null,
                "can-move": true,
                "can-resize": true,
                "has-focus": focused == Some(w.id),
                "has-shadow": !w.flags.shadow,
                "has-parent-zoom": false,
                "has-fullscreen-zoom": false,
                "has-ax-reference": w.ax_handle.is_some(),
                "is-native-fullscreen": false,
                "is-visible": !w.flags.hidden,
                "is-minimized": w.flags.minimized,
                "is-hidden": w.flags.hidden,
                "is-floating": w.flags.floating,
                "is-sticky": w.flags.sticky,
                "is-grabbed": false,
            })
        })
        .collect();
    Value::Array(windows)
}

/// The client side of the protocol: frames `args`, sends it, and returns
/// either the raw success payload or the decoded failure message.
pub fn send_request(args: &[String]) -> io::Result<Result<Vec<u8>, String>> {
    let mut stream = UnixStream::connect(socket_path())?;
    let mut body = Vec::new();
    for a in args {
        body.extend_from_slice(a.as_bytes());
        body.push(0);
    }
    let len = (body.len() as u32).to_le_bytes();
    stream.write_all(&len)?;
    stream.write_all(&body)?;
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    match response.split_first() {
        Some((&ERROR_PREFIX, rest)) => Ok(Err(String::from_utf8_lossy(rest).into_owned())),
        _ => Ok(Ok(response)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_includes_program_and_user() {
        let path = socket_path().display().to_string();
        assert!(path.starts_with("/tmp/tessera_"));
        assert!(path.ends_with(".socket"));
    }

    #[test]
    fn lock_and_sa_paths_are_distinct_from_socket_path() {
        assert_ne!(lock_path(), socket_path());
        assert_ne!(sa_socket_path(), socket_path());
    }

    #[test]
    fn query_windows_reports_focus_and_flags() {
        use crate::common::config::Config;
        use crate::model::ids::{SpaceId, WindowId};
        use crate::platform::mock::MockAdapter;

        let adapter = MockAdapter::new();
        adapter.add_window(WindowId(1), 42, SpaceId(1), crate::geometry::Rect::new(0.0, 0.0, 100.0, 100.0));
        adapter.set_app_name(42, "Terminal");
        let mut reconciler = Reconciler::new(Config::default(), adapter);
        reconciler.state.windows.add(WindowId(1), 42, SpaceId(1), None);
        reconciler.set_focused_window(WindowId(1));

        let result = query_windows(&reconciler);
        let arr = result.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["app"], "Terminal");
        assert_eq!(arr[0]["has-focus"], true);
    }
}
