//! The error taxonomy consumed by the command dispatcher and surfaced to
//! IPC clients. Codes are stable snake_case names, never numbers, so a
//! client can match on them without a lookup table.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ErrorKind>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Input
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),

    // Not found
    #[error("window not found{}", .0.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    WindowNotFound(Option<String>),
    #[error("space not found")]
    SpaceNotFound,
    #[error("display not found")]
    DisplayNotFound,
    #[error("no focused window")]
    NoFocusedWindow,
    #[error("no focused space")]
    NoFocusedSpace,

    // State
    #[error("window not managed")]
    WindowNotManaged,
    #[error("space not visible")]
    SpaceNotVisible,
    #[error("already exists: {0}")]
    AlreadyExists(String),

    // System
    #[error("accessibility error: {0}")]
    AxError(String),
    #[error("platform error: {0}")]
    PlatformError(String),
    #[error("socket error: {0}")]
    SocketError(String),

    // Permission
    #[error("scripting addition not loaded")]
    SaNotLoaded,
    #[error("permission denied")]
    PermissionDenied,
}

impl ErrorKind {
    /// Stable name used as the wire/JSON error code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::EmptyCommand => "empty_command",
            ErrorKind::UnknownDomain(_) => "unknown_domain",
            ErrorKind::UnknownCommand(_) => "unknown_command",
            ErrorKind::MissingArgument(_) => "missing_argument",
            ErrorKind::InvalidArgument(_) => "invalid_argument",
            ErrorKind::InvalidSelector(_) => "invalid_selector",
            ErrorKind::InvalidValue(_) => "invalid_value",
            ErrorKind::WindowNotFound(_) => "window_not_found",
            ErrorKind::SpaceNotFound => "space_not_found",
            ErrorKind::DisplayNotFound => "display_not_found",
            ErrorKind::NoFocusedWindow => "no_focused_window",
            ErrorKind::NoFocusedSpace => "no_focused_space",
            ErrorKind::WindowNotManaged => "window_not_managed",
            ErrorKind::SpaceNotVisible => "space_not_visible",
            ErrorKind::AlreadyExists(_) => "already_exists",
            ErrorKind::AxError(_) => "ax_error",
            ErrorKind::PlatformError(_) => "platform_error",
            ErrorKind::SocketError(_) => "socket_error",
            ErrorKind::SaNotLoaded => "sa_not_loaded",
            ErrorKind::PermissionDenied => "permission_denied",
        }
    }
}
