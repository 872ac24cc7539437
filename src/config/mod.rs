//! Command-line parsing and validation helpers.

#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::connection::{resolve_socket_dir, ConnectTiming, SOCKET_DIR_ENV};
use crate::launcher::{resolve_driver_dir, DRIVER_DIR_ENV};
use crate::pause::PauseMask;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_ATTEMPT_WAIT_MS: u64 = 200;
pub const MIN_CONNECT_TIMEOUT_MS: u64 = 10;
pub const MAX_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// CLI options for the plotterm demo driver.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "Draw a sample plot through a plotterm renderer and wait for input",
    author,
    version
)]
pub struct AppConfig {
    /// Directory containing the plotterm_helper binary
    #[arg(long = "driver-dir", env = "PLOTTERM_DRIVER_DIR")]
    pub driver_dir: Option<PathBuf>,

    /// Directory for renderer endpoint sockets (defaults to the temp dir)
    #[arg(long = "socket-dir", env = "PLOTTERM_SOCKET_DIR")]
    pub socket_dir: Option<PathBuf>,

    /// Give up on an endpoint after this long (milliseconds)
    #[arg(long = "connect-timeout-ms", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Wait between connection attempts (milliseconds)
    #[arg(long = "attempt-wait-ms", default_value_t = DEFAULT_ATTEMPT_WAIT_MS)]
    pub attempt_wait_ms: u64,

    /// Terminal options, e.g. `size 800,600 title "demo" persist`
    #[arg(long = "term-options", default_value = "")]
    pub term_options: String,

    /// Leave the renderer window open after exit
    #[arg(long = "persist", default_value_t = false)]
    pub persist: bool,

    /// What ends the pause after drawing
    #[arg(long = "pause", value_enum, default_value_t = PauseKind::Any)]
    pub pause: PauseKind,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "PLOTTERM_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "PLOTTERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Write a JSON trace of link events
    #[arg(long = "trace", env = "PLOTTERM_TRACE", default_value_t = false)]
    pub trace: bool,
}

/// Interactions the demo waits for once the plot is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PauseKind {
    None,
    Click,
    Key,
    Any,
}

impl PauseKind {
    pub fn mask(self) -> PauseMask {
        match self {
            PauseKind::None => PauseMask::empty(),
            PauseKind::Click => PauseMask::CLICK,
            PauseKind::Key => PauseMask::KEYSTROKE,
            PauseKind::Any => PauseMask::ANY,
        }
    }
}

/// Everything the library needs to find and reach a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub driver_dir: PathBuf,
    pub socket_dir: PathBuf,
    pub timing: ConnectTiming,
    /// Persist the window at exit regardless of the `persist` term option.
    pub persist: bool,
}

impl LinkConfig {
    /// Build from `PLOTTERM_DRIVER_DIR`/`PLOTTERM_SOCKET_DIR` and default timing.
    pub fn from_env() -> Self {
        Self {
            driver_dir: resolve_driver_dir(std::env::var_os(DRIVER_DIR_ENV)),
            socket_dir: resolve_socket_dir(std::env::var_os(SOCKET_DIR_ENV)),
            timing: ConnectTiming::default(),
            persist: false,
        }
    }
}

impl AppConfig {
    /// Snapshot the link settings for the library.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            driver_dir: resolve_driver_dir(self.driver_dir.clone().map(PathBuf::into_os_string)),
            socket_dir: resolve_socket_dir(self.socket_dir.clone().map(PathBuf::into_os_string)),
            timing: ConnectTiming {
                attempt_wait: Duration::from_millis(self.attempt_wait_ms),
                deadline: Duration::from_millis(self.connect_timeout_ms),
            },
            persist: self.persist,
        }
    }
}
