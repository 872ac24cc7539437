//! Endpoint selection and bounded connection retry.
//!
//! A session talks either to a user-named widget endpoint or to its own
//! helper, whose endpoint name is derived from the helper's pid. When the
//! chosen endpoint stays silent, the connector falls back at most twice:
//! widget to local helper, then local helper to a freshly launched one.

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::fmt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::LinkError;
use crate::launcher::{try_reap, Launch};
use crate::log_debug;

/// Prefix of locally spawned endpoint names.
pub const ENDPOINT_PREFIX: &str = "plotterm";

/// Environment variable naming the directory that holds endpoint sockets.
pub const SOCKET_DIR_ENV: &str = "PLOTTERM_SOCKET_DIR";

/// Upper bound on fallback hops per connection request.
pub const MAX_FALLBACK_HOPS: u8 = 2;

/// Resolve the socket directory from an optional override.
pub fn resolve_socket_dir(value: Option<OsString>) -> PathBuf {
    match value {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// A named local communication target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The helper we spawned, identified by its pid.
    Local(u32),
    /// An externally created widget the user asked for by name.
    Widget(String),
}

impl Endpoint {
    pub fn name(&self) -> String {
        match self {
            Self::Local(pid) => format!("{ENDPOINT_PREFIX}{pid}"),
            Self::Widget(name) => name.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Socket path inside `dir`. Widget names that already look like paths are
    /// used verbatim.
    pub fn socket_path(&self, dir: &Path) -> PathBuf {
        match self {
            Self::Widget(name) if name.contains('/') => PathBuf::from(name),
            _ => dir.join(self.name()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Retry budget for one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTiming {
    /// Pause between two connect calls.
    pub attempt_wait: Duration,
    /// Give up on an endpoint once this much time has passed.
    pub deadline: Duration,
}

impl Default for ConnectTiming {
    fn default() -> Self {
        Self {
            attempt_wait: Duration::from_millis(200),
            deadline: Duration::from_millis(1000),
        }
    }
}

/// What a connection request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    /// Last endpoint tried, `None` if no helper existed to try.
    pub endpoint: Option<Endpoint>,
    pub connected: bool,
    /// Fallback hops taken (never more than [`MAX_FALLBACK_HOPS`]).
    pub hops: u8,
}

impl ConnectReport {
    /// Turn an unconnected report into [`LinkError::ConnectTimeout`].
    pub fn into_result(self) -> Result<Endpoint, LinkError> {
        match (self.connected, self.endpoint) {
            (true, Some(endpoint)) => Ok(endpoint),
            (_, endpoint) => Err(LinkError::ConnectTimeout {
                endpoint: endpoint.map_or_else(|| "<no helper>".to_string(), |e| e.name()),
                hops: self.hops,
            }),
        }
    }
}

/// Helper bookkeeping for one session; drives connection attempts.
#[derive(Debug, Clone)]
pub struct Connector {
    socket_dir: PathBuf,
    timing: ConnectTiming,
    helper_pid: Option<u32>,
}

impl Connector {
    pub fn new(socket_dir: PathBuf, timing: ConnectTiming) -> Self {
        Self {
            socket_dir,
            timing,
            helper_pid: None,
        }
    }

    pub fn helper_started(&self) -> bool {
        self.helper_pid.is_some()
    }

    pub fn helper_pid(&self) -> Option<u32> {
        self.helper_pid
    }

    pub fn local_endpoint(&self) -> Option<Endpoint> {
        self.helper_pid.map(Endpoint::Local)
    }

    /// Launch a helper and make it the local endpoint.
    pub fn start_helper(&mut self, launcher: &mut dyn Launch) -> Result<Endpoint, LinkError> {
        if let Some(previous) = self.helper_pid {
            // Collect the previous helper if it already died.
            let _ = try_reap(previous);
        }
        let pid = launcher.launch()?;
        self.helper_pid = Some(pid);
        Ok(Endpoint::Local(pid))
    }

    /// Make sure `channel` talks to the endpoint this session should use.
    ///
    /// The target is the widget if one is configured, otherwise the local
    /// helper (launched first if needed). An existing connection to another
    /// endpoint is dropped.
    pub fn connect_for_session(
        &mut self,
        launcher: &mut dyn Launch,
        channel: &mut Channel,
        widget: &mut Option<String>,
    ) -> Result<ConnectReport, LinkError> {
        let target = match widget.as_ref() {
            Some(name) => Some(Endpoint::Widget(name.clone())),
            None => self.local_endpoint(),
        };

        if let Some(endpoint) = &target {
            if channel.is_connected() {
                if channel.peer() == Some(endpoint.name().as_str()) {
                    return Ok(ConnectReport {
                        endpoint: target,
                        connected: true,
                        hops: 0,
                    });
                }
                debug!(from = ?channel.peer(), to = %endpoint, "switching renderer endpoint");
                channel.disconnect();
            }
        } else {
            channel.disconnect();
        }

        let target = match target {
            Some(endpoint) => endpoint,
            None => self.start_helper(launcher)?,
        };
        self.connect(launcher, channel, Some(target), widget, true)
    }

    /// Connect to `target`, falling back per the hop rules when `retry` is set.
    ///
    /// `None` stands for the local helper when none has been launched yet.
    pub fn connect(
        &mut self,
        launcher: &mut dyn Launch,
        channel: &mut Channel,
        mut target: Option<Endpoint>,
        widget: &mut Option<String>,
        mut retry: bool,
    ) -> Result<ConnectReport, LinkError> {
        let mut hops = 0u8;
        loop {
            if let Some(endpoint) = &target {
                if self.attempt(channel, endpoint) {
                    return Ok(ConnectReport {
                        endpoint: target,
                        connected: true,
                        hops,
                    });
                }
            }
            if !retry || hops >= MAX_FALLBACK_HOPS {
                break;
            }
            hops += 1;
            match &target {
                Some(Endpoint::Widget(name)) => {
                    warn!(widget = %name, "widget unreachable; falling back to local helper");
                    log_debug(&format!("could not connect to widget {name}; using local helper"));
                    *widget = None;
                    target = self.local_endpoint();
                }
                _ => {
                    warn!(endpoint = ?target.as_ref().map(Endpoint::name), "helper unreachable; launching a new one");
                    log_debug("could not connect to local helper; launching a new one");
                    target = Some(self.start_helper(launcher)?);
                    retry = false;
                }
            }
        }
        warn!(endpoint = ?target.as_ref().map(Endpoint::name), hops, "renderer not connected");
        Ok(ConnectReport {
            endpoint: target,
            connected: false,
            hops,
        })
    }

    /// Poll `endpoint` until it accepts or the deadline passes.
    fn attempt(&self, channel: &mut Channel, endpoint: &Endpoint) -> bool {
        let path = endpoint.socket_path(&self.socket_dir);
        let name = endpoint.name();
        let start = Instant::now();
        let mut tries = 0u32;
        loop {
            tries += 1;
            match UnixStream::connect(&path) {
                Ok(stream) => match channel.attach(stream, &name) {
                    Ok(()) => {
                        info!(endpoint = %name, tries, "connected to renderer");
                        return true;
                    }
                    Err(err) => {
                        warn!(endpoint = %name, error = %err, "could not configure renderer socket");
                        return false;
                    }
                },
                Err(err) => {
                    debug!(endpoint = %name, tries, error = %err, "connect attempt failed");
                }
            }
            let elapsed = start.elapsed();
            if elapsed >= self.timing.deadline {
                log_debug(&format!(
                    "gave up on {} after {tries} attempt(s)",
                    path.display()
                ));
                return false;
            }
            thread::sleep(self.timing.attempt_wait.min(self.timing.deadline - elapsed));
        }
    }
}
