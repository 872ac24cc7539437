//! Fork/exec of the renderer helper process.
//!
//! The helper is started fire-and-forget: the parent records the child's pid
//! (which names the endpoint the helper will listen on) and moves on. Readiness
//! is only ever discovered by the connection retry loop.

use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::LinkError;
use crate::log_debug;

/// File name of the helper binary inside the driver directory.
pub const HELPER_NAME: &str = "plotterm_helper";

/// Environment variable overriding the driver directory.
pub const DRIVER_DIR_ENV: &str = "PLOTTERM_DRIVER_DIR";

/// Driver directory used when the environment does not name one.
pub const DEFAULT_DRIVER_DIR: &str = match option_env!("PLOTTERM_DEFAULT_DRIVER_DIR") {
    Some(dir) => dir,
    None => "/usr/local/libexec/plotterm",
};

/// Something that can start a renderer and report its pid.
pub trait Launch {
    fn launch(&mut self) -> Result<u32, LinkError>;
}

/// Resolve the driver directory from an optional override.
pub fn resolve_driver_dir(value: Option<OsString>) -> PathBuf {
    match value {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_DRIVER_DIR),
    }
}

/// Launches `<driver dir>/plotterm_helper` with no arguments.
#[derive(Debug, Clone)]
pub struct HelperLauncher {
    driver_dir: PathBuf,
}

impl HelperLauncher {
    pub fn new(driver_dir: impl Into<PathBuf>) -> Self {
        Self {
            driver_dir: driver_dir.into(),
        }
    }

    /// Use `$PLOTTERM_DRIVER_DIR`, falling back to the compiled-in default.
    pub fn from_env() -> Self {
        Self::new(resolve_driver_dir(std::env::var_os(DRIVER_DIR_ENV)))
    }

    pub fn helper_path(&self) -> PathBuf {
        self.driver_dir.join(HELPER_NAME)
    }
}

impl Launch for HelperLauncher {
    fn launch(&mut self) -> Result<u32, LinkError> {
        let path = self.helper_path();
        let pid = spawn_detached(&path).map_err(|source| LinkError::SpawnFailure {
            path: path.display().to_string(),
            source,
        })?;
        info!(pid, helper = %path.display(), "launched renderer helper");
        log_debug(&format!("launched {} as pid {pid}", path.display()));
        Ok(pid)
    }
}

/// Fork and exec `path` without waiting for it.
///
/// Everything the child needs is prepared before `fork()`. The child never
/// returns into Rust code: it either becomes the helper or calls `_exit(1)`, so
/// no destructor or exit hook of the parent runs twice.
pub fn spawn_detached(path: &Path) -> io::Result<u32> {
    let program = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "helper path contains NUL"))?;
    let argv0 = CString::new(HELPER_NAME).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "helper name contains NUL")
    })?;
    let failure = format!("Expected plotterm helper: {}\nExec failed: ", path.display());

    // SAFETY: fork has no preconditions; the child branch only calls child_exec.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid == 0 {
        // SAFETY: we are in the freshly forked child.
        unsafe { child_exec(&program, &argv0, failure.as_bytes()) };
    }
    Ok(pid as u32)
}

/// Replace the child image with the helper, or report and `_exit(1)`.
///
/// # Safety
///
/// Must only be called in the child process after `fork()`.
unsafe fn child_exec(program: &CString, argv0: &CString, failure: &[u8]) -> ! {
    let argv = [argv0.as_ptr(), ptr::null()];
    libc::execv(program.as_ptr(), argv.as_ptr());

    let err = io::Error::last_os_error().to_string();
    // SAFETY: write is async-signal-safe and stderr is a valid fd in the child.
    let _ = libc::write(
        libc::STDERR_FILENO,
        failure.as_ptr() as *const libc::c_void,
        failure.len(),
    );
    let _ = libc::write(
        libc::STDERR_FILENO,
        err.as_ptr() as *const libc::c_void,
        err.len(),
    );
    let _ = libc::write(libc::STDERR_FILENO, b"\n".as_ptr() as *const libc::c_void, 1);
    libc::_exit(1);
}

/// Reap `pid` if it has already exited; never blocks.
pub fn try_reap(pid: u32) -> Option<i32> {
    let mut status = 0;
    // SAFETY: waitpid with WNOHANG only inspects the state of our own child.
    let ret = unsafe { libc::waitpid(pid as libc::pid_t, &mut status, libc::WNOHANG) };
    if ret > 0 {
        Some(status)
    } else {
        None
    }
}

/// Poll for the child's exit until `timeout`; returns the exit code if it
/// exited normally.
pub fn wait_for_exit(pid: u32, timeout: Duration) -> Option<i32> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Some(status) = try_reap(pid) {
            return libc::WIFEXITED(status).then(|| libc::WEXITSTATUS(status));
        }
        thread::sleep(Duration::from_millis(10));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "plotterm-launch-{label}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn driver_dir_prefers_override() {
        assert_eq!(
            resolve_driver_dir(Some(OsString::from("/opt/plot"))),
            PathBuf::from("/opt/plot")
        );
        assert_eq!(
            resolve_driver_dir(Some(OsString::new())),
            PathBuf::from(DEFAULT_DRIVER_DIR)
        );
        assert_eq!(resolve_driver_dir(None), PathBuf::from(DEFAULT_DRIVER_DIR));
    }

    #[test]
    fn helper_path_joins_binary_name() {
        let launcher = HelperLauncher::new("/opt/plot");
        assert_eq!(
            launcher.helper_path(),
            PathBuf::from("/opt/plot/plotterm_helper")
        );
    }

    #[test]
    fn missing_helper_only_fails_the_child() {
        let mut launcher = HelperLauncher::new(unique_dir("missing").join("nope"));
        let pid = launcher.launch().expect("fork succeeds even if exec fails");
        assert!(pid > 0);
        assert_eq!(wait_for_exit(pid, Duration::from_secs(5)), Some(1));
    }

    #[test]
    fn helper_is_executed_from_driver_dir() {
        let dir = unique_dir("script");
        let script = dir.join(HELPER_NAME);
        fs::write(&script, "#!/bin/sh\nexit 7\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut launcher = HelperLauncher::new(&dir);
        let pid = launcher.launch().unwrap();
        assert_eq!(wait_for_exit(pid, Duration::from_secs(5)), Some(7));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn reaping_a_running_child_does_not_block() {
        let dir = unique_dir("sleep");
        let script = dir.join(HELPER_NAME);
        fs::write(&script, "#!/bin/sh\nsleep 1\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let pid = HelperLauncher::new(&dir).launch().unwrap();
        assert_eq!(try_reap(pid), None);
        assert_eq!(wait_for_exit(pid, Duration::from_secs(5)), Some(0));
        let _ = fs::remove_dir_all(dir);
    }
}
