use super::*;
use clap::Parser;
use std::ffi::OsString;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let previous: Vec<(&str, Option<OsString>)> = vars
        .iter()
        .map(|(key, _)| (*key, std::env::var_os(key)))
        .collect();
    for (key, value) in vars {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    let out = f();
    for (key, value) in previous {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    out
}

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["test-app"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

/// Parse with the directory env vars cleared so host settings don't leak in.
fn parse_clean(args: &[&str]) -> AppConfig {
    with_env(
        &[("PLOTTERM_DRIVER_DIR", None), ("PLOTTERM_SOCKET_DIR", None)],
        || parse(args),
    )
}

#[test]
fn defaults_validate() {
    let mut cfg = parse_clean(&[]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
    assert_eq!(cfg.attempt_wait_ms, DEFAULT_ATTEMPT_WAIT_MS);
    assert_eq!(cfg.pause, PauseKind::Any);
    assert!(!cfg.persist);
}

#[test]
fn rejects_connect_timeout_out_of_range() {
    let mut cfg = parse(&["--connect-timeout-ms", "5", "--attempt-wait-ms", "1"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse(&["--connect-timeout-ms", "40000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_attempt_wait_longer_than_deadline() {
    let mut cfg = parse(&["--connect-timeout-ms", "100", "--attempt-wait-ms", "150"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--attempt-wait-ms"));

    let mut cfg = parse(&["--attempt-wait-ms", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_missing_socket_dir() {
    let mut cfg = parse(&["--socket-dir", "/definitely/not/here/plotterm"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_file_as_driver_dir() {
    let file = std::env::temp_dir().join(format!("plotterm-cfg-file-{}", std::process::id()));
    std::fs::write(&file, b"x").unwrap();
    let mut cfg = parse(&["--driver-dir", file.to_str().unwrap()]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("not a directory"));
    let _ = std::fs::remove_file(file);
}

#[test]
fn canonicalizes_directories() {
    let tmp = std::env::temp_dir();
    let mut cfg = parse_clean(&["--socket-dir", tmp.to_str().unwrap()]);
    cfg.validate().unwrap();
    assert_eq!(cfg.socket_dir, Some(tmp.canonicalize().unwrap()));
}

#[test]
fn rejects_bad_term_options() {
    let mut cfg = parse(&["--term-options", "enhanced noenhanced"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--term-options"));

    let mut cfg = parse_clean(&["--term-options", "size 800,600 title 'demo'"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn driver_dir_reads_env() {
    let cfg = with_env(&[("PLOTTERM_DRIVER_DIR", Some("/opt/plotterm/bin"))], || parse(&[]));
    assert_eq!(cfg.driver_dir, Some(PathBuf::from("/opt/plotterm/bin")));
    assert_eq!(cfg.link_config().driver_dir, PathBuf::from("/opt/plotterm/bin"));
}

#[test]
fn link_config_carries_timing_and_persist() {
    let cfg = parse(&[
        "--connect-timeout-ms",
        "500",
        "--attempt-wait-ms",
        "50",
        "--persist",
        "--socket-dir",
        "/run/plot",
    ]);
    let link = cfg.link_config();
    assert_eq!(link.timing.deadline, Duration::from_millis(500));
    assert_eq!(link.timing.attempt_wait, Duration::from_millis(50));
    assert_eq!(link.socket_dir, PathBuf::from("/run/plot"));
    assert!(link.persist);
}

#[test]
fn link_config_from_env_uses_socket_override() {
    let link = with_env(&[("PLOTTERM_SOCKET_DIR", Some("/srv/sockets"))], LinkConfig::from_env);
    assert_eq!(link.socket_dir, PathBuf::from("/srv/sockets"));
    assert_eq!(link.timing, ConnectTiming::default());
    assert!(!link.persist);
}

#[test]
fn pause_kinds_map_to_masks() {
    assert_eq!(PauseKind::None.mask(), PauseMask::empty());
    assert_eq!(PauseKind::Click.mask(), PauseMask::CLICK);
    assert_eq!(PauseKind::Key.mask(), PauseMask::KEYSTROKE);
    assert_eq!(PauseKind::Any.mask(), PauseMask::ANY);
    assert_eq!(parse(&["--pause", "click"]).pause, PauseKind::Click);
}
