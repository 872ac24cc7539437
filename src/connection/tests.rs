use super::*;
use std::fs;
use std::os::unix::net::UnixListener;
use std::time::{SystemTime, UNIX_EPOCH};

const FAST: ConnectTiming = ConnectTiming {
    attempt_wait: Duration::from_millis(5),
    deadline: Duration::from_millis(30),
};

fn unique_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "plotterm-conn-{label}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Hands out pids in sequence; pids listed in `listening` get a socket.
struct FakeLauncher {
    dir: PathBuf,
    next: u32,
    listening: Vec<u32>,
    pids: Vec<u32>,
    listeners: Vec<UnixListener>,
    fail: bool,
}

impl FakeLauncher {
    fn new(dir: &Path, first_pid: u32, listening: &[u32]) -> Self {
        Self {
            dir: dir.to_path_buf(),
            next: first_pid,
            listening: listening.to_vec(),
            pids: Vec::new(),
            listeners: Vec::new(),
            fail: false,
        }
    }
}

impl Launch for FakeLauncher {
    fn launch(&mut self) -> Result<u32, LinkError> {
        if self.fail {
            return Err(LinkError::SpawnFailure {
                path: "fake".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let pid = self.next;
        self.next += 1;
        self.pids.push(pid);
        if self.listening.contains(&pid) {
            let path = Endpoint::Local(pid).socket_path(&self.dir);
            self.listeners.push(UnixListener::bind(path).unwrap());
        }
        Ok(pid)
    }
}

fn connector(dir: &Path) -> Connector {
    Connector::new(dir.to_path_buf(), FAST)
}

#[test]
fn endpoint_names_and_paths() {
    let dir = Path::new("/run/plot");
    assert_eq!(Endpoint::Local(4242).name(), "plotterm4242");
    assert_eq!(
        Endpoint::Local(4242).socket_path(dir),
        PathBuf::from("/run/plot/plotterm4242")
    );
    assert_eq!(
        Endpoint::Widget("canvas".into()).socket_path(dir),
        PathBuf::from("/run/plot/canvas")
    );
    assert_eq!(
        Endpoint::Widget("/tmp/app/canvas".into()).socket_path(dir),
        PathBuf::from("/tmp/app/canvas")
    );
    assert_eq!(Endpoint::Widget("w".into()).to_string(), "w");
}

#[test]
fn socket_dir_falls_back_to_temp_dir() {
    assert_eq!(
        resolve_socket_dir(Some(OsString::from("/srv/sock"))),
        PathBuf::from("/srv/sock")
    );
    assert_eq!(resolve_socket_dir(None), std::env::temp_dir());
}

#[test]
fn unreachable_widget_without_helper_stops_after_two_hops() {
    let dir = unique_dir("two-hops");
    let mut launcher = FakeLauncher::new(&dir, 100, &[]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();
    let mut widget = Some("missing-widget".to_string());

    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut widget)
        .unwrap();

    assert!(!report.connected);
    assert_eq!(report.hops, MAX_FALLBACK_HOPS);
    assert_eq!(report.endpoint, Some(Endpoint::Local(100)));
    assert_eq!(widget, None);
    assert_eq!(launcher.pids, vec![100]);
    assert!(!channel.is_connected());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unreachable_widget_falls_back_to_running_helper() {
    let dir = unique_dir("widget-local");
    let mut launcher = FakeLauncher::new(&dir, 7, &[7]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let mut no_widget = None;
    let first = connector
        .connect_for_session(&mut launcher, &mut channel, &mut no_widget)
        .unwrap();
    assert!(first.connected);

    let mut widget = Some("gone".to_string());
    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut widget)
        .unwrap();
    assert!(report.connected);
    assert_eq!(report.hops, 1);
    assert_eq!(channel.peer(), Some("plotterm7"));
    assert_eq!(widget, None);
    assert_eq!(launcher.pids, vec![7]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn reachable_widget_connects_without_launching() {
    let dir = unique_dir("widget");
    let _listener = UnixListener::bind(dir.join("canvas")).unwrap();
    let mut launcher = FakeLauncher::new(&dir, 1, &[]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();
    let mut widget = Some("canvas".to_string());

    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut widget)
        .unwrap();

    assert!(report.connected);
    assert_eq!(report.hops, 0);
    assert_eq!(channel.peer(), Some("canvas"));
    assert_eq!(widget.as_deref(), Some("canvas"));
    assert!(launcher.pids.is_empty());
    assert!(!connector.helper_started());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn first_use_launches_helper_then_connects() {
    let dir = unique_dir("fresh");
    let mut launcher = FakeLauncher::new(&dir, 55, &[55]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();

    assert!(report.connected);
    assert_eq!(report.hops, 0);
    assert_eq!(connector.helper_pid(), Some(55));
    assert_eq!(launcher.pids, vec![55]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn dead_helper_is_replaced_once() {
    let dir = unique_dir("respawn");
    let mut launcher = FakeLauncher::new(&dir, 10, &[11]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();

    assert!(report.connected);
    assert_eq!(report.hops, 1);
    assert_eq!(report.endpoint, Some(Endpoint::Local(11)));
    assert_eq!(launcher.pids, vec![10, 11]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn respawned_helper_gets_no_further_fallback() {
    let dir = unique_dir("no-third");
    let mut launcher = FakeLauncher::new(&dir, 20, &[]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();

    assert!(!report.connected);
    assert_eq!(report.hops, 1);
    assert_eq!(launcher.pids, vec![20, 21]);
    assert!(matches!(
        report.into_result(),
        Err(LinkError::ConnectTimeout { hops: 1, .. })
    ));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn already_connected_to_target_is_a_no_op() {
    let dir = unique_dir("noop");
    let mut launcher = FakeLauncher::new(&dir, 3, &[3]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();
    let fd = channel.raw_fd();
    let report = connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();

    assert!(report.connected);
    assert_eq!(report.hops, 0);
    assert_eq!(channel.raw_fd(), fd);
    assert_eq!(launcher.pids, vec![3]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn switching_to_widget_drops_previous_connection() {
    let dir = unique_dir("switch");
    let _listener = UnixListener::bind(dir.join("panel")).unwrap();
    let mut launcher = FakeLauncher::new(&dir, 8, &[8]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap();
    assert_eq!(channel.peer(), Some("plotterm8"));

    let mut widget = Some("panel".to_string());
    connector
        .connect_for_session(&mut launcher, &mut channel, &mut widget)
        .unwrap();
    assert_eq!(channel.peer(), Some("panel"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn connect_without_retry_makes_a_single_attempt() {
    let dir = unique_dir("single");
    let mut launcher = FakeLauncher::new(&dir, 30, &[]);
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let started = Instant::now();
    let report = connector
        .connect(
            &mut launcher,
            &mut channel,
            Some(Endpoint::Widget("nobody".into())),
            &mut Some("nobody".to_string()),
            false,
        )
        .unwrap();

    assert!(!report.connected);
    assert_eq!(report.hops, 0);
    assert!(launcher.pids.is_empty());
    assert!(started.elapsed() >= FAST.deadline);
    assert!(started.elapsed() < Duration::from_secs(2));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn launch_failure_is_reported() {
    let dir = unique_dir("fail");
    let mut launcher = FakeLauncher::new(&dir, 1, &[]);
    launcher.fail = true;
    let mut connector = connector(&dir);
    let mut channel = Channel::new();

    let err = connector
        .connect_for_session(&mut launcher, &mut channel, &mut None)
        .unwrap_err();
    assert!(matches!(err, LinkError::SpawnFailure { .. }));
    let _ = fs::remove_dir_all(dir);
}
