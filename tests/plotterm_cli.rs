use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn plotterm_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_plotterm").expect("plotterm test binary not built")
}

fn helper_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_plotterm_helper").expect("plotterm_helper test binary not built")
}

fn wait_for_line(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let dump = fs::read_to_string(path).unwrap_or_default();
        if dump.contains(needle) || Instant::now() > deadline {
            return dump;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn plotterm_help_mentions_options() {
    let output = Command::new(plotterm_bin())
        .arg("--help")
        .output()
        .expect("run plotterm --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--term-options"));
    assert!(combined.contains("--socket-dir"));
}

#[test]
fn plotterm_rejects_conflicting_term_options() {
    let output = Command::new(plotterm_bin())
        .args(["--term-options", "raise noraise"])
        .output()
        .expect("run plotterm");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--term-options"));
}

#[test]
fn plotterm_draws_through_helper_and_exits_it() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("pt-cli-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    let dump = dir.join("dump.jsonl");
    let driver_dir = Path::new(helper_bin()).parent().unwrap();

    let output = Command::new(plotterm_bin())
        .args(["--pause", "click", "--term-options", "size 400,300 title 'cli'"])
        .arg("--socket-dir")
        .arg(&dir)
        .env("PLOTTERM_DRIVER_DIR", driver_dir)
        .env("PLOTTERM_HELPER_DUMP", &dump)
        .env("PLOTTERM_HELPER_AUTOCLICK", "1")
        .env_remove("PLOTTERM_LOGS")
        .output()
        .expect("run plotterm");
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ButtonRelease"));

    let dump = wait_for_line(&dump, "\"Exit\"");
    assert!(dump.contains("{\"SetTitle\":\"cli\"}"));
    assert!(dump.contains("{\"SetSceneSize\":{\"width\":400,\"height\":300}}"));
    assert!(dump.contains("\"Vector\""));
    assert!(dump.lines().last().unwrap_or_default().contains("\"Exit\""));
    let _ = fs::remove_dir_all(dir);
}
