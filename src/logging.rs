use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 2 * 1024 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_WRITER: OnceLock<Mutex<Option<LogWriter>>> = OnceLock::new();

/// Path to the temp log file shared by the driver and its helper.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("plotterm.log")
}

/// Size-capped append-only file; starts over once the cap would be crossed.
struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    fn open(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let existing = fs::metadata(&path).map_or(0, |m| m.len());
        let truncate = existing > max_bytes;
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(!truncate)
            .truncate(truncate)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written: if truncate { 0 } else { existing },
        })
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.bytes_written.saturating_add(len) > self.max_bytes {
            match Self::open_truncated(&self.path) {
                Some(file) => {
                    self.file = file;
                    self.bytes_written = 0;
                }
                None => return,
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(len);
        }
    }

    fn open_truncated(path: &Path) -> Option<fs::File> {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()
    }
}

fn writer() -> &'static Mutex<Option<LogWriter>> {
    LOG_WRITER.get_or_init(|| Mutex::new(None))
}

fn set_enabled(enabled: bool) {
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    let mut slot = writer().lock().unwrap_or_else(|p| p.into_inner());
    *slot = enabled
        .then(|| LogWriter::open(log_file_path(), LOG_MAX_BYTES))
        .flatten();
}

/// Configure logging from CLI flags.
pub fn init_logging(config: &AppConfig) {
    set_enabled(config.logs && !config.no_logs);
}

/// Turn the debug log on from the environment alone (used by the helper).
pub fn init_logging_from_env() {
    set_enabled(env_flag("PLOTTERM_LOGS") && !env_flag("PLOTTERM_NO_LOGS"));
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).ok().as_deref().map(str::trim),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Append a line to the debug log; a no-op unless logging is enabled.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let line = format!("[{secs}] [{}] {msg}\n", std::process::id());
    let mut slot = writer().lock().unwrap_or_else(|p| p.into_inner());
    if let Some(writer) = slot.as_mut() {
        writer.write_line(&line);
    }
}

/// Record a panic and its location in the debug log.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    let location = info
        .location()
        .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    log_debug(&format!(
        "panic at {location}: {payload} (v{})",
        env!("CARGO_PKG_VERSION")
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_truncates_when_over_limit() {
        let path = env::temp_dir().join(format!("plotterm-log-rotate-{}", std::process::id()));
        let _ = fs::remove_file(&path);
        let mut writer = LogWriter::open(path.clone(), 16).unwrap();
        writer.write_line("0123456789\n");
        writer.write_line("abcdefghij\n");
        drop(writer);
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghij\n");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn oversized_file_is_replaced_on_open() {
        let path = env::temp_dir().join(format!("plotterm-log-big-{}", std::process::id()));
        fs::write(&path, vec![b'x'; 64]).unwrap();
        let writer = LogWriter::open(path.clone(), 32).unwrap();
        assert_eq!(writer.bytes_written, 0);
        drop(writer);
        let _ = fs::remove_file(path);
    }
}
