//! Stand-in renderer: serves the endpoint named after its own pid, decodes
//! command frames and writes each command as a JSON line.
//!
//! `PLOTTERM_HELPER_DUMP` names the output file (commands are discarded when
//! unset). With `PLOTTERM_HELPER_AUTOCLICK` set, every `Done` is answered with
//! a press and release of button 1 so a waiting driver can continue.

use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;

use plotterm::connection::{resolve_socket_dir, Endpoint, SOCKET_DIR_ENV};
use plotterm::protocol::{decode_commands, read_frame, Command, EventKind, InboundEvent};
use plotterm::{init_logging_from_env, log_debug};

const DUMP_ENV: &str = "PLOTTERM_HELPER_DUMP";
const AUTOCLICK_ENV: &str = "PLOTTERM_HELPER_AUTOCLICK";

#[derive(Serialize)]
struct DumpLine<'a> {
    frame: u64,
    command: &'a Command,
}

/// What the driver asked for when a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Exit,
    Persist,
    Hangup,
}

struct Renderer {
    dump: Option<BufWriter<File>>,
    autoclick: bool,
    frames: u64,
}

impl Renderer {
    fn serve(&mut self, mut stream: UnixStream) -> Result<Ending> {
        let mut ending = Ending::Hangup;
        while let Some(payload) = read_frame(&mut stream).context("read frame")? {
            self.frames += 1;
            let commands = decode_commands(&payload).context("decode frame")?;
            for command in &commands {
                self.record(command)?;
                match command {
                    Command::Exit => return Ok(Ending::Exit),
                    Command::Persist => ending = Ending::Persist,
                    Command::Done if self.autoclick => click(&mut stream)?,
                    _ => {}
                }
            }
        }
        Ok(ending)
    }

    fn record(&mut self, command: &Command) -> Result<()> {
        let Some(dump) = self.dump.as_mut() else {
            return Ok(());
        };
        serde_json::to_writer(
            &mut *dump,
            &DumpLine {
                frame: self.frames,
                command,
            },
        )?;
        dump.write_all(b"\n")?;
        dump.flush()?;
        Ok(())
    }
}

fn click(stream: &mut UnixStream) -> Result<()> {
    for kind in [EventKind::ButtonPress, EventKind::ButtonRelease] {
        stream.write_all(&InboundEvent::new(kind, 0, 0, 1, 0).to_bytes())?;
    }
    Ok(())
}

fn open_dump() -> Result<Option<BufWriter<File>>> {
    let Some(path) = env::var_os(DUMP_ENV).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let path = PathBuf::from(path);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    Ok(Some(BufWriter::new(file)))
}

fn main() -> Result<()> {
    init_logging_from_env();
    let dir = resolve_socket_dir(env::var_os(SOCKET_DIR_ENV));
    let endpoint = Endpoint::Local(std::process::id());
    let path = endpoint.socket_path(&dir);
    let _ = fs::remove_file(&path);
    let listener =
        UnixListener::bind(&path).with_context(|| format!("bind {}", path.display()))?;
    log_debug(&format!("helper listening on {}", path.display()));

    let mut renderer = Renderer {
        dump: open_dump()?,
        autoclick: env::var_os(AUTOCLICK_ENV).is_some(),
        frames: 0,
    };
    let result = (|| -> Result<()> {
        for stream in listener.incoming() {
            let ending = renderer.serve(stream.context("accept")?)?;
            log_debug(&format!("driver connection ended: {ending:?}"));
            if ending != Ending::Hangup {
                break;
            }
        }
        Ok(())
    })();
    let _ = fs::remove_file(&path);
    result
}
