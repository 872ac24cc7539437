//! Console/renderer input multiplexing.
//!
//! While the core waits for input, renderer events must keep flowing: mouse
//! motion updates the status line and a click may end a `pause mouse`. The
//! loop here watches the channel and, unless a pause is active, the console,
//! and returns the console byte the core asked for.


use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

use tracing::warn;

use crate::channel::{Channel, ReadOutcome};
use crate::error::LinkError;
use crate::log_debug;
use crate::protocol::EventKind;
use crate::translate::Translator;

/// Select timeout used when only checking for mouse activity.
pub const CHECK_MOUSING_TIMEOUT: Duration = Duration::from_micros(20);

/// How long the caller is willing to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Block until console input arrives or a pause is satisfied.
    Block,
    /// Service pending renderer events and return without waiting on the console.
    CheckMousing,
}

/// Result handed back to the core's input reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    Char(u8),
    /// No console byte was consumed (poll found nothing, or a pause ended).
    NoChar,
    Eof,
}

/// The descriptor console input is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    fd: RawFd,
}

impl Console {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn stdin() -> Self {
        Self::new(libc::STDIN_FILENO)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Read one unbuffered byte.
    pub fn read_byte(&self) -> ConsoleInput {
        let mut byte = 0u8;
        loop {
            // SAFETY: the buffer is one valid byte on the stack.
            let n = unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast(), 1) };
            match n {
                1 => return ConsoleInput::Char(byte),
                0 => return ConsoleInput::Eof,
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    warn!(error = %err, "console read failed");
                    log_debug(&format!("console read failed: {err}"));
                    return ConsoleInput::Eof;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Readiness {
    channel: bool,
    console: bool,
}

/// Wait for the core's next console byte while servicing renderer events.
pub fn wait_for_input(
    channel: &mut Channel,
    console: Console,
    mode: WaitMode,
    translator: &mut Translator<'_>,
) -> ConsoleInput {
    let Some(channel_fd) = channel.raw_fd() else {
        return match mode {
            WaitMode::CheckMousing => ConsoleInput::NoChar,
            WaitMode::Block => console.read_byte(),
        };
    };
    let timeout = match mode {
        WaitMode::CheckMousing => Some(CHECK_MOUSING_TIMEOUT),
        WaitMode::Block => None,
    };

    loop {
        // Records left behind by an earlier satisfied pause come first.
        if drain_events(channel, translator) {
            return ConsoleInput::NoChar;
        }
        let console_fd = (!translator.is_paused()).then_some(console.fd());
        let ready = match wait_readable(channel_fd, console_fd, timeout) {
            Ok(Some(ready)) => ready,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "renderer communication error");
                log_debug(&format!("renderer communication error: {err}"));
                break;
            }
        };

        if ready.channel {
            let outcome = channel.read_available();
            if drain_events(channel, translator) {
                return ConsoleInput::NoChar;
            }
            match outcome {
                Ok(ReadOutcome::Data(_)) => {}
                Ok(ReadOutcome::Closed) => {
                    warn!("renderer closed the connection");
                    log_debug("renderer closed the connection");
                    channel.disconnect();
                    if mode == WaitMode::CheckMousing {
                        return ConsoleInput::NoChar;
                    }
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "renderer read failed; disconnecting");
                    log_debug(&format!("renderer read failed: {err}"));
                    channel.disconnect();
                    if mode == WaitMode::CheckMousing {
                        return ConsoleInput::NoChar;
                    }
                    break;
                }
            }
        } else if mode == WaitMode::CheckMousing {
            return ConsoleInput::NoChar;
        }

        if !translator.is_paused() && ready.console {
            break;
        }
    }
    console.read_byte()
}

/// Forward every complete buffered record, collapsing runs of motion.
///
/// Returns true as soon as a forwarded record satisfies the pending pause; the
/// records after it stay buffered.
pub fn drain_events(channel: &mut Channel, translator: &mut Translator<'_>) -> bool {
    let mut pending_motion = None;
    while let Some(event) = channel.next_event() {
        if event.kind == EventKind::Motion {
            pending_motion = Some(event);
            continue;
        }
        if let Some(motion) = pending_motion.take() {
            translator.process(motion);
        }
        if translator.process(event) {
            return true;
        }
    }
    if let Some(motion) = pending_motion {
        translator.process(motion);
    }
    false
}

/// `select` wrapper; `Ok(None)` when a signal interrupted the wait.
fn wait_readable(
    channel_fd: RawFd,
    console_fd: Option<RawFd>,
    timeout: Option<Duration>,
) -> Result<Option<Readiness>, LinkError> {
    match select_readable(channel_fd, console_fd, timeout) {
        Ok(ready) => Ok(Some(ready)),
        Err(err) if err.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(err) => Err(LinkError::Readiness(err)),
    }
}

fn select_readable(
    channel_fd: RawFd,
    console_fd: Option<RawFd>,
    timeout: Option<Duration>,
) -> io::Result<Readiness> {
    let limit = libc::FD_SETSIZE as RawFd;
    if channel_fd < 0 || channel_fd >= limit || console_fd.is_some_and(|fd| fd < 0 || fd >= limit) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "descriptor out of range for select()",
        ));
    }

    let mut read_fds = MaybeUninit::<libc::fd_set>::uninit();
    // SAFETY: FD_ZERO initialises the set; both fds are below FD_SETSIZE.
    let mut read_fds = unsafe {
        libc::FD_ZERO(read_fds.as_mut_ptr());
        libc::FD_SET(channel_fd, read_fds.as_mut_ptr());
        if let Some(fd) = console_fd {
            libc::FD_SET(fd, read_fds.as_mut_ptr());
        }
        read_fds.assume_init()
    };
    let nfds = channel_fd.max(console_fd.unwrap_or(-1)) + 1;

    let mut tv = timeout.map(|t| libc::timeval {
        tv_sec: t.as_secs() as libc::time_t,
        tv_usec: libc::suseconds_t::from(t.subsec_micros()),
    });
    let tv_ptr = tv.as_mut().map_or(ptr::null_mut(), |tv| tv as *mut libc::timeval);

    // SAFETY: read_fds is initialised, tv_ptr is null or points at a live timeval.
    let result = unsafe {
        libc::select(
            nfds,
            &mut read_fds,
            ptr::null_mut(),
            ptr::null_mut(),
            tv_ptr,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: read_fds was filled in by select.
    unsafe {
        Ok(Readiness {
            channel: libc::FD_ISSET(channel_fd, &read_fds),
            console: console_fd.is_some_and(|fd| libc::FD_ISSET(fd, &read_fds)),
        })
    }
}
