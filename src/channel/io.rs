use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::io::RawFd;
#[cfg(any(test, feature = "mutants"))]
use std::time::Instant;

#[cfg(any(test, feature = "mutants"))]
use super::counters::{guard_loop, record_flush_write, record_writable_wait};
use super::counters::write_chunk_limit;

/// Outcome of draining a readable socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes were appended (possibly zero if the read would block).
    Data(usize),
    /// The peer closed its end.
    Closed,
}

pub(super) fn should_retry(err: &io::Error) -> bool {
    err.kind() == ErrorKind::Interrupted
}

/// Write the whole frame, looping over short writes and waiting for
/// writability whenever the non-blocking socket is full.
pub(super) fn write_frame<W: Write>(stream: &mut W, fd: RawFd, mut data: &[u8]) -> io::Result<()> {
    #[cfg(any(test, feature = "mutants"))]
    let guard_start = Instant::now();
    #[cfg(any(test, feature = "mutants"))]
    let mut guard_iters: usize = 0;
    while !data.is_empty() {
        #[cfg(any(test, feature = "mutants"))]
        {
            guard_iters += 1;
            guard_loop(guard_start, guard_iters, 1_000_000, "write_frame");
        }
        let len = write_chunk_limit(data.len());
        match stream.write(&data[..len]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "renderer socket accepted no bytes",
                ))
            }
            Ok(written) => {
                #[cfg(any(test, feature = "mutants"))]
                record_flush_write();
                data = data.get(written..).unwrap_or(&[]);
            }
            Err(err) if should_retry(&err) => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if should_retry(&err) => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
}

/// Block until `fd` can accept more bytes.
pub(super) fn wait_writable(fd: RawFd) -> io::Result<()> {
    #[cfg(any(test, feature = "mutants"))]
    record_writable_wait();
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        // SAFETY: pfd is a valid pollfd on the stack and nfds is 1.
        let ready = unsafe { libc::poll(&mut pfd, 1, -1) };
        if ready > 0 {
            if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                return Err(io::Error::new(
                    ErrorKind::BrokenPipe,
                    "renderer socket reported an error while waiting to write",
                ));
            }
            return Ok(());
        }
        if ready == 0 {
            continue;
        }
        let err = io::Error::last_os_error();
        if should_retry(&err) {
            continue;
        }
        return Err(err);
    }
}

/// Pull every byte currently available from a non-blocking stream.
pub(super) fn read_available<R: Read>(stream: &mut R, sink: &mut Vec<u8>) -> io::Result<ReadOutcome> {
    let mut buffer = [0u8; 4096];
    let mut total = 0usize;
    loop {
        match stream.read(&mut buffer) {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(n) => {
                sink.extend_from_slice(&buffer[..n]);
                total += n;
            }
            Err(err) if should_retry(&err) => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::Data(total)),
            Err(err) => return Err(err),
        }
    }
}
