//! Framed duplex channel to the renderer.
//!
//! Commands accumulate in one outgoing buffer and leave as a single frame per
//! [`Channel::flush`]. Inbound bytes are buffered until whole event records are
//! available.

pub(crate) mod counters;
mod io;

#[cfg(test)]
mod tests;

use std::io::ErrorKind;
use std::net::Shutdown;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use tracing::{debug, warn};

pub use io::ReadOutcome;

use crate::error::LinkError;
use crate::log_debug;
use crate::protocol::{check_frame_size, encode_frame, Command, EventBuffer, InboundEvent};

/// Live connection state plus the outgoing accumulation buffer.
#[derive(Debug, Default)]
pub struct Channel {
    stream: Option<UnixStream>,
    peer: Option<String>,
    out: Vec<u8>,
    inbound: EventBuffer,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Name of the endpoint the channel is connected to.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.stream.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Adopt a freshly connected stream. Any previous connection is dropped.
    pub fn attach(&mut self, stream: UnixStream, peer: &str) -> Result<(), LinkError> {
        stream.set_nonblocking(true).map_err(LinkError::Channel)?;
        self.disconnect();
        self.stream = Some(stream);
        self.peer = Some(peer.to_string());
        debug!(peer, "renderer channel attached");
        Ok(())
    }

    /// Close the connection. Buffered inbound bytes are discarded.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.shutdown(Shutdown::Both) {
                if err.kind() != ErrorKind::NotConnected {
                    log_debug(&format!("renderer socket shutdown failed: {err}"));
                }
            }
        }
        self.peer = None;
        self.inbound.clear();
    }

    /// Append one command to the outgoing buffer.
    pub fn queue(&mut self, command: &Command) {
        command.encode(&mut self.out);
    }

    /// Bytes waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.out.len()
    }

    /// Send the accumulated buffer as one frame.
    ///
    /// Without a connection nothing is written. The buffer is empty on return
    /// whatever the outcome; a transport failure also drops the connection.
    /// An oversized frame is discarded and the connection kept.
    pub fn flush(&mut self) -> Result<(), LinkError> {
        let payload = std::mem::take(&mut self.out);
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        if let Err(err) = check_frame_size(payload.len()) {
            warn!(error = %err, "dropping oversized frame");
            log_debug(&format!("dropping oversized frame: {err}"));
            return Err(err);
        }
        let fd = stream.as_raw_fd();
        let frame = encode_frame(&payload);
        match io::write_frame(stream, fd, &frame) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "renderer channel write failed; disconnecting");
                log_debug(&format!("renderer channel write failed: {err}"));
                self.disconnect();
                Err(LinkError::Channel(err))
            }
        }
    }

    /// Read everything the socket has ready into the inbound buffer.
    pub fn read_available(&mut self) -> Result<ReadOutcome, LinkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(ReadOutcome::Closed);
        };
        let mut bytes = Vec::new();
        let outcome = io::read_available(stream, &mut bytes).map_err(LinkError::Channel);
        self.inbound.extend(&bytes);
        outcome
    }

    /// Next complete inbound record, if any.
    pub fn next_event(&mut self) -> Option<InboundEvent> {
        self.inbound.next_event()
    }
}
