//! Binary wire protocol between the core and the renderer process.
//!
//! Outbound traffic is a sequence of frames. Each frame is a big-endian `u32`
//! byte count followed by that many payload bytes; the payload is a run of
//! commands, each an opcode tag followed by its operands:
//!
//! ```text
//! [len: u32][opcode: u32][operands...][opcode: u32][operands...]...
//! ```
//!
//! Inbound traffic is a stream of fixed 20-byte event records, see
//! [`InboundEvent`].

mod codec;
mod event;
mod opcode;


use std::io::{self, Read};

pub use codec::{AxisScale, Color, Command, Decoder, Image};
pub use event::{EventBuffer, EventKind, InboundEvent, EVENT_RECORD_SIZE};
pub use opcode::{Alignment, CursorShape, LayerMark, Opcode, PenStyle, PlotVisibility};

use crate::error::LinkError;

/// Bytes in the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest frame a reader will accept (256 MiB).
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Reject payloads larger than a reader accepts.
pub fn check_frame_size(len: usize) -> Result<(), LinkError> {
    if len > MAX_FRAME_SIZE {
        return Err(LinkError::Protocol(format!(
            "frame size {len} exceeds maximum {MAX_FRAME_SIZE} bytes"
        )));
    }
    Ok(())
}

/// Prefix `payload` with its big-endian length. Callers keep `payload` within
/// [`MAX_FRAME_SIZE`].
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Read one whole frame, blocking until the announced byte count arrives.
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed inside frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame size {len} exceeds maximum {MAX_FRAME_SIZE} bytes"),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Decode every command in a frame payload.
pub fn decode_commands(payload: &[u8]) -> Result<Vec<Command>, LinkError> {
    let mut dec = Decoder::new(payload);
    let mut commands = Vec::new();
    while !dec.is_empty() {
        commands.push(Command::decode(&mut dec)?);
    }
    Ok(commands)
}

/// Encode a run of commands into one payload.
pub fn encode_commands(commands: &[Command]) -> Vec<u8> {
    let mut payload = Vec::new();
    for command in commands {
        command.encode(&mut payload);
    }
    payload
}
